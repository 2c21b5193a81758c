//! Audio backends that read and set the microphone mute flag

use crate::error::MicError;
use crate::state::{MicrophoneState, DEFAULT_UNMUTED_VOLUME, MUTED_VOLUME};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Reads and sets the system microphone mute flag
pub trait AudioBackend: Send + Sync {
    /// Current state as reported by the system
    fn state(&self) -> Result<MicrophoneState, MicError>;

    /// Mute or unmute; returns the resulting state
    fn set_mute(&self, mute: bool) -> Result<MicrophoneState, MicError>;

    /// Short name for logs and status output
    fn name(&self) -> &'static str;
}

const GET_INPUT_VOLUME: &str = "input volume of (get volume settings)";

/// macOS backend driving the input volume through `osascript`
///
/// Input volume 0 counts as muted. On other platforms every call fails with
/// [`MicError::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsaScriptBackend;

impl OsaScriptBackend {
    #[cfg(target_os = "macos")]
    fn run(script: &str) -> Result<String, MicError> {
        use std::process::Command;

        debug!("osascript -e {:?}", script);
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|e| MicError::CommandFailed(format!("failed to execute osascript: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MicError::CommandFailed(format!("osascript failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    #[cfg(not(target_os = "macos"))]
    fn run(script: &str) -> Result<String, MicError> {
        debug!("osascript unavailable, skipping {:?}", script);
        Err(MicError::Unsupported(
            "microphone control is only supported on macOS".to_string(),
        ))
    }
}

impl AudioBackend for OsaScriptBackend {
    fn state(&self) -> Result<MicrophoneState, MicError> {
        let raw = Self::run(GET_INPUT_VOLUME)?;
        parse_input_volume(&raw)
    }

    fn set_mute(&self, mute: bool) -> Result<MicrophoneState, MicError> {
        let level = if mute { MUTED_VOLUME } else { DEFAULT_UNMUTED_VOLUME };
        Self::run(&format!("set volume input volume {}", level))?;
        Ok(MicrophoneState::new(mute))
    }

    fn name(&self) -> &'static str {
        "osascript"
    }
}

/// Interpret `input volume` output
///
/// `missing value` is what macOS reports when no input device exists.
fn parse_input_volume(raw: &str) -> Result<MicrophoneState, MicError> {
    let raw = raw.trim();
    if raw == "missing value" {
        return Err(MicError::Unsupported("no input device".to_string()));
    }
    let volume: f32 = raw
        .parse()
        .map_err(|_| MicError::Parse(format!("failed to parse volume level: '{}'", raw)))?;
    Ok(MicrophoneState::new(volume == 0.0))
}

/// In-process backend
///
/// Used when no system backend is available and by tests. Counts writes and
/// can be told to fail the next call.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    muted: Mutex<bool>,
    writes: AtomicUsize,
    fail_next: Mutex<Option<MicError>>,
}

impl MemoryBackend {
    pub fn new(muted: bool) -> Self {
        Self {
            muted: Mutex::new(muted),
            ..Self::default()
        }
    }

    /// Number of `set_mute` calls that reached the backend
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next call fail with `err`
    pub fn fail_next(&self, err: MicError) {
        *self.fail_next.lock() = Some(err);
    }

    fn take_failure(&self) -> Result<(), MicError> {
        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AudioBackend for MemoryBackend {
    fn state(&self) -> Result<MicrophoneState, MicError> {
        self.take_failure()?;
        Ok(MicrophoneState::new(*self.muted.lock()))
    }

    fn set_mute(&self, mute: bool) -> Result<MicrophoneState, MicError> {
        self.take_failure()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.muted.lock() = mute;
        Ok(MicrophoneState::new(mute))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_volume() {
        assert_eq!(parse_input_volume("0").unwrap(), MicrophoneState::muted());
        assert_eq!(parse_input_volume("50\n").unwrap(), MicrophoneState::unmuted());
        assert_eq!(parse_input_volume("12.5").unwrap(), MicrophoneState::unmuted());

        assert!(matches!(parse_input_volume("loud"), Err(MicError::Parse(_))));
        assert!(matches!(parse_input_volume("missing value"), Err(MicError::Unsupported(_))));
    }

    #[test]
    fn test_memory_backend_counts_writes() {
        let backend = MemoryBackend::new(false);
        assert_eq!(backend.state().unwrap(), MicrophoneState::unmuted());

        backend.set_mute(true).unwrap();
        assert_eq!(backend.state().unwrap(), MicrophoneState::muted());
        assert_eq!(backend.writes(), 1);
    }

    #[test]
    fn test_memory_backend_fail_next() {
        let backend = MemoryBackend::new(true);
        backend.fail_next(MicError::CommandFailed("device busy".to_string()));

        assert!(backend.set_mute(false).is_err());
        assert_eq!(backend.writes(), 0);
        assert!(backend.set_mute(false).is_ok());
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_osascript_unsupported_off_macos() {
        let backend = OsaScriptBackend;
        assert!(matches!(backend.state(), Err(MicError::Unsupported(_))));
        assert!(matches!(backend.set_mute(true), Err(MicError::Unsupported(_))));
    }
}
