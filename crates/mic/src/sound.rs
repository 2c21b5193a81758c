//! Audible feedback after a mute state change

use crate::error::MicError;
use tracing::debug;

/// Which change to announce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Mute,
    Unmute,
}

impl Cue {
    pub fn for_muted(is_muted: bool) -> Self {
        if is_muted {
            Cue::Mute
        } else {
            Cue::Unmute
        }
    }
}

/// Plays the feedback sound for a cue
///
/// Failures are reported to the caller, which logs them; feedback never
/// undoes or fails a state change.
pub trait SoundPlayer: Send + Sync {
    fn play(&self, cue: Cue) -> Result<(), MicError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// System sounds tried in order until one plays
const SYSTEM_SOUNDS: [&str; 3] = ["Tink", "Pop", "Morse"];

/// macOS player using `afplay` and the bundled system sounds
///
/// A no-op on other platforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct AfplaySound;

impl AfplaySound {
    #[cfg(target_os = "macos")]
    fn play_system_sound(name: &str) -> Result<(), MicError> {
        use std::process::Command;

        let path = format!("/System/Library/Sounds/{}.aiff", name);
        debug!("afplay {}", path);
        let output = Command::new("afplay")
            .arg(&path)
            .output()
            .map_err(|e| MicError::CommandFailed(format!("failed to execute afplay: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MicError::CommandFailed(format!("afplay failed: {}", stderr.trim())));
        }
        Ok(())
    }

    #[cfg(target_os = "macos")]
    fn play_chain(sounds: &[&str]) -> Result<(), MicError> {
        let mut last_err = MicError::Unsupported("no system sounds configured".to_string());
        for sound in sounds {
            match Self::play_system_sound(sound) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!("System sound {} failed: {}", sound, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    #[cfg(not(target_os = "macos"))]
    fn play_chain(sounds: &[&str]) -> Result<(), MicError> {
        debug!("afplay unavailable, skipping {:?}", sounds.first());
        Ok(())
    }
}

impl SoundPlayer for AfplaySound {
    fn play(&self, cue: Cue) -> Result<(), MicError> {
        debug!("Playing {:?} cue", cue);
        Self::play_chain(&SYSTEM_SOUNDS)
    }

    fn name(&self) -> &'static str {
        "afplay"
    }
}
