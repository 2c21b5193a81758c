//! Microphone state and app settings

use serde::{Deserialize, Serialize};

/// Input volume applied when unmuting
pub const DEFAULT_UNMUTED_VOLUME: u8 = 50;

/// Input volume that counts as muted
pub const MUTED_VOLUME: u8 = 0;

/// Current state of the microphone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MicrophoneState {
    pub is_muted: bool,
}

impl MicrophoneState {
    pub fn new(is_muted: bool) -> Self {
        Self { is_muted }
    }

    pub fn muted() -> Self {
        Self::new(true)
    }

    pub fn unmuted() -> Self {
        Self::new(false)
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        if self.is_muted {
            "muted"
        } else {
            "active"
        }
    }
}

/// User-facing app settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Anonymous usage reporting (default: off)
    pub telemetry_enabled: bool,
}
