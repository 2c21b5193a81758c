//! Microphone control surface for Snub
//!
//! This crate provides:
//! - Microphone state and app settings types
//! - The [`AudioBackend`] seam (osascript on macOS, in-memory elsewhere)
//! - [`MicController`], which routes user-initiated actions through the
//!   coalescer while publishing state changes immediately
//! - The [`SoundPlayer`] seam for audible mute feedback

pub mod backend;
pub mod controller;
pub mod error;
pub mod sound;
pub mod state;

// Re-exports
pub use backend::{AudioBackend, MemoryBackend, OsaScriptBackend};
pub use controller::{ControllerOptions, MicController, SettingsSink};
pub use error::MicError;
pub use sound::{AfplaySound, Cue, SoundPlayer};
pub use state::{MicrophoneState, Settings};
