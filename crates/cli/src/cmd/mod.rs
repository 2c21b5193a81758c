//! CLI command implementations

pub mod config;
pub mod listen;
pub mod status;
pub mod telemetry;
pub mod toggle;

use crate::system_config::{self, Paths};
use anyhow::{Context, Result};
use clap::ValueEnum;
use mic::{
    AfplaySound, AudioBackend, MemoryBackend, MicController, MicError, OsaScriptBackend, Settings,
    SettingsSink, SoundPlayer,
};
use std::fmt;
use std::sync::Arc;

/// Which audio backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// System microphone (macOS)
    System,
    /// In-process stand-in, useful for trying the CLI elsewhere
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::System => write!(f, "system"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Global options shared by every command
pub struct Invocation {
    pub paths: Paths,
    pub backend: BackendKind,
}

/// Build a controller from config and persisted settings
///
/// Debounced settings writes are saved back to the settings file.
pub fn build_controller(invocation: &Invocation) -> Result<MicController> {
    let config = system_config::load_from(&invocation.paths.config)?;
    let initial = system_config::load_settings(&invocation.paths.settings)?;

    let settings_path = invocation.paths.settings.clone();
    let sink: SettingsSink = Arc::new(move |settings: &Settings| -> Result<(), MicError> {
        system_config::save_settings(&settings_path, settings)
            .map_err(|e| MicError::Persist(format!("{:#}", e)))
    });

    let backend: Arc<dyn AudioBackend> = match invocation.backend {
        BackendKind::System => Arc::new(OsaScriptBackend),
        BackendKind::Memory => Arc::new(MemoryBackend::new(false)),
    };
    // The in-process backend stays silent
    let sound: Option<Arc<dyn SoundPlayer>> = match invocation.backend {
        BackendKind::System => Some(Arc::new(AfplaySound)),
        BackendKind::Memory => None,
    };

    let mut options = config.controller_options(initial, Some(sink))?;
    options.sound = sound;
    MicController::new(backend, options).context("Failed to start microphone controller")
}
