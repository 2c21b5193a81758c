//! Turn telemetry on or off

use super::{build_controller, Invocation};
use anyhow::{anyhow, Result};
use clap::ValueEnum;
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn enabled(self) -> bool {
        matches!(self, Switch::On)
    }
}

pub async fn run(invocation: &Invocation, state: Switch) -> Result<()> {
    let mic = build_controller(invocation)?;

    mic.set_telemetry(state.enabled());
    mic.settle().await;

    let settings = mic
        .last_settings_write()
        .ok_or_else(|| anyhow!("Settings write did not run"))??;
    println!(
        "{} Telemetry {}",
        "✓".green(),
        if settings.telemetry_enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  {}",
        format!("Saved to {}", invocation.paths.settings.display()).dimmed()
    );
    Ok(())
}
