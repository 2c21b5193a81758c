//! Show microphone state and settings

use super::{build_controller, Invocation};
use anyhow::{Context, Result};
use mic::{MicrophoneState, Settings};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Machine-readable status
#[derive(Debug, Serialize)]
struct StatusReport {
    backend: &'static str,
    microphone: Option<MicrophoneState>,
    error: Option<String>,
    settings: Settings,
}

pub async fn run(invocation: &Invocation, json: bool) -> Result<()> {
    // 1. Build controller (reads config and settings)
    let mic = build_controller(invocation)?;

    // 2. Query backend
    let (microphone, error) = match mic.state() {
        Ok(state) => (Some(state), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let report = StatusReport {
        backend: mic.backend_name(),
        microphone,
        error,
        settings: mic.settings(),
    };

    // 3. Display output
    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", "Microphone Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Backend:       {}", report.backend.cyan());
    print!("Microphone:    ");
    match (&report.microphone, &report.error) {
        (Some(state), _) if state.is_muted => println!("{}", "Muted".red()),
        (Some(_), _) => println!("{}", "Active ✓".green()),
        (None, Some(e)) => println!("{} {}", "Unavailable".yellow(), format!("({})", e).dimmed()),
        (None, None) => println!("{}", "Unknown".yellow()),
    }
    println!(
        "Telemetry:     {}",
        if report.settings.telemetry_enabled {
            "on".green().to_string()
        } else {
            "off".dimmed().to_string()
        }
    );
    println!();
    println!(
        "{}",
        format!("Config: {}", invocation.paths.config.display()).dimmed()
    );

    Ok(())
}
