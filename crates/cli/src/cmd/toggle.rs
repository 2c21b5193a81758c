//! Toggle, mute and unmute

use super::{build_controller, Invocation};
use anyhow::{anyhow, Result};
use mic::MicrophoneState;
use owo_colors::OwoColorize;

/// Toggle through the debouncer
pub async fn run(invocation: &Invocation) -> Result<()> {
    let mic = build_controller(invocation)?;

    // Leading edge: a fresh controller always runs the first press
    let state = mic
        .toggle()
        .ok_or_else(|| anyhow!("Toggle was absorbed by the debounce window"))??;
    print_state(state);
    Ok(())
}

/// Set the mute flag directly
pub async fn set(invocation: &Invocation, mute: bool) -> Result<()> {
    let mic = build_controller(invocation)?;
    let state = mic.set_mute(mute)?;
    print_state(state);
    Ok(())
}

pub(crate) fn print_state(state: MicrophoneState) {
    if state.is_muted {
        println!("{} Microphone muted", "✓".green());
    } else {
        println!("{} Microphone active", "✓".green());
    }
}
