//! Interactive mode
//!
//! Reads one command per line from stdin and applies it through a single
//! long-lived controller, so rapid repeats are coalesced the same way a
//! hotkey would be. State changes are printed as they are published.

use super::toggle::print_state;
use super::{build_controller, Invocation};
use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// A parsed stdin line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenCommand {
    Toggle,
    Mute,
    Unmute,
    Telemetry(bool),
    Status,
    Quit,
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ListenCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let arg = words.next().map(str::to_ascii_lowercase);
    if words.next().is_some() {
        bail!("Too many arguments: '{}'", line);
    }

    let command = match (verb.as_str(), arg.as_deref()) {
        ("toggle" | "t", None) => ListenCommand::Toggle,
        ("mute", None) => ListenCommand::Mute,
        ("unmute", None) => ListenCommand::Unmute,
        ("telemetry", Some("on")) => ListenCommand::Telemetry(true),
        ("telemetry", Some("off")) => ListenCommand::Telemetry(false),
        ("telemetry", _) => bail!("Usage: telemetry <on|off>"),
        ("status", None) => ListenCommand::Status,
        ("quit" | "exit" | "q", None) => ListenCommand::Quit,
        _ => bail!("Unknown command: '{}'", line),
    };
    Ok(Some(command))
}

pub async fn run(invocation: &Invocation) -> Result<()> {
    // 1. Build controller
    let mic = build_controller(invocation)?;
    info!("Listening on stdin with backend {}", mic.backend_name());

    // 2. Print published state changes
    let mut state_rx = mic.subscribe();
    let watcher = tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            println!("{} {}", "→".dimmed(), format!("microphone {}", state.label()).cyan());
        }
    });

    println!(
        "{}",
        "Commands: toggle, mute, unmute, telemetry <on|off>, status, quit".dimmed()
    );

    // 3. Read commands until EOF, quit, or Ctrl+C
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                None
            }
        };
        let Some(line) = line else { break };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                continue;
            }
        };

        match command {
            ListenCommand::Toggle => match mic.toggle() {
                Some(Ok(state)) => debug!("Toggle result: {}", state.label()),
                Some(Err(e)) => eprintln!("{} {}", "✗".red(), e),
                None => debug!("Toggle absorbed"),
            },
            ListenCommand::Mute | ListenCommand::Unmute => {
                let mute = command == ListenCommand::Mute;
                if let Err(e) = mic.set_mute(mute) {
                    eprintln!("{} {}", "✗".red(), e);
                }
            }
            ListenCommand::Telemetry(enabled) => {
                mic.set_telemetry(enabled);
                println!("{}", "telemetry change queued".dimmed());
            }
            ListenCommand::Status => match mic.state() {
                Ok(state) => print_state(state),
                Err(e) => eprintln!("{} {}", "✗".red(), e),
            },
            ListenCommand::Quit => break,
        }
    }

    // 4. Flush pending settings, drop anything else
    mic.settle().await;
    let dropped = mic.shutdown();
    if dropped > 0 {
        debug!("Dropped {} pending actions on exit", dropped);
    }
    watcher.abort();

    Ok(())
}
