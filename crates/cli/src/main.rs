//! Snub CLI - snub command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod system_config;

use cmd::telemetry::Switch;
use cmd::{BackendKind, Invocation};

/// Snub - debounced microphone mute control
#[derive(Parser)]
#[command(name = "snub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/snub/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Audio backend
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::System)]
    backend: BackendKind,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show microphone state and settings
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Toggle mute
    Toggle,
    /// Mute the microphone
    Mute,
    /// Unmute the microphone
    Unmute,
    /// Turn telemetry on or off
    Telemetry {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Read commands from stdin and apply them through the debouncer
    Listen,
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show all configuration values
    List,
    /// Show a single value (e.g. toggle.wait_ms)
    Get {
        key: String,
    },
    /// Set a single value
    Set {
        key: String,
        value: String,
    },
    /// Print the config file path
    Path {
        /// Write a default config file if none exists
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated default config
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let paths = system_config::Paths::resolve(cli.config.as_deref())?;
    let invocation = Invocation {
        paths,
        backend: cli.backend,
    };

    match cli.command {
        Commands::Status { json } => cmd::status::run(&invocation, json).await,
        Commands::Toggle => cmd::toggle::run(&invocation).await,
        Commands::Mute => cmd::toggle::set(&invocation, true).await,
        Commands::Unmute => cmd::toggle::set(&invocation, false).await,
        Commands::Telemetry { state } => cmd::telemetry::run(&invocation, state).await,
        Commands::Listen => cmd::listen::run(&invocation).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(&invocation.paths).await,
            ConfigCommands::Get { key } => cmd::config::run_get(&invocation.paths, &key).await,
            ConfigCommands::Set { key, value } => {
                cmd::config::run_set(&invocation.paths, &key, &value).await
            }
            ConfigCommands::Path { create } => cmd::config::run_path(&invocation.paths, create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
