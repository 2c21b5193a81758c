//! Configuration management command
//!
//! Provides CLI interface to view and edit the debounce configuration.

use crate::system_config::{self, Paths, SnubConfig};
use anyhow::{bail, Context, Result};
use coalesce::config::MAX_WAIT_MS;
use coalesce::{DebounceConfig, Edge};
use owo_colors::OwoColorize;

fn print_section(name: &str, section: &DebounceConfig) {
    println!("{}", format!("[{}]", name).yellow());
    println!(
        "  {} = {} {}",
        "wait_ms".cyan(),
        section.wait_ms,
        format!("({}ms)", section.wait_ms).dimmed()
    );
    println!("  {} = {}", "edge".cyan(), edge_name(section.edge));
    println!(
        "  {} = {}",
        "idle_eviction_secs".cyan(),
        match section.idle_eviction_secs {
            Some(secs) => secs.to_string(),
            None => "never".dimmed().to_string(),
        }
    );
}

fn edge_name(edge: Edge) -> &'static str {
    match edge {
        Edge::Leading => "leading",
        Edge::Trailing => "trailing",
    }
}

/// List all configuration values
pub async fn run_list(paths: &Paths) -> Result<()> {
    let config = system_config::load_from(&paths.config)?;

    println!("{}", "Snub Configuration".bold());
    println!("{}: {}", "Location".dimmed(), paths.config.display().dimmed());
    if !paths.config.exists() {
        println!("{}", "(file not found, showing defaults)".dimmed());
    }
    println!();

    print_section("toggle", &config.toggle);
    println!();
    print_section("settings", &config.settings);

    println!("\n{}", "Valid Ranges:".bold());
    println!("  wait_ms: 0-{}", MAX_WAIT_MS);
    println!("  edge: leading, trailing");
    println!("  idle_eviction_secs: >= 1 (unset = never)");

    Ok(())
}

fn unknown_section(name: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Unknown config section: '{}'. Use 'snub config list' to see available keys.",
        name
    )
}

fn section<'a>(config: &'a SnubConfig, name: &str) -> Result<&'a DebounceConfig> {
    match name {
        "toggle" => Ok(&config.toggle),
        "settings" => Ok(&config.settings),
        _ => Err(unknown_section(name)),
    }
}

fn section_mut<'a>(config: &'a mut SnubConfig, name: &str) -> Result<&'a mut DebounceConfig> {
    match name {
        "toggle" => Ok(&mut config.toggle),
        "settings" => Ok(&mut config.settings),
        _ => Err(unknown_section(name)),
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.split_once('.')
        .with_context(|| format!("Config keys look like 'toggle.wait_ms', got '{}'", key))
}

/// Read one value
pub fn get_value(config: &SnubConfig, key: &str) -> Result<String> {
    let (name, field) = split_key(key)?;
    let section = section(config, name)?;

    let value = match field {
        "wait_ms" => section.wait_ms.to_string(),
        "edge" => edge_name(section.edge).to_string(),
        "idle_eviction_secs" => section
            .idle_eviction_secs
            .map_or_else(|| "none".to_string(), |secs| secs.to_string()),
        _ => bail!("Unknown config key: {}. Use 'snub config list' to see available keys.", key),
    };
    Ok(value)
}

/// Update one value in place and validate the section
pub fn set_value(config: &mut SnubConfig, key: &str, value: &str) -> Result<()> {
    let (name, field) = split_key(key)?;
    let section = section_mut(config, name)?;

    match field {
        "wait_ms" => {
            section.wait_ms = value.parse().context("Invalid value: must be an integer")?;
        }
        "edge" => {
            section.edge = match value {
                "leading" => Edge::Leading,
                "trailing" => Edge::Trailing,
                _ => bail!("Invalid value: must be 'leading' or 'trailing'"),
            };
        }
        "idle_eviction_secs" => {
            section.idle_eviction_secs = match value {
                "none" | "never" => None,
                _ => Some(value.parse().context("Invalid value: must be a positive integer or 'none'")?),
            };
        }
        _ => bail!("Unknown config key: {}. Use 'snub config list' to see available keys.", key),
    }

    section
        .validate()
        .with_context(|| format!("Invalid value for {}", key))?;
    Ok(())
}

/// Get a single configuration value
pub async fn run_get(paths: &Paths, key: &str) -> Result<()> {
    let config = system_config::load_from(&paths.config)?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(paths: &Paths, key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load_from(&paths.config)?;
    set_value(&mut config, key, value)?;
    system_config::save_to(&config, &paths.config)?;

    println!("{} Set {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Print the config file path
pub async fn run_path(paths: &Paths, create: bool) -> Result<()> {
    if create && system_config::init_if_missing(&paths.config)? {
        eprintln!("{} Created default config", "✓".green());
    }
    println!("{}", paths.config.display());
    Ok(())
}

/// Print an example configuration
pub async fn run_example() -> Result<()> {
    print!("{}", system_config::example_config());
    Ok(())
}
