//! System configuration and persisted settings
//!
//! Files live under the platform config dir:
//! ```text
//! <config dir>/snub/
//!   config.toml     debounce windows
//!   settings.toml   user settings (telemetry)
//! ```
//! `--config <path>` moves both; `settings.toml` always sits next to the
//! config file.

use anyhow::{Context, Result};
use coalesce::{DebounceConfig, Edge};
use mic::{ControllerOptions, Settings, SettingsSink};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";
const SETTINGS_FILE: &str = "settings.toml";

/// Top-level config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnubConfig {
    /// Debounce for the mute toggle
    pub toggle: DebounceConfig,

    /// Debounce for settings writes
    pub settings: DebounceConfig,
}

impl Default for SnubConfig {
    fn default() -> Self {
        Self {
            toggle: DebounceConfig::new(300, Edge::Leading),
            settings: DebounceConfig::new(500, Edge::Trailing),
        }
    }
}

impl SnubConfig {
    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.toggle.validate().context("Invalid [toggle] section")?;
        self.settings.validate().context("Invalid [settings] section")?;
        Ok(())
    }

    /// Controller options for this config
    pub fn controller_options(
        &self,
        initial_settings: Settings,
        sink: Option<SettingsSink>,
    ) -> Result<ControllerOptions> {
        Ok(ControllerOptions {
            toggle: self.toggle.to_policy().context("Invalid [toggle] section")?,
            settings: self.settings.to_policy().context("Invalid [settings] section")?,
            settings_eviction: self.settings.idle_eviction(),
            initial_settings,
            sink,
            sound: None,
        })
    }
}

/// Resolved file locations
#[derive(Debug, Clone)]
pub struct Paths {
    pub config: PathBuf,
    pub settings: PathBuf,
}

impl Paths {
    /// Use `config_override` if given, else the platform default
    pub fn resolve(config_override: Option<&Path>) -> Result<Self> {
        let config = match config_override {
            Some(path) => path.to_path_buf(),
            None => config_file_path().context("Could not determine config file path")?,
        };
        let settings = config.with_file_name(SETTINGS_FILE);
        Ok(Self { config, settings })
    }
}

/// Default config file path
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snub").join(CONFIG_FILE))
}

/// Load config, falling back to defaults when the file does not exist
pub fn load_from(path: &Path) -> Result<SnubConfig> {
    if !path.exists() {
        return Ok(SnubConfig::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SnubConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Write config to `path`, creating parent directories
pub fn save_to(config: &SnubConfig, path: &Path) -> Result<()> {
    config.validate()?;
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    write_file(path, &contents)
}

/// Create the config file with defaults. Returns false if it already existed.
pub fn init_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_file(path, &example_config())?;
    Ok(true)
}

/// Annotated default config
pub fn example_config() -> String {
    let defaults = SnubConfig::default();
    format!(
        r#"# Snub configuration

# Mute toggle: the first press acts immediately, presses within the
# window after it are ignored.
[toggle]
wait_ms = {}
edge = "leading"

# Settings writes: only the last change within the window is saved.
[settings]
wait_ms = {}
edge = "trailing"
# idle_eviction_secs = 3600
"#,
        defaults.toggle.wait_ms, defaults.settings.wait_ms
    )
}

/// Load persisted settings, defaulting when absent
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))
}

/// Persist settings
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    let contents = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    write_file(path, &contents)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
