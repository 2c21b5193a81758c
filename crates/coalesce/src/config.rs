//! Serializable debounce settings
//!
//! Waits are stored as signed milliseconds so a negative value written in a
//! config file is reported as an error instead of failing to parse or being
//! clamped.

use crate::policy::{DebouncePolicy, Edge};
use crate::{CoalesceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on a wait window (1 hour)
pub const MAX_WAIT_MS: i64 = 60 * 60 * 1000;

/// Debounce settings for one kind of stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Wait window in milliseconds (default: 250)
    pub wait_ms: i64,

    /// Which edge runs the action (default: trailing)
    pub edge: Edge,

    /// Evict keyed streams idle for this long (default: never)
    pub idle_eviction_secs: Option<u64>,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            wait_ms: 250,
            edge: Edge::Trailing,
            idle_eviction_secs: None,
        }
    }
}

impl DebounceConfig {
    /// Config with the given wait and edge, no eviction
    pub fn new(wait_ms: i64, edge: Edge) -> Self {
        Self {
            wait_ms,
            edge,
            idle_eviction_secs: None,
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.wait_ms < 0 {
            return Err(CoalesceError::invalid(format!(
                "wait_ms must be >= 0, got {}",
                self.wait_ms
            )));
        }
        if self.wait_ms > MAX_WAIT_MS {
            return Err(CoalesceError::invalid(format!(
                "wait_ms must be <= {}, got {}",
                MAX_WAIT_MS, self.wait_ms
            )));
        }
        if self.idle_eviction_secs == Some(0) {
            return Err(CoalesceError::invalid("idle_eviction_secs must be > 0"));
        }
        Ok(())
    }

    /// Validated policy
    pub fn to_policy(&self) -> Result<DebouncePolicy> {
        self.validate()?;
        DebouncePolicy::from_millis(self.wait_ms, self.edge)
    }

    /// Idle bound for keyed eviction, if enabled
    pub fn idle_eviction(&self) -> Option<Duration> {
        self.idle_eviction_secs.map(Duration::from_secs)
    }

    /// Parse and validate from TOML
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
