//! Edge policy and wait window for a coalescing stream

use crate::{CoalesceError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which end of a burst runs the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Run on the first request of a burst, suppress the trailing run
    Leading,
    /// Run once after the burst has been quiet for the wait window
    #[default]
    Trailing,
}

/// Wait window plus edge, fixed when a stream is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebouncePolicy {
    wait: Duration,
    edge: Edge,
}

impl DebouncePolicy {
    /// Create a policy from a wait window and edge
    pub const fn new(wait: Duration, edge: Edge) -> Self {
        Self { wait, edge }
    }

    /// Trailing-edge policy
    pub const fn trailing(wait: Duration) -> Self {
        Self::new(wait, Edge::Trailing)
    }

    /// Leading-edge policy
    pub const fn leading(wait: Duration) -> Self {
        Self::new(wait, Edge::Leading)
    }

    /// Build a policy from a signed millisecond count
    ///
    /// Negative waits are rejected with [`CoalesceError::InvalidArgument`];
    /// they are never clamped to zero.
    pub fn from_millis(wait_ms: i64, edge: Edge) -> Result<Self> {
        let wait_ms = u64::try_from(wait_ms).map_err(|_| {
            CoalesceError::invalid(format!("wait must be >= 0, got {}ms", wait_ms))
        })?;
        Ok(Self::new(Duration::from_millis(wait_ms), edge))
    }

    /// Wait window
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Edge policy
    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// True for leading-edge streams
    pub fn is_leading(&self) -> bool {
        self.edge == Edge::Leading
    }
}
