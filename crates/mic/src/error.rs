//! Error types for microphone operations

use thiserror::Error;

/// Microphone backend and settings failures
///
/// `Clone` so a failure can be kept as a coalesced stream's last result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MicError {
    /// External command could not run or exited non-zero
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// Backend output was not understood
    #[error("parse error: {0}")]
    Parse(String),

    /// Backend not available on this platform
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Settings sink rejected a write
    #[error("failed to persist settings: {0}")]
    Persist(String),
}
