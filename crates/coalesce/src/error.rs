//! Error types for the coalescer

use thiserror::Error;

/// Errors raised when building or configuring a coalescing stream
///
/// Failures of the wrapped action are never converted into this type: a
/// panicking action unwinds through whoever ran it, and a `Result`-returning
/// action simply has its `Err` recorded as the last result.
#[derive(Debug, Error)]
pub enum CoalesceError {
    /// Argument out of range (negative wait, zero eviction interval, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Constructed outside a tokio runtime, so timers have nowhere to run
    #[error("no tokio runtime available to drive debounce timers")]
    NoRuntime,

    /// Config file could not be parsed
    #[error("failed to parse debounce config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("failed to serialize debounce config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Config file could not be read or written
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoalesceError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
