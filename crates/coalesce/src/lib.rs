//! Timer-based call coalescing for Snub
//!
//! This crate provides one debounce algorithm in three call-site shapes:
//! - [`Debouncer`]: a bare function wrapper owning a single stream
//! - [`KeyedRegistry`]: streams addressed by caller-supplied keys
//! - [`ScopedDebouncer`]: streams addressed by the identity of an `Arc` instance
//!
//! Every shape supports leading and trailing edges, remembers the last
//! computed result, and exposes explicit cancellation. Timers run as tokio
//! tasks on the runtime captured at construction.

pub mod config;
pub mod debounce;
pub mod error;
pub mod keyed;
pub mod policy;
pub mod scoped;
mod timer;

// Re-exports
pub use config::DebounceConfig;
pub use debounce::Debouncer;
pub use error::CoalesceError;
pub use keyed::{KeyedDebounced, KeyedRegistry};
pub use policy::{DebouncePolicy, Edge};
pub use scoped::ScopedDebouncer;

/// Result type for coalescer operations
pub type Result<T> = std::result::Result<T, CoalesceError>;
