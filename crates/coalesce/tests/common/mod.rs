//! Shared helpers for coalescer integration tests
#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Records every execution with its offset from the start of the test
pub struct Recorder<T> {
    start: Instant,
    calls: Mutex<Vec<(u64, T)>>,
}

impl<T: Clone> Recorder<T> {
    /// Create a recorder whose clock starts now
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Record one execution
    pub fn record(&self, value: T) {
        let at = self.start.elapsed().as_millis() as u64;
        self.calls.lock().push((at, value));
    }

    /// All executions so far as (offset ms, value)
    pub fn calls(&self) -> Vec<(u64, T)> {
        self.calls.lock().clone()
    }

    /// Number of executions so far
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Sleep until `t_ms` after the recorder was created
    pub async fn at(&self, t_ms: u64) {
        sleep_until(self.start + ms(t_ms)).await;
    }
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Timer wheel resolution is one millisecond; allow for rounding
pub fn assert_near(actual_ms: u64, expected_ms: u64) {
    assert!(
        actual_ms >= expected_ms && actual_ms <= expected_ms + 3,
        "expected execution at ~{}ms, got {}ms",
        expected_ms,
        actual_ms
    );
}
