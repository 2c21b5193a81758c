//! Bare function wrapper owning a single coalescing stream

use crate::policy::DebouncePolicy;
use crate::timer::{self, Action, Slot};
use crate::Result;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Debounced wrapper around one action
///
/// Clones share the same stream, so a clone handed to another task
/// coalesces together with the handle it was cloned from.
///
/// ```ignore
/// let save = Debouncer::new(DebouncePolicy::trailing(Duration::from_millis(100)), |x: i32| x * 2)?;
/// save.call(1);
/// save.call(5); // only this one runs, 100ms from now
/// ```
pub struct Debouncer<A, R> {
    action: Action<A, R>,
    policy: DebouncePolicy,
    runtime: Handle,
    slot: Slot<R>,
}

impl<A, R> Clone for Debouncer<A, R> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
            policy: self.policy,
            runtime: self.runtime.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<A, R> Debouncer<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Wrap `action`, running timers on the current tokio runtime
    ///
    /// Fails with [`CoalesceError::NoRuntime`](crate::CoalesceError::NoRuntime)
    /// outside a runtime.
    pub fn new<F>(policy: DebouncePolicy, action: F) -> Result<Self>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Ok(Self::with_runtime(timer::current_runtime()?, policy, action))
    }

    /// Wrap `action`, running timers on `runtime`
    pub fn with_runtime<F>(runtime: Handle, policy: DebouncePolicy, action: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            action: Arc::new(action),
            policy,
            runtime,
            slot: timer::new_slot(),
        }
    }

    /// Request a run with `args`
    ///
    /// Returns the freshly computed result on a leading-edge run, otherwise
    /// whatever the last execution produced (`None` before the first one).
    pub fn call(&self, args: A) -> Option<R> {
        let action = Arc::clone(&self.action);
        timer::schedule(&self.slot, self.policy, &self.runtime, move || {
            Some(action(args))
        })
    }

    /// Drop the pending run, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        timer::cancel(&self.slot)
    }

    /// Result of the most recent execution
    pub fn last_result(&self) -> Option<R> {
        self.slot.lock().last_result().cloned()
    }

    /// True while a timer is armed
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_pending()
    }

    /// Number of times the action has run
    pub fn executions(&self) -> u64 {
        self.slot.lock().executions()
    }

    /// Policy fixed at construction
    pub fn policy(&self) -> DebouncePolicy {
        self.policy
    }
}
