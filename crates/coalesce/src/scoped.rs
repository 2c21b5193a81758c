//! Coalescing streams scoped to the identity of an owning instance
//!
//! A [`ScopedDebouncer`] wraps a method-like action `Fn(&T, A) -> R` and keeps
//! one stream per `Arc<T>` it is invoked on. Two instances never coalesce
//! together, even when their requests interleave; two calls on the same
//! instance always do.
//!
//! Entries hold a `Weak<T>`, never a strong reference, so the registry does
//! not extend an instance's lifetime. A trailing run whose instance is gone by
//! the time the timer fires is skipped. Because the `Weak` keeps the
//! allocation (not the value) alive, an address cannot be reused while its
//! entry exists; call [`ScopedDebouncer::release`] when an instance is
//! retired, or [`ScopedDebouncer::purge_dead`] periodically.
//!
//! Invocation without an instance is not expressible: [`ScopedDebouncer::call`]
//! takes `&Arc<T>`.

use crate::policy::DebouncePolicy;
use crate::timer::{self, Slot};
use crate::Result;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::debug;

type ScopedAction<T, A, R> = Arc<dyn Fn(&T, A) -> R + Send + Sync>;

struct Scope<T, R> {
    owner: Weak<T>,
    slot: Slot<R>,
}

fn identity<T>(instance: &Arc<T>) -> usize {
    Arc::as_ptr(instance) as usize
}

/// Per-instance debounced method
pub struct ScopedDebouncer<T, A, R> {
    scopes: Arc<DashMap<usize, Scope<T, R>>>,
    policy: DebouncePolicy,
    action: ScopedAction<T, A, R>,
    runtime: Handle,
}

impl<T, A, R> Clone for ScopedDebouncer<T, A, R> {
    fn clone(&self) -> Self {
        Self {
            scopes: Arc::clone(&self.scopes),
            policy: self.policy,
            action: Arc::clone(&self.action),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T, A, R> ScopedDebouncer<T, A, R>
where
    T: Send + Sync + 'static,
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Wrap `action`, running timers on the current tokio runtime
    pub fn new<F>(policy: DebouncePolicy, action: F) -> Result<Self>
    where
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        Ok(Self::with_runtime(timer::current_runtime()?, policy, action))
    }

    /// Wrap `action`, running timers on `runtime`
    pub fn with_runtime<F>(runtime: Handle, policy: DebouncePolicy, action: F) -> Self
    where
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        Self {
            scopes: Arc::new(DashMap::new()),
            policy,
            action: Arc::new(action),
            runtime,
        }
    }

    fn slot(&self, instance: &Arc<T>) -> Slot<R> {
        let scope = self
            .scopes
            .entry(identity(instance))
            .or_insert_with(|| Scope {
                owner: Arc::downgrade(instance),
                slot: timer::new_slot(),
            });
        Arc::clone(&scope.slot)
    }

    fn existing(&self, instance: &Arc<T>) -> Option<Slot<R>> {
        self.scopes
            .get(&identity(instance))
            .map(|scope| Arc::clone(&scope.slot))
    }

    /// Request a run of the action on `instance` with `args`
    pub fn call(&self, instance: &Arc<T>, args: A) -> Option<R> {
        let owner = Arc::downgrade(instance);
        let action = Arc::clone(&self.action);

        timer::schedule_with(
            || self.slot(instance),
            self.policy,
            &self.runtime,
            move || {
                let Some(instance) = owner.upgrade() else {
                    debug!("scoped debounce target dropped before its run");
                    return None;
                };
                Some(action(instance.as_ref(), args))
            },
        )
    }

    /// Drop the pending run for `instance`
    pub fn cancel(&self, instance: &Arc<T>) -> bool {
        self.existing(instance)
            .map_or(false, |slot| timer::cancel(&slot))
    }

    /// Result of the most recent execution for `instance`
    pub fn last_result(&self, instance: &Arc<T>) -> Option<R> {
        self.existing(instance)
            .and_then(|slot| slot.lock().last_result().cloned())
    }

    /// True while a timer is armed for `instance`
    pub fn is_pending(&self, instance: &Arc<T>) -> bool {
        self.existing(instance)
            .map_or(false, |slot| slot.lock().is_pending())
    }

    /// Remove the entry for `instance`, cancelling its pending run
    pub fn release(&self, instance: &Arc<T>) -> bool {
        match self.scopes.remove(&identity(instance)) {
            Some((_, scope)) => {
                scope.slot.lock().retire();
                true
            }
            None => false,
        }
    }

    /// Remove entries whose instance has been dropped. Returns the count.
    ///
    /// Entries whose lock is held (an action is running) are kept until the
    /// next purge.
    pub fn purge_dead(&self) -> usize {
        let mut purged = 0;
        self.scopes.retain(|_, scope| {
            if scope.owner.strong_count() > 0 {
                return true;
            }
            let Some(mut state) = scope.slot.try_lock() else {
                return true;
            };
            state.retire();
            purged += 1;
            false
        });
        if purged > 0 {
            debug!("Purged {} scoped debounce entries", purged);
        }
        purged
    }

    /// Number of entries, dead instances included
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
