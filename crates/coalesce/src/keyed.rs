//! Coalescing streams addressed by caller-supplied keys
//!
//! A [`KeyedRegistry`] maps each key to its own stream state. Entries are
//! created on first request and live until the owner removes them, either
//! explicitly ([`KeyedRegistry::remove`]) or through idle eviction
//! ([`KeyedRegistry::evict_idle`], [`KeyedRegistry::spawn_eviction`]).
//! Without either, a long-running process keeps one entry per key it has
//! ever seen.

use crate::policy::DebouncePolicy;
use crate::timer::{self, Action, Slot};
use crate::{CoalesceError, Result};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, info};

/// Registry of keyed coalescing streams
///
/// Cloning is cheap and shares the underlying map.
pub struct KeyedRegistry<K, R> {
    slots: Arc<DashMap<K, Slot<R>>>,
    runtime: Handle,
}

impl<K, R> Clone for KeyedRegistry<K, R> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            runtime: self.runtime.clone(),
        }
    }
}

impl<K, R> KeyedRegistry<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Clone + Send + 'static,
{
    /// Create an empty registry on the current tokio runtime
    pub fn new() -> Result<Self> {
        Ok(Self::with_runtime(timer::current_runtime()?))
    }

    /// Create an empty registry running timers on `runtime`
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            runtime,
        }
    }

    /// Bind `action` to the stream for `key`
    ///
    /// Handles bound to the same key share one stream: a request through
    /// either resets the other's pending timer.
    pub fn with_key<A, F>(&self, key: K, policy: DebouncePolicy, action: F) -> KeyedDebounced<K, A, R>
    where
        A: Send + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        KeyedDebounced {
            registry: self.clone(),
            key,
            policy,
            action: Arc::new(action),
        }
    }

    /// Resolve the slot for `key`, creating it if absent
    ///
    /// The map guard is released before the caller locks the slot.
    fn slot(&self, key: &K) -> Slot<R> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        let entry = self.slots.entry(key.clone()).or_insert_with(timer::new_slot);
        Arc::clone(entry.value())
    }

    fn existing(&self, key: &K) -> Option<Slot<R>> {
        self.slots.get(key).map(|slot| Arc::clone(slot.value()))
    }

    /// Drop the pending run for `key`. Unknown keys are a no-op.
    pub fn cancel(&self, key: &K) -> bool {
        self.existing(key).map_or(false, |slot| timer::cancel(&slot))
    }

    /// Drop every pending run. Returns how many were pending.
    pub fn cancel_all(&self) -> usize {
        let slots: Vec<Slot<R>> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        slots.iter().filter(|slot| timer::cancel(slot)).count()
    }

    /// Result of the most recent execution for `key`
    pub fn last_result(&self, key: &K) -> Option<R> {
        self.existing(key)
            .and_then(|slot| slot.lock().last_result().cloned())
    }

    /// True while a timer is armed for `key`
    pub fn is_pending(&self, key: &K) -> bool {
        self.existing(key).map_or(false, |slot| slot.lock().is_pending())
    }

    /// True while a trailing run is waiting for `key`'s window to close
    ///
    /// Unlike [`is_pending`](Self::is_pending) this is false during a
    /// leading-edge window, where the action has already run.
    pub fn has_deferred(&self, key: &K) -> bool {
        self.existing(key).map_or(false, |slot| slot.lock().has_deferred())
    }

    /// Number of executions recorded for `key`
    pub fn executions(&self, key: &K) -> u64 {
        self.existing(key).map_or(0, |slot| slot.lock().executions())
    }

    /// True if `key` has an entry
    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Remove the entry for `key`, cancelling its pending run
    pub fn remove(&self, key: &K) -> bool {
        match self.slots.remove(key) {
            Some((_, slot)) => {
                slot.lock().retire();
                true
            }
            None => false,
        }
    }

    /// Remove entries that have no armed timer and have been idle for at
    /// least `max_idle`. Returns the number of evicted entries.
    ///
    /// Entries whose lock is held (an action is running) are kept.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut evicted = 0;

        self.slots.retain(|_, slot| {
            let Some(mut state) = slot.try_lock() else {
                return true;
            };
            let idle = state.idle_for(now).unwrap_or(Duration::MAX);
            if state.is_pending() || idle < max_idle {
                return true;
            }
            // Requests already holding this slot resolve again
            state.retire();
            evicted += 1;
            false
        });

        evicted
    }

    /// Run [`evict_idle`](Self::evict_idle) every `every`
    ///
    /// The task holds a clone of the registry; abort the returned handle to
    /// stop it.
    pub fn spawn_eviction(&self, every: Duration, max_idle: Duration) -> Result<JoinHandle<()>> {
        if every.is_zero() {
            return Err(CoalesceError::invalid("eviction interval must be > 0"));
        }

        let registry = self.clone();
        Ok(self.runtime.spawn(async move {
            let mut timer = interval(every);
            info!("Starting keyed debounce eviction (interval: {:?}, max idle: {:?})", every, max_idle);

            loop {
                timer.tick().await;

                let evicted = registry.evict_idle(max_idle);
                if evicted > 0 {
                    info!("Evicted {} idle debounce streams ({} remain)", evicted, registry.len());
                } else {
                    debug!("Debounce eviction: nothing idle");
                }
            }
        }))
    }
}

/// Action bound to one key of a [`KeyedRegistry`]
pub struct KeyedDebounced<K, A, R> {
    registry: KeyedRegistry<K, R>,
    key: K,
    policy: DebouncePolicy,
    action: Action<A, R>,
}

impl<K: Clone, A, R> Clone for KeyedDebounced<K, A, R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            key: self.key.clone(),
            policy: self.policy,
            action: Arc::clone(&self.action),
        }
    }
}

impl<K, A, R> KeyedDebounced<K, A, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Request a run with `args` on this key's stream
    ///
    /// The stream is looked up (or created) on every call, so a handle keeps
    /// working after its entry was removed or evicted.
    pub fn call(&self, args: A) -> Option<R> {
        let action = Arc::clone(&self.action);
        timer::schedule_with(
            || self.registry.slot(&self.key),
            self.policy,
            &self.registry.runtime,
            move || Some(action(args)),
        )
    }

    /// Drop this key's pending run
    pub fn cancel(&self) -> bool {
        self.registry.cancel(&self.key)
    }

    /// Result of the most recent execution for this key
    pub fn last_result(&self) -> Option<R> {
        self.registry.last_result(&self.key)
    }

    /// Key this handle is bound to
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Policy fixed at binding time
    pub fn policy(&self) -> DebouncePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_created_lazily() {
        let registry: KeyedRegistry<&'static str, u32> = KeyedRegistry::new().unwrap();
        let handle = registry.with_key("a", DebouncePolicy::trailing(ms(10)), |x: u32| x);

        assert!(registry.is_empty());
        assert!(!registry.contains(&"a"));

        handle.call(1);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_pending(&"a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_key_operations_are_noops() {
        let registry: KeyedRegistry<String, u32> = KeyedRegistry::new().unwrap();

        assert!(!registry.cancel(&"missing".to_string()));
        assert_eq!(registry.last_result(&"missing".to_string()), None);
        assert_eq!(registry.executions(&"missing".to_string()), 0);
        assert!(!registry.remove(&"missing".to_string()));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handles_on_same_key_share_stream() {
        let registry: KeyedRegistry<&'static str, &'static str> = KeyedRegistry::new().unwrap();
        let first = registry.with_key("save", DebouncePolicy::trailing(ms(50)), |_: ()| "first");
        let second = registry.with_key("save", DebouncePolicy::trailing(ms(50)), |_: ()| "second");

        first.call(());
        sleep(ms(10)).await;
        second.call(());

        sleep(ms(100)).await;
        assert_eq!(registry.executions(&"save"), 1);
        assert_eq!(first.last_result(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_cancels_pending_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let registry: KeyedRegistry<u8, ()> = KeyedRegistry::new().unwrap();
        let counter = Arc::clone(&runs);
        let handle = registry.with_key(1, DebouncePolicy::trailing(ms(20)), move |_: ()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.call(());
        assert!(registry.remove(&1));
        sleep(ms(50)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());

        // The handle recreates the entry on its next call
        handle.call(());
        sleep(ms(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let registry: KeyedRegistry<u8, u8> = KeyedRegistry::new().unwrap();
        for key in 0..4 {
            registry.with_key(key, DebouncePolicy::trailing(ms(20)), |x: u8| x).call(key);
        }

        assert_eq!(registry.cancel_all(), 4);
        assert_eq!(registry.cancel_all(), 0);
        sleep(ms(50)).await;
        assert!((0..4).all(|key| registry.last_result(&key).is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_keeps_busy_and_recent_streams() {
        let registry: KeyedRegistry<&'static str, u32> = KeyedRegistry::new().unwrap();
        let policy = DebouncePolicy::trailing(ms(10));

        registry.with_key("old", policy, |x: u32| x).call(1);
        sleep(ms(100)).await;
        registry.with_key("recent", policy, |x: u32| x).call(2);
        sleep(ms(20)).await;
        registry.with_key("pending", DebouncePolicy::trailing(ms(500)), |x: u32| x).call(3);

        assert_eq!(registry.evict_idle(ms(50)), 1);
        assert!(!registry.contains(&"old"));
        assert!(registry.contains(&"recent"));
        assert!(registry.contains(&"pending"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_eviction_runs_periodically() {
        let registry: KeyedRegistry<u32, u32> = KeyedRegistry::new().unwrap();
        for key in 0..3 {
            registry.with_key(key, DebouncePolicy::leading(ms(5)), |x: u32| x).call(key);
        }

        let evictor = registry.spawn_eviction(ms(100), ms(50)).unwrap();
        sleep(ms(250)).await;
        assert!(registry.is_empty());
        evictor.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_slot_is_not_reused() {
        let registry: KeyedRegistry<&'static str, u32> = KeyedRegistry::new().unwrap();
        let handle = registry.with_key("k", DebouncePolicy::trailing(ms(10)), |x: u32| x);

        // A request that resolved its slot just before eviction
        let stale = registry.slot(&"k");
        assert_eq!(registry.evict_idle(Duration::ZERO), 1);

        handle.call(1);
        handle.call(2);
        sleep(ms(20)).await;

        assert!(!stale.lock().is_pending());
        assert_eq!(stale.lock().executions(), 0);
        assert_eq!(registry.executions(&"k"), 1);
        assert_eq!(handle.last_result(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_deferred_tracks_trailing_work() {
        let registry: KeyedRegistry<&'static str, u32> = KeyedRegistry::new().unwrap();
        registry.with_key("lead", DebouncePolicy::leading(ms(50)), |x: u32| x).call(1);
        registry.with_key("trail", DebouncePolicy::trailing(ms(50)), |x: u32| x).call(2);

        assert!(registry.is_pending(&"lead"));
        assert!(!registry.has_deferred(&"lead"));
        assert!(registry.has_deferred(&"trail"));
        assert!(!registry.has_deferred(&"missing"));

        sleep(ms(60)).await;
        assert!(!registry.has_deferred(&"trail"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_eviction_rejects_zero_interval() {
        let registry: KeyedRegistry<u32, u32> = KeyedRegistry::new().unwrap();
        let err = registry.spawn_eviction(Duration::ZERO, ms(10)).unwrap_err();
        assert!(matches!(err, CoalesceError::InvalidArgument(_)));
    }
}
