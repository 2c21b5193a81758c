//! Coalescing state machine shared by every debounce shape
//!
//! One [`CoalesceState`] backs one coalescing stream. The whole request
//! transition (cancel the pending timer, maybe run the leading edge, arm a
//! new timer) happens under the slot lock, and so does a timer's expiry.
//! Each timer carries an id; an expiry only fires if its id is still the
//! pending one, so a task that lost the race against `abort()` does nothing.
//!
//! Registries that unmap a slot mark it retired under the same lock. A
//! request that resolved the slot before it was unmapped sees the flag once
//! it gets the lock and resolves again, so one key never ends up with two
//! live slots.

use crate::policy::{DebouncePolicy, Edge};
use crate::{CoalesceError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Shared handle to one stream's state
pub(crate) type Slot<R> = Arc<Mutex<CoalesceState<R>>>;

/// Wrapped action taking the request arguments
pub(crate) type Action<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// Outstanding delayed execution
struct PendingTimer {
    id: u64,
    handle: JoinHandle<()>,

    /// Carries a trailing-edge job
    deferred: bool,
}

/// Deadlines beyond this are clamped (about 30 years)
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Mutable state of one coalescing stream
pub(crate) struct CoalesceState<R> {
    /// At most one armed timer
    pending: Option<PendingTimer>,

    /// Id handed to the next armed timer
    next_timer_id: u64,

    /// Result of the most recent execution
    last_result: Option<R>,

    /// Time of the most recent request (idle eviction)
    last_request: Option<Instant>,

    /// Number of executions of the wrapped action
    executions: u64,

    /// Unmapped from its registry; requests must resolve a fresh slot
    retired: bool,
}

impl<R> CoalesceState<R> {
    fn new() -> Self {
        Self {
            pending: None,
            next_timer_id: 0,
            last_result: None,
            last_request: None,
            executions: 0,
            retired: false,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn last_result(&self) -> Option<&R> {
        self.last_result.as_ref()
    }

    /// True while an armed timer will run a job when it fires
    pub(crate) fn has_deferred(&self) -> bool {
        self.pending.as_ref().map_or(false, |timer| timer.deferred)
    }

    pub(crate) fn executions(&self) -> u64 {
        self.executions
    }

    /// Time since the last request, or `None` if the stream was never used
    pub(crate) fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.last_request.map(|at| now.saturating_duration_since(at))
    }

    /// Abort the armed timer, if any. Returns whether one was pending.
    pub(crate) fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                timer.handle.abort();
                trace!(timer = timer.id, "debounce timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel the armed timer and mark the slot as unmapped
    pub(crate) fn retire(&mut self) {
        self.cancel_pending();
        self.retired = true;
    }

    fn record(&mut self, result: R) {
        self.last_result = Some(result);
        self.executions += 1;
    }
}

/// Allocate an empty slot
pub(crate) fn new_slot<R>() -> Slot<R> {
    Arc::new(Mutex::new(CoalesceState::new()))
}

/// Runtime handle for constructors that were not given one
pub(crate) fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|_| CoalesceError::NoRuntime)
}

/// `now + wait`, clamped instead of overflowing
fn deadline(now: Instant, wait: Duration) -> Instant {
    now.checked_add(wait)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Apply one request to a stream that is never unmapped
pub(crate) fn schedule<R, J>(
    slot: &Slot<R>,
    policy: DebouncePolicy,
    runtime: &Handle,
    job: J,
) -> Option<R>
where
    R: Clone + Send + 'static,
    J: FnOnce() -> Option<R> + Send + 'static,
{
    schedule_with(|| Arc::clone(slot), policy, runtime, job)
}

/// Apply one request to the stream `resolve` returns
///
/// `resolve` is called again whenever the slot it handed out turns out to be
/// retired. `job` is the action bound to this request's arguments. It
/// returns `None` when it decided not to run (e.g. its target is gone),
/// which leaves the recorded result untouched. Returns the recorded result
/// after the request.
pub(crate) fn schedule_with<R, J, S>(
    resolve: S,
    policy: DebouncePolicy,
    runtime: &Handle,
    job: J,
) -> Option<R>
where
    R: Clone + Send + 'static,
    J: FnOnce() -> Option<R> + Send + 'static,
    S: Fn() -> Slot<R>,
{
    loop {
        let slot = resolve();
        let mut state = slot.lock();
        if state.retired {
            trace!("debounce slot retired, resolving again");
            continue;
        }
        return arm(&slot, &mut state, policy, runtime, job);
    }
}

fn arm<R, J>(
    slot: &Slot<R>,
    state: &mut CoalesceState<R>,
    policy: DebouncePolicy,
    runtime: &Handle,
    job: J,
) -> Option<R>
where
    R: Clone + Send + 'static,
    J: FnOnce() -> Option<R> + Send + 'static,
{
    let now = Instant::now();
    state.last_request = Some(now);

    // 1. A newer request always replaces the armed timer
    let was_pending = state.cancel_pending();

    // 2. Leading edge runs only on the first request of a burst
    let deferred_job = match policy.edge() {
        Edge::Leading => {
            if !was_pending {
                if let Some(result) = job() {
                    state.record(result);
                }
                debug!("debounce leading edge fired");
            }
            None
        }
        Edge::Trailing => Some(job),
    };
    let deferred = deferred_job.is_some();

    // 3. Re-arm
    let id = state.next_timer_id;
    state.next_timer_id = state.next_timer_id.wrapping_add(1);
    let handle = runtime.spawn(expire(
        Arc::clone(slot),
        id,
        deadline(now, policy.wait()),
        deferred_job,
    ));
    state.pending = Some(PendingTimer { id, handle, deferred });
    let wait_ms = u64::try_from(policy.wait().as_millis()).unwrap_or(u64::MAX);
    trace!(timer = id, wait_ms, "debounce timer armed");

    state.last_result.clone()
}

/// Drop the armed timer without running it
pub(crate) fn cancel<R>(slot: &Slot<R>) -> bool {
    slot.lock().cancel_pending()
}

async fn expire<R, J>(slot: Slot<R>, id: u64, deadline: Instant, deferred: Option<J>)
where
    J: FnOnce() -> Option<R>,
{
    sleep_until(deadline).await;

    let mut state = slot.lock();
    match &state.pending {
        Some(timer) if timer.id == id => {}
        _ => {
            trace!(timer = id, "stale debounce timer ignored");
            return;
        }
    }
    state.pending = None;

    // Leading-edge streams clear the window and stop here
    if let Some(job) = deferred {
        match job() {
            Some(result) => {
                state.record(result);
                debug!(timer = id, "debounce trailing edge fired");
            }
            None => debug!(timer = id, "debounce trailing edge skipped"),
        }
    }
}
