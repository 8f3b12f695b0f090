//! Frame scheduler
//!
//! Multiplexes any number of per-frame callbacks onto the single host
//! animation clock. Each tick runs the enabled callbacks in priority order
//! (insertion order breaks ties) and stops early once the frame budget is
//! spent; whatever did not run gets another chance on the next tick.
//!
//! The clock subscription is lazy: the host is asked for frames when the first
//! callback registers and released when the last one leaves.
//!
//! ```ignore
//! let scheduler = FrameScheduler::new(Box::new(SystemFrameHost::new()), 16.0);
//! let sub = scheduler.subscribe("camera", FramePriority::High, |_ts, dt| {
//!     advance_camera(dt);
//!     Ok(())
//! });
//! // host loop: scheduler.tick(timestamp) once per display refresh
//! sub.cancel();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::error::{panic_message, CallbackError};
use crate::host::FrameHost;

/// Default per-tick budget (60 Hz)
pub const DEFAULT_FRAME_BUDGET_MS: f64 = 16.0;

/// A tick whose delta exceeds this multiple of the budget counts as dropped
const DROPPED_FRAME_FACTOR: f64 = 1.5;

/// Execution priority within a tick (lower runs first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FramePriority {
    /// Camera and transition work that must land every frame
    High = 0,
    /// Regular animation
    Medium = 1,
    /// Cosmetic extras, first to be deferred
    Low = 2,
}

/// Result returned by a frame callback
pub type FrameResult = Result<(), CallbackError>;

/// Per-frame callback: `(timestamp_ms, delta_ms)`
pub type FrameCallback = Box<dyn FnMut(f64, f64) -> FrameResult>;

/// Advisory scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulerMetrics {
    /// Ticks processed since construction
    pub frame_count: u64,
    /// Ticks whose delta exceeded 1.5x the budget
    pub dropped_frames: u64,
    /// Ticks cut short because the budget was spent
    pub budget_overruns: u64,
    /// Callbacks that returned an error or panicked
    pub callback_faults: u64,
    /// Registered and enabled callbacks
    pub active_callbacks: usize,
    /// All registered callbacks
    pub total_callbacks: usize,
}

struct Entry {
    priority: FramePriority,
    seq: u64,
    token: u64,
    enabled: bool,
    callback: Rc<RefCell<FrameCallback>>,
}

#[derive(Default)]
struct SchedulerState {
    entries: HashMap<String, Entry>,
    next_seq: u64,
    last_timestamp: Option<f64>,
    clock_running: bool,
    frame_count: u64,
    dropped_frames: u64,
    budget_overruns: u64,
    callback_faults: u64,
}

struct SchedulerInner {
    state: RefCell<SchedulerState>,
    host: RefCell<Box<dyn FrameHost>>,
    budget_ms: f64,
}

/// Shared handle to the frame scheduler
///
/// Cloning is cheap; all clones drive the same registry and host
/// subscription.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Rc<SchedulerInner>,
}

impl FrameScheduler {
    /// Create a scheduler over a host clock with a per-tick budget
    pub fn new(host: Box<dyn FrameHost>, budget_ms: f64) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                state: RefCell::new(SchedulerState::default()),
                host: RefCell::new(host),
                budget_ms: if budget_ms > 0.0 { budget_ms } else { DEFAULT_FRAME_BUDGET_MS },
            }),
        }
    }

    /// Register a callback under `id`
    ///
    /// An existing registration with the same id is replaced. The returned
    /// [`Subscription`] removes this registration only; it does nothing once
    /// the id has been re-registered by someone else.
    pub fn subscribe<F>(&self, id: impl Into<String>, priority: FramePriority, callback: F) -> Subscription
    where
        F: FnMut(f64, f64) -> FrameResult + 'static,
    {
        let id = id.into();
        let (token, start_clock) = {
            let mut state = self.inner.state.borrow_mut();
            let seq = state.next_seq;
            state.next_seq += 1;

            let entry = Entry {
                priority,
                seq,
                token: seq,
                enabled: true,
                callback: Rc::new(RefCell::new(Box::new(callback))),
            };
            if state.entries.insert(id.clone(), entry).is_some() {
                tracing::warn!(
                    target: "adaptive_effects::scheduler",
                    id = %id,
                    "Frame callback re-registered; replacing previous entry"
                );
            }

            let start_clock = !state.clock_running;
            if start_clock {
                state.clock_running = true;
                state.last_timestamp = None;
            }
            (seq, start_clock)
        };

        if start_clock {
            self.inner.host.borrow_mut().request_frames();
            tracing::debug!(target: "adaptive_effects::scheduler", "Animation clock started");
        }

        Subscription {
            scheduler: Rc::downgrade(&self.inner),
            id,
            token,
        }
    }

    /// Remove a callback; unknown ids are ignored
    pub fn unsubscribe(&self, id: &str) {
        remove_entry(&self.inner, id, None);
    }

    /// Pause or resume a callback without dropping its registration
    ///
    /// Returns `false` if `id` is not registered.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        match self.inner.state.borrow_mut().entries.get_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.inner.state.borrow().entries.contains_key(id)
    }

    /// Whether `id` is registered and enabled
    pub fn is_enabled(&self, id: &str) -> bool {
        self.inner
            .state
            .borrow()
            .entries
            .get(id)
            .is_some_and(|entry| entry.enabled)
    }

    /// Whether the host clock subscription is live
    pub fn is_clock_running(&self) -> bool {
        self.inner.state.borrow().clock_running
    }

    /// Per-tick budget in milliseconds
    pub fn budget_ms(&self) -> f64 {
        self.inner.budget_ms
    }

    /// Host wall time in milliseconds
    pub fn now_ms(&self) -> f64 {
        self.inner.host.borrow().now_ms()
    }

    /// Snapshot of the scheduler counters
    pub fn metrics(&self) -> SchedulerMetrics {
        let state = self.inner.state.borrow();
        SchedulerMetrics {
            frame_count: state.frame_count,
            dropped_frames: state.dropped_frames,
            budget_overruns: state.budget_overruns,
            callback_faults: state.callback_faults,
            active_callbacks: state.entries.values().filter(|e| e.enabled).count(),
            total_callbacks: state.entries.len(),
        }
    }

    /// Run one frame
    ///
    /// Called by the host once per display refresh while frames are requested.
    /// Ticks delivered while the clock is stopped are ignored.
    pub fn tick(&self, timestamp: f64) {
        let budget = self.inner.budget_ms;
        let (queue, delta) = {
            let mut state = self.inner.state.borrow_mut();
            if !state.clock_running {
                return;
            }

            let delta = state
                .last_timestamp
                .map(|previous| (timestamp - previous).max(0.0))
                .unwrap_or(0.0);
            state.last_timestamp = Some(timestamp);
            state.frame_count += 1;
            if delta > budget * DROPPED_FRAME_FACTOR {
                state.dropped_frames += 1;
            }

            let mut queue: Vec<(FramePriority, u64, String, u64, Rc<RefCell<FrameCallback>>)> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.enabled)
                .map(|(id, entry)| {
                    (entry.priority, entry.seq, id.clone(), entry.token, Rc::clone(&entry.callback))
                })
                .collect();
            queue.sort_by_key(|(priority, seq, ..)| (*priority, *seq));
            (queue, delta)
        };

        let started = self.now_ms();
        let total = queue.len();

        for (index, (_, _, id, token, callback)) in queue.into_iter().enumerate() {
            // Earlier callbacks may have removed or paused this one.
            if !self.is_live(&id, token) {
                continue;
            }

            let outcome = match callback.try_borrow_mut() {
                Ok(mut callback) => {
                    let callback: &mut dyn FnMut(f64, f64) -> FrameResult = &mut **callback;
                    panic::catch_unwind(AssertUnwindSafe(|| callback(timestamp, delta)))
                }
                Err(_) => {
                    tracing::warn!(
                        target: "adaptive_effects::scheduler",
                        id = %id,
                        "Skipping re-entrant frame callback"
                    );
                    continue;
                }
            };

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.inner.state.borrow_mut().callback_faults += 1;
                    tracing::warn!(
                        target: "adaptive_effects::scheduler",
                        id = %id,
                        error = %err,
                        "Frame callback failed"
                    );
                }
                Err(payload) => {
                    self.inner.state.borrow_mut().callback_faults += 1;
                    tracing::error!(
                        target: "adaptive_effects::scheduler",
                        id = %id,
                        panic = %panic_message(payload.as_ref()),
                        "Frame callback panicked"
                    );
                }
            }

            let elapsed = self.now_ms() - started;
            if elapsed > budget {
                self.inner.state.borrow_mut().budget_overruns += 1;
                tracing::warn!(
                    target: "adaptive_effects::scheduler",
                    elapsed_ms = elapsed,
                    budget_ms = budget,
                    deferred = total - index - 1,
                    "Frame budget exceeded; deferring remaining callbacks"
                );
                break;
            }
        }
    }

    fn is_live(&self, id: &str, token: u64) -> bool {
        self.inner
            .state
            .borrow()
            .entries
            .get(id)
            .is_some_and(|entry| entry.enabled && entry.token == token)
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("FrameScheduler")
            .field("callbacks", &state.entries.len())
            .field("clock_running", &state.clock_running)
            .field("budget_ms", &self.inner.budget_ms)
            .finish()
    }
}

/// Handle returned by [`FrameScheduler::subscribe`]
///
/// Dropping the handle leaves the callback registered.
#[derive(Debug)]
pub struct Subscription {
    scheduler: Weak<SchedulerInner>,
    id: String,
    token: u64,
}

impl Subscription {
    /// The registered callback id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the callback if this handle's registration is still current
    pub fn cancel(self) {
        if let Some(inner) = self.scheduler.upgrade() {
            remove_entry(&inner, &self.id, Some(self.token));
        }
    }
}

fn remove_entry(inner: &SchedulerInner, id: &str, token: Option<u64>) {
    let stop_clock = {
        let mut state = inner.state.borrow_mut();
        let matches = state
            .entries
            .get(id)
            .is_some_and(|entry| token.map_or(true, |token| entry.token == token));
        if !matches {
            return;
        }
        state.entries.remove(id);

        let stop_clock = state.entries.is_empty() && state.clock_running;
        if stop_clock {
            state.clock_running = false;
            state.last_timestamp = None;
        }
        stop_clock
    };

    if stop_clock {
        inner.host.borrow_mut().cancel_frames();
        tracing::debug!(target: "adaptive_effects::scheduler", "Animation clock stopped");
    }
}
