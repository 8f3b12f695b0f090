//! Performance monitor
//!
//! Samples frame durations through the scheduler, evaluates them once per
//! interval and reports tier transitions to a single listener. The monitor
//! observes only; reacting to a tier is the listener's job.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::metrics::{FrameWindow, PerformanceMetrics, PerformanceTier, DROPPED_FRAME_THRESHOLD_MS};
use crate::error::panic_message;
use crate::scheduler::{FramePriority, FrameScheduler, Subscription};

/// Scheduler id of the sampling callback
pub const MONITOR_CALLBACK_ID: &str = "performance-monitor";

/// Evaluations kept by [`PerformanceMonitor::history`]
pub const HISTORY_LEN: usize = 60;

/// Default evaluation interval
pub const DEFAULT_INTERVAL_MS: f64 = 1000.0;

/// Tier-change listener: `(new_tier, previous_tier)`
pub type TierListener = Box<dyn FnMut(PerformanceTier, PerformanceTier)>;

/// Host heap probe returning usage in megabytes
pub type HeapProbe = Box<dyn Fn() -> Option<f64>>;

struct MonitorState {
    window: FrameWindow,
    interval_ms: f64,
    last_evaluation: Option<f64>,
    tier: PerformanceTier,
    latest: PerformanceMetrics,
    history: VecDeque<PerformanceMetrics>,
}

struct MonitorInner {
    state: RefCell<MonitorState>,
    listener: RefCell<Option<TierListener>>,
    heap_probe: RefCell<Option<HeapProbe>>,
    subscription: RefCell<Option<Subscription>>,
}

/// Shared handle to the performance monitor
#[derive(Clone)]
pub struct PerformanceMonitor {
    inner: Rc<MonitorInner>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_MS, super::metrics::DEFAULT_SAMPLE_WINDOW)
    }
}

impl PerformanceMonitor {
    /// Create a stopped monitor; the initial tier is excellent
    pub fn new(interval_ms: f64, sample_window: usize) -> Self {
        Self {
            inner: Rc::new(MonitorInner {
                state: RefCell::new(MonitorState {
                    window: FrameWindow::new(sample_window),
                    interval_ms: if interval_ms > 0.0 { interval_ms } else { DEFAULT_INTERVAL_MS },
                    last_evaluation: None,
                    tier: PerformanceTier::Excellent,
                    latest: PerformanceMetrics::default(),
                    history: VecDeque::with_capacity(HISTORY_LEN),
                }),
                listener: RefCell::new(None),
                heap_probe: RefCell::new(None),
                subscription: RefCell::new(None),
            }),
        }
    }

    /// Install the tier-change listener, replacing any previous one
    pub fn set_tier_listener(&self, listener: impl FnMut(PerformanceTier, PerformanceTier) + 'static) {
        *self.inner.listener.borrow_mut() = Some(Box::new(listener));
    }

    /// Install a heap usage probe
    pub fn set_heap_probe(&self, probe: impl Fn() -> Option<f64> + 'static) {
        *self.inner.heap_probe.borrow_mut() = Some(Box::new(probe));
    }

    /// Begin sampling through `scheduler`; no-op when already running
    pub fn start(&self, scheduler: &FrameScheduler) {
        if self.is_running() {
            return;
        }

        {
            let mut state = self.inner.state.borrow_mut();
            state.window.clear();
            state.last_evaluation = None;
        }

        let weak: Weak<MonitorInner> = Rc::downgrade(&self.inner);
        let subscription = scheduler.subscribe(MONITOR_CALLBACK_ID, FramePriority::High, move |timestamp, delta| {
            if let Some(inner) = weak.upgrade() {
                PerformanceMonitor { inner }.record_frame(timestamp, delta);
            }
            Ok(())
        });
        *self.inner.subscription.borrow_mut() = Some(subscription);
        tracing::debug!(target: "adaptive_effects::monitor", "Performance monitor started");
    }

    /// Stop sampling; no-op when not running
    pub fn stop(&self) {
        let subscription = self.inner.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
            tracing::debug!(target: "adaptive_effects::monitor", "Performance monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.subscription.borrow().is_some()
    }

    /// Current tier
    pub fn tier(&self) -> PerformanceTier {
        self.inner.state.borrow().tier
    }

    /// Latest interval evaluation
    pub fn metrics(&self) -> PerformanceMetrics {
        self.inner.state.borrow().latest
    }

    /// Recent evaluations, oldest first
    pub fn history(&self) -> Vec<PerformanceMetrics> {
        self.inner.state.borrow().history.iter().copied().collect()
    }

    /// Feed one frame sample
    ///
    /// Zero deltas (the first tick after the clock starts) are not sampled.
    /// Returns the new tier when this sample closed an interval that changed
    /// it.
    pub fn record_frame(&self, timestamp: f64, delta: f64) -> Option<PerformanceTier> {
        let transition = {
            let mut state = self.inner.state.borrow_mut();
            if delta > 0.0 {
                state.window.push(delta);
            }

            let last = *state.last_evaluation.get_or_insert(timestamp);
            if timestamp - last < state.interval_ms {
                return None;
            }
            state.last_evaluation = Some(timestamp);
            if state.window.is_empty() {
                return None;
            }

            let memory_usage_mb = self
                .inner
                .heap_probe
                .borrow()
                .as_ref()
                .and_then(|probe| probe())
                .unwrap_or(0.0);
            let metrics = evaluate(&state.window, memory_usage_mb, timestamp);

            if state.history.len() == HISTORY_LEN {
                state.history.pop_front();
            }
            state.history.push_back(metrics);
            state.latest = metrics;

            let tier = PerformanceTier::classify(metrics.fps, metrics.dropped_frames);
            let previous = state.tier;
            if tier == previous {
                return None;
            }
            state.tier = tier;
            tracing::info!(
                target: "adaptive_effects::monitor",
                tier = %tier,
                previous = %previous,
                fps = metrics.fps,
                dropped = metrics.dropped_frames,
                "Performance tier changed"
            );
            (tier, previous)
        };

        self.notify(transition.0, transition.1);
        Some(transition.0)
    }

    fn notify(&self, tier: PerformanceTier, previous: PerformanceTier) {
        // Taken out so the listener may call back into the monitor.
        let listener = self.inner.listener.borrow_mut().take();
        let Some(mut listener) = listener else {
            return;
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(tier, previous))) {
            tracing::error!(
                target: "adaptive_effects::monitor",
                panic = %panic_message(payload.as_ref()),
                "Tier listener panicked"
            );
        }

        let mut slot = self.inner.listener.borrow_mut();
        if slot.is_none() {
            *slot = Some(listener);
        }
    }
}

fn evaluate(window: &FrameWindow, memory_usage_mb: f64, timestamp: f64) -> PerformanceMetrics {
    let frame_stats = window.stats();
    let fps = if frame_stats.avg_ms > 0.0 { 1000.0 / frame_stats.avg_ms } else { 0.0 };
    PerformanceMetrics {
        fps,
        avg_frame_time_ms: frame_stats.avg_ms,
        dropped_frames: window.count_above(DROPPED_FRAME_THRESHOLD_MS),
        memory_usage_mb,
        timestamp_ms: timestamp,
        frame_stats,
    }
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("tier", &self.tier())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualFrameHost;
    use std::cell::Cell;

    /// Feed `frames` samples of `frame_ms` starting at `start`, returning the end time
    fn feed(monitor: &PerformanceMonitor, start: f64, frames: usize, frame_ms: f64) -> f64 {
        let mut ts = start;
        for _ in 0..frames {
            ts += frame_ms;
            monitor.record_frame(ts, frame_ms);
        }
        ts
    }

    #[test]
    fn test_initial_tier_is_excellent() {
        let monitor = PerformanceMonitor::default();
        assert_eq!(monitor.tier(), PerformanceTier::Excellent);
        assert!(monitor.history().is_empty());
    }

    #[test]
    fn test_steady_60fps_stays_excellent() {
        let monitor = PerformanceMonitor::default();
        let changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&changes);
        monitor.set_tier_listener(move |_, _| counter.set(counter.get() + 1));

        monitor.record_frame(0.0, 0.0);
        feed(&monitor, 0.0, 120, 16.0);

        assert_eq!(monitor.tier(), PerformanceTier::Excellent);
        assert_eq!(changes.get(), 0);
        assert_eq!(monitor.history().len(), 1);
        assert!((monitor.metrics().fps - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_slow_frames_report_fair_once() {
        let monitor = PerformanceMonitor::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        monitor.set_tier_listener(move |tier, previous| sink.borrow_mut().push((tier, previous)));

        monitor.record_frame(0.0, 0.0);
        // 1000 / 23.8 ~= 42 fps
        let end = feed(&monitor, 0.0, 90, 23.8);
        feed(&monitor, end, 90, 23.8);

        assert_eq!(
            *seen.borrow(),
            vec![(PerformanceTier::Fair, PerformanceTier::Excellent)]
        );
        let metrics = monitor.metrics();
        assert_eq!(metrics.dropped_frames, 60);
        assert!(metrics.fps > 40.0 && metrics.fps < 43.0);
    }

    #[test]
    fn test_window_is_bounded() {
        let monitor = PerformanceMonitor::new(1000.0, 60);
        monitor.record_frame(0.0, 0.0);
        feed(&monitor, 0.0, 200, 16.0);
        assert_eq!(monitor.metrics().frame_stats.sample_count, 60);
    }

    #[test]
    fn test_heap_probe_feeds_memory() {
        let monitor = PerformanceMonitor::default();
        monitor.record_frame(0.0, 0.0);
        feed(&monitor, 0.0, 70, 16.0);
        assert_eq!(monitor.metrics().memory_usage_mb, 0.0);

        monitor.set_heap_probe(|| Some(128.0));
        feed(&monitor, 1120.0, 70, 16.0);
        assert_eq!(monitor.metrics().memory_usage_mb, 128.0);
    }

    #[test]
    fn test_history_is_capped() {
        let monitor = PerformanceMonitor::new(10.0, 60);
        monitor.record_frame(0.0, 0.0);
        feed(&monitor, 0.0, 700, 16.0);
        assert_eq!(monitor.history().len(), HISTORY_LEN);
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let monitor = PerformanceMonitor::new(100.0, 60);
        monitor.set_tier_listener(|_, _| panic!("listener bug"));
        monitor.record_frame(0.0, 0.0);
        feed(&monitor, 0.0, 20, 30.0);
        assert_eq!(monitor.tier(), PerformanceTier::Poor);
    }

    #[test]
    fn test_start_stop_are_idempotent() {
        let host = ManualFrameHost::new();
        let scheduler = FrameScheduler::new(Box::new(host.clone()), 16.0);
        let monitor = PerformanceMonitor::default();

        monitor.start(&scheduler);
        monitor.start(&scheduler);
        assert!(monitor.is_running());
        assert_eq!(scheduler.metrics().total_callbacks, 1);
        assert_eq!(host.request_count(), 1);

        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_running());
        assert!(!host.is_running());
    }

    #[test]
    fn test_samples_through_scheduler() {
        let host = ManualFrameHost::new();
        let scheduler = FrameScheduler::new(Box::new(host), 16.0);
        let monitor = PerformanceMonitor::default();
        monitor.start(&scheduler);

        let mut ts = 0.0;
        for _ in 0..100 {
            scheduler.tick(ts);
            ts += 30.0;
        }
        assert_eq!(monitor.tier(), PerformanceTier::Poor);
    }
}
