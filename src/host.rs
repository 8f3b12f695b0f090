//! Host animation clock
//!
//! The scheduler owns exactly one subscription to the host's display-refresh
//! facility. A [`FrameHost`] is told when frames are wanted and when they are
//! not; while frames are requested the host calls
//! [`FrameScheduler::tick`](crate::scheduler::FrameScheduler::tick) once per
//! display refresh.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Host display-refresh facility
pub trait FrameHost {
    /// Start delivering ticks (subscribe to the refresh clock)
    fn request_frames(&mut self);

    /// Stop delivering ticks
    fn cancel_frames(&mut self);

    /// Monotonic wall time in milliseconds, used to measure per-tick work
    fn now_ms(&self) -> f64;
}

/// Frame host backed by the process monotonic clock
///
/// Used by native hosts that pace their own loop: the loop polls
/// [`is_running`](Self::is_running) (or the scheduler's clock state) and ticks
/// at the display rate.
#[derive(Debug)]
pub struct SystemFrameHost {
    origin: Instant,
    running: bool,
}

impl Default for SystemFrameHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemFrameHost {
    /// Create a host whose clock starts at zero now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            running: false,
        }
    }

    /// Whether frames are currently requested
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl FrameHost for SystemFrameHost {
    fn request_frames(&mut self) {
        self.running = true;
    }

    fn cancel_frames(&mut self) {
        self.running = false;
    }

    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Default)]
struct ManualClock {
    now: Cell<f64>,
    running: Cell<bool>,
    requests: Cell<u32>,
    cancels: Cell<u32>,
}

/// Scripted frame host for deterministic replay
///
/// Clones share the same clock, so a test can keep one handle while the
/// scheduler owns another and advance time from inside frame callbacks to
/// simulate expensive work.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameHost {
    clock: Rc<ManualClock>,
}

impl ManualFrameHost {
    /// Create a stopped host at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `ms` milliseconds
    pub fn advance(&self, ms: f64) {
        self.clock.now.set(self.clock.now.get() + ms);
    }

    /// Set the clock to an absolute time
    pub fn set_now(&self, ms: f64) {
        self.clock.now.set(ms);
    }

    /// Current clock value
    pub fn now(&self) -> f64 {
        self.clock.now.get()
    }

    /// Whether frames are currently requested
    pub fn is_running(&self) -> bool {
        self.clock.running.get()
    }

    /// How many times frames were requested
    pub fn request_count(&self) -> u32 {
        self.clock.requests.get()
    }

    /// How many times frames were cancelled
    pub fn cancel_count(&self) -> u32 {
        self.clock.cancels.get()
    }
}

impl FrameHost for ManualFrameHost {
    fn request_frames(&mut self) {
        self.clock.running.set(true);
        self.clock.requests.set(self.clock.requests.get() + 1);
    }

    fn cancel_frames(&mut self) {
        self.clock.running.set(false);
        self.clock.cancels.set(self.clock.cancels.get() + 1);
    }

    fn now_ms(&self) -> f64 {
        self.clock.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_host_shares_clock() {
        let host = ManualFrameHost::new();
        let mut owned = host.clone();

        owned.request_frames();
        host.advance(12.5);

        assert!(host.is_running());
        assert_eq!(owned.now_ms(), 12.5);
        assert_eq!(host.request_count(), 1);

        owned.cancel_frames();
        assert!(!host.is_running());
        assert_eq!(host.cancel_count(), 1);
    }

    #[test]
    fn test_system_host_is_monotonic() {
        let mut host = SystemFrameHost::new();
        assert!(!host.is_running());
        host.request_frames();
        assert!(host.is_running());

        let a = host.now_ms();
        let b = host.now_ms();
        assert!(b >= a);
    }
}
