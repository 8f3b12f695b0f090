//! Performance metrics and frame timing
//!
//! Rolling frame-duration statistics and the discrete performance tiers the
//! effects manager reacts to.

use serde::Serialize;
use std::collections::VecDeque;

/// Frame durations above this count as dropped (one 60 Hz refresh)
pub const DROPPED_FRAME_THRESHOLD_MS: f64 = 1000.0 / 60.0;

/// Default rolling window size
pub const DEFAULT_SAMPLE_WINDOW: usize = 60;

/// Frame timing statistics over the current window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameStats {
    /// Average frame time in milliseconds
    pub avg_ms: f64,
    /// Minimum frame time in milliseconds
    pub min_ms: f64,
    /// Maximum frame time in milliseconds
    pub max_ms: f64,
    /// 50th percentile (median) frame time
    pub p50_ms: f64,
    /// 95th percentile frame time
    pub p95_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Discrete performance classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceTier {
    /// Classify from FPS and dropped-frame count; first match wins
    pub fn classify(fps: f64, dropped_frames: usize) -> Self {
        if fps >= 58.0 && dropped_frames < 3 {
            Self::Excellent
        } else if fps >= 50.0 && dropped_frames < 10 {
            Self::Good
        } else if fps >= 40.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Whether effects should be shed at this tier
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::Fair | Self::Poor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl std::fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One interval evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Frames per second derived from the mean frame duration
    pub fps: f64,
    /// Mean frame duration in milliseconds
    pub avg_frame_time_ms: f64,
    /// Samples in the window above [`DROPPED_FRAME_THRESHOLD_MS`]
    pub dropped_frames: usize,
    /// Host heap usage, 0 when the host cannot report it
    pub memory_usage_mb: f64,
    /// Tick timestamp of the evaluation
    pub timestamp_ms: f64,
    /// Distribution of the window
    pub frame_stats: FrameStats,
}

/// Fixed-capacity FIFO of frame durations
#[derive(Debug, Clone)]
pub struct FrameWindow {
    frame_times: VecDeque<f64>,
    max_samples: usize,
}

impl Default for FrameWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

impl FrameWindow {
    /// Create a window holding at most `max_samples` durations
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Append a duration, evicting the oldest when full
    pub fn push(&mut self, duration_ms: f64) {
        self.frame_times.push_back(duration_ms);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.frame_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_times.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_samples
    }

    pub fn clear(&mut self) {
        self.frame_times.clear();
    }

    /// Samples strictly above `threshold_ms`
    pub fn count_above(&self, threshold_ms: f64) -> usize {
        self.frame_times.iter().filter(|&&t| t > threshold_ms).count()
    }

    /// FPS from the mean duration, 0 when empty
    pub fn fps(&self) -> f64 {
        let stats = self.stats();
        if stats.avg_ms > 0.0 {
            1000.0 / stats.avg_ms
        } else {
            0.0
        }
    }

    /// Distribution of the current samples
    pub fn stats(&self) -> FrameStats {
        if self.frame_times.is_empty() {
            return FrameStats::default();
        }

        let mut times: Vec<f64> = self.frame_times.iter().copied().collect();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sum: f64 = times.iter().sum();
        let count = times.len() as f64;

        FrameStats {
            avg_ms: sum / count,
            min_ms: times.first().copied().unwrap_or(0.0),
            max_ms: times.last().copied().unwrap_or(0.0),
            p50_ms: percentile(&times, 0.50),
            p95_ms: percentile(&times, 0.95),
            sample_count: times.len(),
        }
    }
}

/// Calculate percentile from sorted array
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}
