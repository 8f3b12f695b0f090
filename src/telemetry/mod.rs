//! Telemetry and logging infrastructure
//!
//! Structured logging with tracing, rolling frame statistics and the
//! performance monitor that classifies them into tiers.

pub mod logging;
pub mod metrics;
pub mod monitor;

pub use logging::{init_logging, LogConfig};
pub use metrics::{FrameStats, FrameWindow, PerformanceMetrics, PerformanceTier};
pub use monitor::PerformanceMonitor;
