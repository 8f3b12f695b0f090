//! Adaptive Effects
//!
//! Client-side coordination for continuously animated visual effects. One
//! frame scheduler multiplexes every per-frame callback onto the host clock
//! inside a fixed budget; a device detector and a performance monitor decide
//! how much visual work the device can afford; the effects manager enables,
//! disables and rescales effects accordingly and remembers what the user
//! chose.

pub mod app;
pub mod device;
pub mod effects;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod settings;
pub mod surface;
pub mod telemetry;

pub use app::EffectsRuntime;
pub use device::{DeviceCapabilities, DeviceCapabilityDetector, DeviceProbe, DeviceTier, RecommendedSettings, StaticProbe, SystemProbe};
pub use effects::{Effect, EffectConfig, EffectPriority, EffectsEvent, EffectsManager, EventKind};
pub use error::CallbackError;
pub use host::{FrameHost, ManualFrameHost, SystemFrameHost};
pub use scheduler::{FramePriority, FrameScheduler, SchedulerMetrics, Subscription};
pub use settings::{EffectsPreferences, FileStore, MemoryStore, PreferenceStore, Preset, RuntimeSettings, StoreError};
pub use surface::{MemorySurface, RenderSurface, Stage, SurfaceStyle};
pub use telemetry::{PerformanceMetrics, PerformanceMonitor, PerformanceTier};
