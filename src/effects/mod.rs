//! Effects system
//!
//! A registry of pluggable visual effects that adapts to the device and to
//! live performance:
//!
//! - **Types** (`types.rs`): effect descriptors, priority classes, targets
//! - **Traits** (`traits.rs`): the `Effect` lifecycle and the `Technique`
//!   trait wrapped by `EffectCore`
//! - **Manager** (`manager.rs`): registry, user controls, presets,
//!   persistence and the performance degradation ladder
//! - **Events** (`events.rs`): per-kind listeners for manager changes
//! - **Builtin** (`builtin/`): depth of field, exposure, color grading, edge
//!   framing, motion blur, chromatic aberration
//!
//! # Usage
//!
//! ```ignore
//! let mut manager = EffectsManager::new(Box::new(MemoryStore::new()), DEFAULT_STORAGE_KEY);
//! builtin::register_builtin_effects(&mut manager, &stage, &scheduler);
//!
//! manager.set_effect_intensity("depth-of-field", 40);
//! manager.apply_preset(Preset::Minimal);
//! manager.update_performance_tier(PerformanceTier::Fair);
//! ```

pub mod builtin;
pub mod events;
pub mod manager;
pub mod traits;
pub mod types;

pub use events::{EffectsEvent, EventBus, EventKind, ListenerId};
pub use manager::{EffectsManager, EffectsManagerState};
pub use traits::{intensity_fraction, scale_opacity, scale_value, Effect, EffectContext, EffectCore, Technique};
pub use types::{ApplyTarget, EffectConfig, EffectDefaults, EffectPriority};
