//! Built-in effects
//!
//! The six effects that ship with the crate. Focus-driven effects share
//! [`focus::FocusBinding`]; motion blur is the only one with per-frame work.

pub mod chromatic_aberration;
pub mod color_grading;
pub mod depth_of_field;
pub mod edge_framing;
pub mod exposure;
mod focus;
pub mod motion_blur;

pub use chromatic_aberration::ChromaticAberration;
pub use color_grading::ColorGrading;
pub use depth_of_field::DepthOfField;
pub use edge_framing::EdgeFraming;
pub use exposure::Exposure;
pub use motion_blur::MotionBlur;

use super::EffectsManager;
use crate::scheduler::FrameScheduler;
use crate::surface::Stage;

/// Register all built-in effects with the manager
///
/// Ids that are already registered are skipped.
pub fn register_builtin_effects(manager: &mut EffectsManager, stage: &Stage, scheduler: &FrameScheduler) {
    let effects = [
        depth_of_field::create(stage.clone()),
        exposure::create(stage.clone()),
        color_grading::create(stage.clone()),
        edge_framing::create(stage.clone()),
        motion_blur::create(stage.clone(), scheduler.clone()),
        chromatic_aberration::create(stage.clone()),
    ];
    for effect in effects {
        if let Err(rejected) = manager.register_effect(effect) {
            tracing::debug!(
                target: "adaptive_effects::effects",
                id = %rejected.config().id,
                "Built-in effect already registered; skipped"
            );
        }
    }
}
