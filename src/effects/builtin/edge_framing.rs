//! Edge framing
//!
//! A vignette over the viewport edges.

use crate::effects::traits::{Effect, EffectContext, EffectCore, Technique};
use crate::effects::types::{ApplyTarget, EffectConfig, EffectPriority};
use crate::surface::{Stage, StyleTarget, SurfaceStyle};

pub const ID: &str = "edge-framing";

const BASE_OPACITY: f64 = 0.5;
/// Spread as a percentage of the viewport at zero and full intensity
const MIN_SPREAD: f64 = 20.0;
const SPREAD_RANGE: f64 = 20.0;

pub fn config() -> EffectConfig {
    EffectConfig::new(ID, "Edge Framing")
        .description("Vignette that frames the viewport")
        .priority(EffectPriority::Luxury)
        .enabled(true)
        .intensity(60)
        .cost_ms(0.3)
        .shortcut('v')
        .rationale("Cinematic framing; purely decorative")
}

pub fn create(stage: Stage) -> Box<dyn Effect> {
    Box::new(EffectCore::new(config(), EdgeFraming, stage))
}

pub struct EdgeFraming;

impl Technique for EdgeFraming {
    fn apply(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        if !target.includes_root() {
            return;
        }
        ctx.stage.surface.set_style(
            &StyleTarget::Root,
            ctx.id,
            SurfaceStyle::Vignette {
                opacity: ctx.scale_opacity(BASE_OPACITY),
                spread: MIN_SPREAD + ctx.scale(SPREAD_RANGE),
            },
        );
    }

    fn remove(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        if target.includes_root() {
            ctx.stage.surface.clear_style(&StyleTarget::Root, ctx.id);
        }
    }
}
