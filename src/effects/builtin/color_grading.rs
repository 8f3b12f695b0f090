//! Color grading
//!
//! A static warm grade over every section.

use crate::effects::traits::{Effect, EffectContext, EffectCore, Technique};
use crate::effects::types::{ApplyTarget, EffectConfig, EffectPriority};
use crate::surface::{FilterOp, Stage, SurfaceStyle};

pub const ID: &str = "color-grading";

pub fn config() -> EffectConfig {
    EffectConfig::new(ID, "Color Grading")
        .description("Warm, slightly saturated grade across the page")
        .priority(EffectPriority::Standard)
        .enabled(true)
        .intensity(50)
        .cost_ms(0.6)
        .shortcut('g')
        .rationale("Gives the portfolio a consistent look")
}

pub fn create(stage: Stage) -> Box<dyn Effect> {
    Box::new(EffectCore::new(config(), ColorGrading, stage))
}

pub struct ColorGrading;

impl ColorGrading {
    fn style(ctx: &EffectContext<'_>) -> SurfaceStyle {
        SurfaceStyle::Filter(vec![
            FilterOp::Saturate(1.0 + ctx.scale(0.2)),
            FilterOp::Sepia(ctx.scale(0.15)),
            FilterOp::HueRotate(ctx.scale(-8.0)),
        ])
    }
}

impl Technique for ColorGrading {
    fn apply(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        let style = Self::style(ctx);
        for style_target in target.section_targets(ctx.stage) {
            ctx.stage.surface.set_style(&style_target, ctx.id, style.clone());
        }
    }

    fn remove(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        for style_target in target.section_targets(ctx.stage) {
            ctx.stage.surface.clear_style(&style_target, ctx.id);
        }
    }
}
