//! Exposure
//!
//! Lifts the focused section and dims the rest, like metering a scene for
//! its subject.

use super::focus::{style_sections, FocusBinding};
use crate::effects::traits::{Effect, EffectContext, EffectCore, Technique};
use crate::effects::types::{ApplyTarget, EffectConfig, EffectPriority};
use crate::surface::{FilterOp, RenderSurface, SectionId, Stage, SurfaceStyle};

pub const ID: &str = "exposure";

const FOCUS_BRIGHTNESS: f64 = 0.15;
const FOCUS_CONTRAST: f64 = 0.10;
const BACKGROUND_DIM: f64 = 0.10;

pub fn config() -> EffectConfig {
    EffectConfig::new(ID, "Exposure")
        .description("Brightens the focused section and dims the others")
        .priority(EffectPriority::Standard)
        .enabled(true)
        .intensity(60)
        .cost_ms(0.4)
        .shortcut('e')
        .rationale("Lighting cue for the current subject")
}

pub fn create(stage: Stage) -> Box<dyn Effect> {
    Box::new(EffectCore::new(config(), Exposure::new(), stage))
}

pub struct Exposure {
    focus: FocusBinding,
}

impl Exposure {
    pub fn new() -> Self {
        Self {
            focus: FocusBinding::new(ID, paint),
        }
    }
}

impl Default for Exposure {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(surface: &dyn RenderSurface, effect_id: &str, fraction: f64, sections: &[SectionId], focused: Option<&str>) {
    style_sections(surface, effect_id, sections, |section| match focused {
        None => None,
        Some(focused) if focused == section => Some(SurfaceStyle::Filter(vec![
            FilterOp::Brightness(1.0 + FOCUS_BRIGHTNESS * fraction),
            FilterOp::Contrast(1.0 + FOCUS_CONTRAST * fraction),
        ])),
        Some(_) => Some(SurfaceStyle::Filter(vec![FilterOp::Brightness(1.0 - BACKGROUND_DIM * fraction)])),
    });
}

impl Technique for Exposure {
    fn apply(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        self.focus.paint(ctx, target);
    }

    fn remove(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        self.focus.clear(ctx, target);
    }

    fn on_enable(&mut self, ctx: &EffectContext<'_>) {
        self.focus.watch(ctx);
    }

    fn on_disable(&mut self, ctx: &EffectContext<'_>) {
        self.focus.unwatch(ctx);
    }

    fn on_cleanup(&mut self, ctx: &EffectContext<'_>) {
        self.focus.unwatch(ctx);
    }
}
