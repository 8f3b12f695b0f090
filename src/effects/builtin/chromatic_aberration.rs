//! Chromatic aberration
//!
//! Splits color channels on the focused section.

use super::focus::{style_sections, FocusBinding};
use crate::effects::traits::{scale_opacity, Effect, EffectContext, EffectCore, Technique};
use crate::effects::types::{ApplyTarget, EffectConfig, EffectPriority};
use crate::surface::{RenderSurface, SectionId, Stage, SurfaceStyle};

pub const ID: &str = "chromatic-aberration";

const MAX_OFFSET_PX: f64 = 3.0;
const BASE_OPACITY: f64 = 0.6;

pub fn config() -> EffectConfig {
    EffectConfig::new(ID, "Chromatic Aberration")
        .description("Lens-style color fringing on the focused section")
        .priority(EffectPriority::Luxury)
        .enabled(false)
        .intensity(40)
        .cost_ms(1.5)
        .shortcut('c')
        .rationale("Photographic texture for capable devices")
}

pub fn create(stage: Stage) -> Box<dyn Effect> {
    Box::new(EffectCore::new(config(), ChromaticAberration::new(), stage))
}

pub struct ChromaticAberration {
    focus: FocusBinding,
}

impl ChromaticAberration {
    pub fn new() -> Self {
        Self {
            focus: FocusBinding::new(ID, paint),
        }
    }
}

impl Default for ChromaticAberration {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(surface: &dyn RenderSurface, effect_id: &str, fraction: f64, sections: &[SectionId], focused: Option<&str>) {
    let intensity = (fraction * 100.0).round() as u8;
    style_sections(surface, effect_id, sections, |section| {
        (focused == Some(section)).then(|| SurfaceStyle::ChannelSplit {
            offset_px: MAX_OFFSET_PX * fraction,
            opacity: scale_opacity(BASE_OPACITY, intensity),
        })
    });
}

impl Technique for ChromaticAberration {
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
