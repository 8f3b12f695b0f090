//! Depth of field
//!
//! Blurs and slightly darkens every section except the focused one, pulling
//! attention to where the visitor is looking.

use super::focus::{style_sections, FocusBinding};
use crate::effects::traits::{Effect, EffectContext, EffectCore, Technique};
use crate::effects::types::{ApplyTarget, EffectConfig, EffectPriority};
use crate::surface::{FilterOp, RenderSurface, SectionId, Stage, SurfaceStyle};

pub const ID: &str = "depth-of-field";

/// Blur radius at full intensity, px
const MAX_BLUR_PX: f64 = 6.0;
/// Brightness reduction at full intensity
const MAX_DIM: f64 = 0.15;

pub fn config() -> EffectConfig {
    EffectConfig::new(ID, "Depth of Field")
        .description("Blurs content outside the focused section")
        .priority(EffectPriority::Standard)
        .enabled(true)
        .intensity(70)
        .cost_ms(2.5)
        .shortcut('d')
        .rationale("Guides attention to the section in focus")
}

pub fn create(stage: Stage) -> Box<dyn Effect> {
    Box::new(EffectCore::new(config(), DepthOfField::new(), stage))
}

pub struct DepthOfField {
    focus: FocusBinding,
}

impl DepthOfField {
    pub fn new() -> Self {
        Self {
            focus: FocusBinding::new(ID, paint),
        }
    }
}

impl Default for DepthOfField {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(surface: &dyn RenderSurface, effect_id: &str, fraction: f64, sections: &[SectionId], focused: Option<&str>) {
    style_sections(surface, effect_id, sections, |section| match focused {
        // Nothing to blur against without a focus
        None => None,
        Some(focused) if focused == section => None,
        Some(_) => Some(SurfaceStyle::Filter(vec![
            FilterOp::Blur(MAX_BLUR_PX * fraction),
            FilterOp::Brightness(1.0 - MAX_DIM * fraction),
        ])),
    });
}

impl Technique for DepthOfField {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{FocusedSectionProvider, MemorySurface, StyleTarget};
    use std::rc::Rc;

    fn section(id: &str) -> StyleTarget {
        StyleTarget::Section(id.into())
    }

    #[test]
    fn test_blurs_unfocused_sections() {
        let surface = Rc::new(MemorySurface::new(["hero", "work", "contact"]));
        surface.set_focused(Some("work"));
        let mut effect = create(Stage::from_memory(&surface));
        effect.set_intensity(50);
        effect.enable();

        assert_eq!(surface.style(&section("work"), ID), None);
        let Some(SurfaceStyle::Filter(ops)) = surface.style(&section("hero"), ID) else {
            panic!("expected a filter on an unfocused section");
        };
        assert_eq!(ops[0], FilterOp::Blur(3.0));
        let FilterOp::Brightness(brightness) = ops[1] else {
            panic!("expected brightness");
        };
        assert!((brightness - 0.925).abs() < 1e-9);
        assert_eq!(surface.styled_count(ID), 2);
    }

    #[test]
    fn test_follows_focus_until_disabled() {
        let surface = Rc::new(MemorySurface::new(["hero", "work"]));
        let mut effect = create(Stage::from_memory(&surface));
        effect.enable();
        assert_eq!(surface.styled_count(ID), 0);

        surface.set_focused(Some("hero"));
        assert!(surface.style(&section("work"), ID).is_some());
        assert!(surface.style(&section("hero"), ID).is_none());

        effect.disable();
        assert_eq!(surface.watcher_count(), 0);
        surface.set_focused(Some("work"));
        assert_eq!(surface.styled_count(ID), 0);
    }

    #[test]
    fn test_removed_effect_ignores_focus_changes() {
        let surface = Rc::new(MemorySurface::new(["hero", "work"]));
        let mut effect = create(Stage::from_memory(&surface));
        effect.enable();
        effect.remove(&ApplyTarget::All);

        surface.set_focused(Some("hero"));
        assert_eq!(surface.styled_count(ID), 0);
        assert_eq!(surface.focused_section().as_deref(), Some("hero"));
    }
}
