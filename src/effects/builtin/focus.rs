//! Focus-driven painting shared by effects that style sections relative to
//! the focused one
//!
//! While painting, a focus change repaints every section immediately instead
//! of waiting for the next lifecycle call.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::effects::traits::EffectContext;
use crate::effects::types::ApplyTarget;
use crate::surface::{RenderSurface, SectionId, StyleTarget, WatchId};

/// Styles `sections` given the focused section and the intensity fraction
pub(crate) type Painter = fn(&dyn RenderSurface, &str, f64, &[SectionId], Option<&str>);

struct FocusState {
    effect_id: String,
    fraction: Cell<f64>,
    painting: Cell<bool>,
}

pub(crate) struct FocusBinding {
    painter: Painter,
    state: Rc<FocusState>,
    watch: Option<WatchId>,
}

impl FocusBinding {
    pub(crate) fn new(effect_id: &str, painter: Painter) -> Self {
        Self {
            painter,
            state: Rc::new(FocusState {
                effect_id: effect_id.to_string(),
                fraction: Cell::new(0.0),
                painting: Cell::new(false),
            }),
            watch: None,
        }
    }

    /// Paint `target` for the current focus
    pub(crate) fn paint(&self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        self.state.fraction.set(ctx.fraction());
        if target.includes_root() {
            self.state.painting.set(true);
        }
        let focused = ctx.stage.focus.focused_section();
        (self.painter)(
            ctx.stage.surface.as_ref(),
            ctx.id,
            ctx.fraction(),
            &target.sections(ctx.stage),
            focused.as_deref(),
        );
    }

    /// Clear `target`; clearing everything also stops focus repaints
    pub(crate) fn clear(&self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        if target.includes_root() {
            self.state.painting.set(false);
        }
        for style_target in target.section_targets(ctx.stage) {
            ctx.stage.surface.clear_style(&style_target, ctx.id);
        }
    }

    /// Start repainting on focus changes
    pub(crate) fn watch(&mut self, ctx: &EffectContext<'_>) {
        if self.watch.is_some() {
            return;
        }
        let state = Rc::clone(&self.state);
        let surface: Weak<dyn RenderSurface> = Rc::downgrade(&ctx.stage.surface);
        let painter = self.painter;

        let id = ctx.stage.focus.watch_focus(Rc::new(move |focused: Option<SectionId>| {
            if !state.painting.get() {
                return;
            }
            let Some(surface) = surface.upgrade() else {
                return;
            };
            let sections = surface.sections();
            painter(
                surface.as_ref(),
                &state.effect_id,
                state.fraction.get(),
                &sections,
                focused.as_deref(),
            );
        }));
        self.watch = Some(id);
    }

    pub(crate) fn unwatch(&mut self, ctx: &EffectContext<'_>) {
        if let Some(id) = self.watch.take() {
            ctx.stage.focus.unwatch_focus(id);
        }
    }
}

/// Write `style` for focused/unfocused sections, clearing when `None`
pub(crate) fn style_sections<F>(surface: &dyn RenderSurface, effect_id: &str, sections: &[SectionId], mut style_for: F)
where
    F: FnMut(&str) -> Option<crate::surface::SurfaceStyle>,
{
    for section in sections {
        let target = StyleTarget::Section(section.clone());
        match style_for(section) {
            Some(style) => surface.set_style(&target, effect_id, style),
            None => surface.clear_style(&target, effect_id),
        }
    }
}
