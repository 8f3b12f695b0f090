//! Motion blur
//!
//! Blurs the viewport in proportion to scroll speed. Unlike the other
//! effects it needs per-frame work, so it owns a low-priority scheduler
//! callback for as long as it is enabled and pauses that callback while
//! removed.

use std::cell::Cell;
use std::rc::Rc;

use crate::effects::traits::{Effect, EffectContext, EffectCore, Technique};
use crate::effects::types::{ApplyTarget, EffectConfig, EffectPriority};
use crate::scheduler::{FramePriority, FrameScheduler, Subscription};
use crate::surface::{FilterOp, Stage, StyleTarget, SurfaceStyle};

pub const ID: &str = "motion-blur";

/// Scheduler id of the per-frame callback
pub const CALLBACK_ID: &str = "effect:motion-blur";

/// Blur px per (px/ms) of scroll velocity
const BLUR_PER_VELOCITY: f64 = 2.0;
const MAX_BLUR_PX: f64 = 8.0;
/// Below this the style is cleared rather than written
const MIN_VISIBLE_BLUR_PX: f64 = 0.05;

pub fn config() -> EffectConfig {
    EffectConfig::new(ID, "Motion Blur")
        .description("Blurs the page while scrolling fast")
        .priority(EffectPriority::Luxury)
        .enabled(false)
        .intensity(50)
        .cost_ms(3.0)
        .shortcut('m')
        .rationale("Smooths fast scrolling on high refresh displays")
        .motion_sensitive(true)
}

pub fn create(stage: Stage, scheduler: FrameScheduler) -> Box<dyn Effect> {
    Box::new(EffectCore::new(config(), MotionBlur::new(scheduler), stage))
}

/// Blur radius for a scroll velocity at an intensity fraction
pub fn blur_for_velocity(velocity: f64, fraction: f64) -> f64 {
    (velocity.abs() * BLUR_PER_VELOCITY).min(MAX_BLUR_PX) * fraction
}

pub struct MotionBlur {
    scheduler: FrameScheduler,
    fraction: Rc<Cell<f64>>,
    subscription: Option<Subscription>,
}

impl MotionBlur {
    pub fn new(scheduler: FrameScheduler) -> Self {
        Self {
            scheduler,
            fraction: Rc::new(Cell::new(0.0)),
            subscription: None,
        }
    }

    fn unsubscribe(&mut self, ctx: &EffectContext<'_>) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        ctx.stage.surface.clear_style(&StyleTarget::Root, ctx.id);
    }
}

impl Technique for MotionBlur {
    fn apply(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        self.fraction.set(ctx.fraction());
        if target.includes_root() {
            self.scheduler.set_enabled(CALLBACK_ID, true);
        }
    }

    fn remove(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget) {
        if target.includes_root() {
            self.scheduler.set_enabled(CALLBACK_ID, false);
            ctx.stage.surface.clear_style(&StyleTarget::Root, ctx.id);
        }
    }

    fn on_enable(&mut self, ctx: &EffectContext<'_>) {
        if self.subscription.is_some() {
            return;
        }
        let fraction = Rc::clone(&self.fraction);
        let surface = Rc::clone(&ctx.stage.surface);
        let motion = Rc::clone(&ctx.stage.motion);
        let effect_id = ctx.id.to_string();

        let subscription = self.scheduler.subscribe(CALLBACK_ID, FramePriority::Low, move |_, _| {
            let blur = blur_for_velocity(motion.scroll_velocity(), fraction.get());
            if blur < MIN_VISIBLE_BLUR_PX {
                surface.clear_style(&StyleTarget::Root, &effect_id);
            } else {
                surface.set_style(
                    &StyleTarget::Root,
                    &effect_id,
                    SurfaceStyle::Filter(vec![FilterOp::Blur(blur)]),
                );
            }
            Ok(())
        });
        self.subscription = Some(subscription);
    }

    fn on_disable(&mut self, ctx: &EffectContext<'_>) {
        self.unsubscribe(ctx);
    }

    fn on_cleanup(&mut self, ctx: &EffectContext<'_>) {
        self.unsubscribe(ctx);
    }
}
