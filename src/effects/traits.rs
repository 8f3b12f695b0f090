//! Effect traits
//!
//! - `Effect`: object-safe lifecycle the manager drives
//! - `Technique`: the visual half of an effect (apply/remove plus hooks)
//! - `EffectCore`: wraps a technique and enforces the lifecycle guarantees,
//!   so techniques never see a redundant enable or a call after cleanup

use super::types::{ApplyTarget, EffectConfig, EffectDefaults};
use crate::surface::Stage;

/// Intensity as a 0..=1 fraction
pub fn intensity_fraction(intensity: u8) -> f64 {
    f64::from(intensity.min(100)) / 100.0
}

/// Linear scale of `base` by intensity
pub fn scale_value(base: f64, intensity: u8) -> f64 {
    base * intensity_fraction(intensity)
}

/// Opacity scaled by intensity, kept in 0..=1
pub fn scale_opacity(base: f64, intensity: u8) -> f64 {
    scale_value(base, intensity).clamp(0.0, 1.0)
}

/// What a technique sees during a lifecycle call
pub struct EffectContext<'a> {
    /// Effect id, used as the style key on the surface
    pub id: &'a str,
    pub intensity: u8,
    pub stage: &'a Stage,
}

impl EffectContext<'_> {
    pub fn fraction(&self) -> f64 {
        intensity_fraction(self.intensity)
    }

    pub fn scale(&self, base: f64) -> f64 {
        scale_value(base, self.intensity)
    }

    pub fn scale_opacity(&self, base: f64) -> f64 {
        scale_opacity(base, self.intensity)
    }
}

/// Technique-specific rendering
///
/// `apply` must overwrite whatever the technique previously wrote for the
/// target; it is called again on every intensity change and on resume.
pub trait Technique {
    fn apply(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget);

    fn remove(&mut self, ctx: &EffectContext<'_>, target: &ApplyTarget);

    /// After the first apply of an enable transition
    fn on_enable(&mut self, _ctx: &EffectContext<'_>) {}

    /// After the remove of a disable transition
    fn on_disable(&mut self, _ctx: &EffectContext<'_>) {}

    fn on_intensity_change(&mut self, _ctx: &EffectContext<'_>, _previous: u8) {}

    /// Release anything acquired outside enable/disable
    fn on_cleanup(&mut self, _ctx: &EffectContext<'_>) {}
}

/// Lifecycle the effects manager drives
///
/// After [`cleanup`](Effect::cleanup) every call is a no-op.
pub trait Effect {
    fn config(&self) -> &EffectConfig;

    /// Shipped enabled state and intensity
    fn defaults(&self) -> EffectDefaults;

    /// Whether the effect is on (and not cleaned up)
    fn is_active(&self) -> bool;

    /// Turn on; no-op when already on
    fn enable(&mut self);

    /// Turn off; no-op when already off
    fn disable(&mut self);

    /// Write styles for `target`; ignored while off
    fn apply(&mut self, target: &ApplyTarget);

    /// Clear styles for `target`
    fn remove(&mut self, target: &ApplyTarget);

    /// Clamp to 0..=100, store and re-apply when on
    fn set_intensity(&mut self, value: i32);

    /// Disable and release; the effect is inert afterwards
    fn cleanup(&mut self);

    fn is_retired(&self) -> bool;
}

/// Generic [`Effect`] around a [`Technique`]
pub struct EffectCore<T: Technique> {
    config: EffectConfig,
    defaults: EffectDefaults,
    technique: T,
    stage: Stage,
    retired: bool,
}

impl<T: Technique> EffectCore<T> {
    /// Wrap a technique; `config.enabled` and `config.intensity` become the
    /// defaults and the effect starts off
    pub fn new(mut config: EffectConfig, technique: T, stage: Stage) -> Self {
        config.intensity = config.intensity.min(100);
        let defaults = EffectDefaults::from(&config);
        config.enabled = false;
        Self {
            config,
            defaults,
            technique,
            stage,
            retired: false,
        }
    }

    pub fn technique(&self) -> &T {
        &self.technique
    }

    fn split(&mut self) -> (EffectContext<'_>, &mut T) {
        (
            EffectContext {
                id: &self.config.id,
                intensity: self.config.intensity,
                stage: &self.stage,
            },
            &mut self.technique,
        )
    }
}

impl<T: Technique> Effect for EffectCore<T> {
    fn config(&self) -> &EffectConfig {
        &self.config
    }

    fn defaults(&self) -> EffectDefaults {
        self.defaults
    }

    fn is_active(&self) -> bool {
        self.config.enabled && !self.retired
    }

    fn enable(&mut self) {
        if self.retired || self.config.enabled {
            return;
        }
        self.config.enabled = true;
        let (ctx, technique) = self.split();
        technique.apply(&ctx, &ApplyTarget::All);
        technique.on_enable(&ctx);
    }

    fn disable(&mut self) {
        if self.retired || !self.config.enabled {
            return;
        }
        self.config.enabled = false;
        let (ctx, technique) = self.split();
        technique.remove(&ctx, &ApplyTarget::All);
        technique.on_disable(&ctx);
    }

    fn apply(&mut self, target: &ApplyTarget) {
        if self.retired || !self.config.enabled {
            return;
        }
        let (ctx, technique) = self.split();
        technique.apply(&ctx, target);
    }

    fn remove(&mut self, target: &ApplyTarget) {
        if self.retired {
            return;
        }
        let (ctx, technique) = self.split();
        technique.remove(&ctx, target);
    }

    fn set_intensity(&mut self, value: i32) {
        if self.retired {
            return;
        }
        let value = value.clamp(0, 100) as u8;
        let previous = self.config.intensity;
        if value == previous {
            return;
        }
        self.config.intensity = value;

        let enabled = self.config.enabled;
        let (ctx, technique) = self.split();
        if enabled {
            technique.apply(&ctx, &ApplyTarget::All);
        }
        technique.on_intensity_change(&ctx, previous);
    }

    fn cleanup(&mut self) {
        if self.retired {
            return;
        }
        self.disable();
        let (ctx, technique) = self.split();
        technique.on_cleanup(&ctx);
        self.retired = true;
    }

    fn is_retired(&self) -> bool {
        self.retired
    }
}

impl<T: Technique> std::fmt::Debug for EffectCore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectCore")
            .field("config", &self.config)
            .field("retired", &self.retired)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Technique for Recorder {
        fn apply(&mut self, ctx: &EffectContext<'_>, _target: &ApplyTarget) {
            self.calls.push(format!("apply:{}", ctx.intensity));
        }
        fn remove(&mut self, _ctx: &EffectContext<'_>, _target: &ApplyTarget) {
            self.calls.push("remove".into());
        }
        fn on_enable(&mut self, _ctx: &EffectContext<'_>) {
            self.calls.push("on_enable".into());
        }
        fn on_disable(&mut self, _ctx: &EffectContext<'_>) {
            self.calls.push("on_disable".into());
        }
        fn on_intensity_change(&mut self, _ctx: &EffectContext<'_>, previous: u8) {
            self.calls.push(format!("intensity:{previous}"));
        }
        fn on_cleanup(&mut self, _ctx: &EffectContext<'_>) {
            self.calls.push("on_cleanup".into());
        }
    }

    fn core() -> EffectCore<Recorder> {
        let surface = Rc::new(MemorySurface::new(["a"]));
        EffectCore::new(
            EffectConfig::new("rec", "Recorder").intensity(40),
            Recorder::default(),
            Stage::from_memory(&surface),
        )
    }

    #[test]
    fn test_starts_off_with_defaults() {
        let effect = core();
        assert!(!effect.is_active());
        assert_eq!(effect.defaults(), EffectDefaults { enabled: true, intensity: 40 });
    }

    #[test]
    fn test_enable_disable_are_idempotent() {
        let mut effect = core();
        effect.enable();
        effect.enable();
        effect.disable();
        effect.disable();
        assert_eq!(
            effect.technique().calls,
            vec!["apply:40", "on_enable", "remove", "on_disable"]
        );
    }

    #[test]
    fn test_set_intensity_clamps_and_reapplies() {
        let mut effect = core();
        effect.set_intensity(150);
        assert_eq!(effect.config().intensity, 100);
        assert_eq!(effect.technique().calls, vec!["intensity:40"]);

        effect.enable();
        effect.set_intensity(-5);
        assert_eq!(effect.config().intensity, 0);
        assert_eq!(
            effect.technique().calls,
            vec!["intensity:40", "apply:100", "on_enable", "apply:0", "intensity:100"]
        );
    }

    #[test]
    fn test_apply_ignored_while_off() {
        let mut effect = core();
        effect.apply(&ApplyTarget::All);
        assert!(effect.technique().calls.is_empty());
    }

    #[test]
    fn test_cleanup_makes_effect_inert() {
        let mut effect = core();
        effect.enable();
        effect.cleanup();
        effect.cleanup();
        effect.enable();
        effect.set_intensity(10);
        effect.remove(&ApplyTarget::All);

        assert!(effect.is_retired());
        assert!(!effect.is_active());
        assert_eq!(
            effect.technique().calls,
            vec!["apply:40", "on_enable", "remove", "on_disable", "on_cleanup"]
        );
    }

    #[test]
    fn test_scaling_helpers() {
        assert_eq!(intensity_fraction(50), 0.5);
        assert_eq!(intensity_fraction(200), 1.0);
        assert_eq!(scale_value(8.0, 25), 2.0);
        assert_eq!(scale_opacity(3.0, 50), 1.0);
    }
}
