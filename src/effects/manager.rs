//! Effects manager - registry, user controls and performance adaptation
//!
//! The manager owns every registered effect and the persisted preferences.
//! User-facing calls (enable, intensity, presets) write the preference
//! document through to the store; performance-tier changes run the
//! degradation ladder, which changes effects without touching preferences.

use std::collections::{HashMap, HashSet};

use super::events::{EffectsEvent, EventBus, EventKind, ListenerId};
use super::traits::Effect;
use super::types::{ApplyTarget, EffectConfig, EffectDefaults, EffectPriority};
use crate::device::{DeviceCapabilities, DeviceTier, RecommendedSettings};
use crate::error::CallbackError;
use crate::settings::{EffectOverride, EffectsPreferences, PreferenceStore, Preset};
use crate::telemetry::PerformanceTier;

/// Standard-effect intensity ceiling while `poor`
const POOR_STANDARD_CAP: u8 = 50;
/// Standard-effect intensity ceiling while `fair`
const FAIR_STANDARD_CAP: u8 = 70;
/// Standard-effect intensity restored at `good`
const GOOD_STANDARD_INTENSITY: u8 = 80;

/// Snapshot returned by [`EffectsManager::state`]
#[derive(Debug, Clone, PartialEq)]
pub struct EffectsManagerState {
    /// Active effect ids in registration order
    pub active: Vec<String>,
    pub performance_tier: PerformanceTier,
    pub device_tier: DeviceTier,
    pub global_enabled: bool,
    pub page_visible: bool,
    pub preferences: EffectsPreferences,
    /// Advisory cap from the device recommendation
    pub max_simultaneous_effects: usize,
}

/// Registry and control surface for all effects
pub struct EffectsManager {
    effects: HashMap<String, Box<dyn Effect>>,
    /// Registration order
    order: Vec<String>,
    active: HashSet<String>,
    performance_tier: PerformanceTier,
    device_tier: DeviceTier,
    global_enabled: bool,
    page_visible: bool,
    /// Device-level reduced motion preference
    reduced_motion: bool,
    max_simultaneous_effects: usize,
    preferences: EffectsPreferences,
    has_stored_preferences: bool,
    store: Box<dyn PreferenceStore>,
    storage_key: String,
    events: EventBus,
}

impl EffectsManager {
    /// Create a manager, loading preferences stored under `storage_key`
    pub fn new(store: Box<dyn PreferenceStore>, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let stored = EffectsPreferences::load(store.as_ref(), &storage_key);
        let has_stored_preferences = stored.is_some();

        Self {
            effects: HashMap::new(),
            order: Vec::new(),
            active: HashSet::new(),
            performance_tier: PerformanceTier::Excellent,
            device_tier: DeviceTier::Medium,
            global_enabled: true,
            page_visible: true,
            reduced_motion: false,
            max_simultaneous_effects: 3,
            preferences: stored.unwrap_or_default(),
            has_stored_preferences,
            store,
            storage_key,
            events: EventBus::new(),
        }
    }

    /// Record the detected device profile
    pub fn apply_device_profile(&mut self, caps: &DeviceCapabilities, recommended: &RecommendedSettings) {
        self.device_tier = caps.tier;
        self.reduced_motion = caps.prefers_reduced_motion;
        self.max_simultaneous_effects = recommended.max_simultaneous_effects;

        if self.motion_gate_active() {
            for id in self.order.clone() {
                if self.effects.get(&id).is_some_and(|e| e.config().motion_sensitive) {
                    self.deactivate(&id, true);
                }
            }
        }
    }

    /// Whether a preference document existed when the manager was created
    /// or has been written since
    pub fn has_stored_preferences(&self) -> bool {
        self.has_stored_preferences
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Register an effect
    ///
    /// Applies the stored override (or the effect's defaults) and enables the
    /// effect if preferred and globally allowed. A duplicate id is handed back.
    pub fn register_effect(&mut self, mut effect: Box<dyn Effect>) -> Result<(), Box<dyn Effect>> {
        let id = effect.config().id.clone();
        if self.effects.contains_key(&id) {
            tracing::warn!(target: "adaptive_effects::effects", id = %id, "Effect already registered");
            return Err(effect);
        }
        if effect.is_retired() {
            tracing::warn!(target: "adaptive_effects::effects", id = %id, "Refusing to register a cleaned-up effect");
            return Err(effect);
        }

        let preferred = match self.preferences.effect(&id) {
            Some(o) => EffectDefaults { enabled: o.enabled, intensity: o.intensity },
            None => effect.defaults(),
        };
        let priority = effect.config().priority;
        let intensity = match self.tier_cap(priority) {
            Some(cap) => preferred.intensity.min(cap),
            None => preferred.intensity,
        };
        effect.set_intensity(i32::from(intensity));

        self.effects.insert(id.clone(), effect);
        self.order.push(id.clone());
        tracing::debug!(target: "adaptive_effects::effects", id = %id, "Effect registered");

        if preferred.enabled && self.global_enabled && self.tier_permits(priority) {
            self.activate(&id, false);
        }
        Ok(())
    }

    /// Disable, clean up and remove an effect
    pub fn unregister_effect(&mut self, id: &str) -> bool {
        let Some(mut effect) = self.effects.remove(id) else {
            tracing::warn!(target: "adaptive_effects::effects", id, "Cannot unregister unknown effect");
            return false;
        };
        self.active.remove(id);
        self.order.retain(|other| other != id);
        effect.cleanup();
        tracing::debug!(target: "adaptive_effects::effects", id, "Effect unregistered");
        true
    }

    /// Clean up every effect; the manager is empty afterwards
    pub fn shutdown(&mut self) {
        for id in std::mem::take(&mut self.order) {
            if let Some(mut effect) = self.effects.remove(&id) {
                effect.cleanup();
            }
        }
        self.active.clear();
        tracing::debug!(target: "adaptive_effects::effects", "Effects manager shut down");
    }

    // ------------------------------------------------------------------
    // User controls
    // ------------------------------------------------------------------

    /// Turn an effect on and remember the choice
    pub fn enable_effect(&mut self, id: &str) -> bool {
        if !self.effects.contains_key(id) {
            tracing::warn!(target: "adaptive_effects::effects", id, "Cannot enable unknown effect");
            return false;
        }
        if self.active.contains(id) {
            tracing::debug!(target: "adaptive_effects::effects", id, "Effect already enabled");
            return false;
        }
        if !self.activate(id, true) {
            return false;
        }

        let intensity = self.preferred(id).map_or(0, |p| p.intensity);
        self.record_override(id, true, intensity);
        self.persist();
        true
    }

    /// Turn an effect off and remember the choice
    pub fn disable_effect(&mut self, id: &str) -> bool {
        if !self.effects.contains_key(id) {
            tracing::warn!(target: "adaptive_effects::effects", id, "Cannot disable unknown effect");
            return false;
        }
        if !self.active.contains(id) {
            tracing::debug!(target: "adaptive_effects::effects", id, "Effect already disabled");
            return false;
        }
        self.deactivate(id, true);

        let intensity = self.preferred(id).map_or(0, |p| p.intensity);
        self.record_override(id, false, intensity);
        self.persist();
        true
    }

    /// Flip an effect; returns whether it changed
    pub fn toggle_effect(&mut self, id: &str) -> bool {
        if self.active.contains(id) {
            self.disable_effect(id)
        } else {
            self.enable_effect(id)
        }
    }

    /// Set intensity (clamped to 0..=100) and remember it
    pub fn set_effect_intensity(&mut self, id: &str, value: i32) -> bool {
        let Some(preferred) = self.preferred(id) else {
            tracing::warn!(target: "adaptive_effects::effects", id, "Cannot set intensity of unknown effect");
            return false;
        };
        let intensity = value.clamp(0, 100) as u8;
        let applied = self.set_intensity_internal(id, intensity);

        // The stored preference keeps the requested value; a degraded tier
        // only caps what is applied.
        self.record_override(id, preferred.enabled, intensity);
        self.persist();
        self.emit_intensity(id, applied);
        true
    }

    /// Toggle the effect bound to `key`; returns whether one matched
    pub fn handle_shortcut(&mut self, key: char) -> bool {
        let Some(id) = self
            .order
            .iter()
            .find(|id| self.effects.get(*id).is_some_and(|e| e.config().matches_shortcut(key)))
            .cloned()
        else {
            return false;
        };
        self.toggle_effect(&id);
        true
    }

    /// Allow effects again and re-enable every preferred one
    pub fn enable_all_effects(&mut self) {
        self.global_enabled = true;
        for id in self.order.clone() {
            let Some(preferred) = self.preferred(&id) else { continue };
            let permitted = self
                .effects
                .get(&id)
                .is_some_and(|e| self.tier_permits(e.config().priority));
            if preferred.enabled && permitted {
                self.activate(&id, true);
            }
        }
        tracing::info!(target: "adaptive_effects::effects", active = self.active.len(), "All effects enabled");
    }

    /// Turn every effect off without rewriting per-effect preferences
    pub fn disable_all_effects(&mut self) {
        self.global_enabled = false;
        for id in self.order.clone() {
            self.deactivate(&id, true);
        }
        tracing::info!(target: "adaptive_effects::effects", "All effects disabled");
    }

    /// Apply a named preset and remember it
    pub fn apply_preset(&mut self, preset: Preset) {
        self.preferences.preset = preset;

        if let Some(intensity) = preset.intensity() {
            for id in self.order.clone() {
                let Some(effect) = self.effects.get(&id) else { continue };
                let priority = effect.config().priority;
                let enabled = match preset {
                    Preset::Minimal if priority == EffectPriority::Luxury => {
                        self.deactivate(&id, true);
                        false
                    }
                    Preset::Full => {
                        if self.global_enabled && self.tier_permits(priority) {
                            self.activate(&id, true);
                        }
                        true
                    }
                    _ => self.preferred(&id).is_some_and(|p| p.enabled),
                };
                self.set_intensity_internal(&id, intensity);
                self.record_override(&id, enabled, intensity);
            }
        }

        self.persist();
        tracing::info!(target: "adaptive_effects::effects", preset = %preset, "Preset applied");
        self.events.emit(&EffectsEvent::PresetChanged { preset });
    }

    /// Restore default preferences and every effect's shipped state
    pub fn reset_preferences(&mut self) {
        self.preferences = EffectsPreferences::default();
        self.persist();

        for id in self.order.clone() {
            let Some(effect) = self.effects.get(&id) else { continue };
            let defaults = effect.defaults();
            let priority = effect.config().priority;
            if defaults.enabled && self.global_enabled && self.tier_permits(priority) {
                self.activate(&id, true);
            } else {
                self.deactivate(&id, true);
            }
            self.set_intensity_internal(&id, defaults.intensity);
        }
        tracing::info!(target: "adaptive_effects::effects", "Preferences reset to defaults");
    }

    /// Honor (or ignore) the device reduced-motion preference
    pub fn set_respect_reduced_motion(&mut self, respect: bool) {
        if self.preferences.respect_reduced_motion == respect {
            return;
        }
        self.preferences.respect_reduced_motion = respect;
        self.persist();

        for id in self.order.clone() {
            let Some(effect) = self.effects.get(&id) else { continue };
            if !effect.config().motion_sensitive || !self.reduced_motion {
                continue;
            }
            let priority = effect.config().priority;
            if respect {
                self.deactivate(&id, true);
            } else if self.preferred(&id).is_some_and(|p| p.enabled)
                && self.global_enabled
                && self.tier_permits(priority)
            {
                self.activate(&id, true);
            }
        }
    }

    /// Turn automatic performance adjustment on or off
    pub fn set_auto_performance_adjust(&mut self, enabled: bool) {
        if self.preferences.auto_performance_adjust == enabled {
            return;
        }
        self.preferences.auto_performance_adjust = enabled;
        self.persist();
        if enabled {
            self.run_ladder(self.performance_tier);
        }
    }

    // ------------------------------------------------------------------
    // Adaptation
    // ------------------------------------------------------------------

    /// React to a performance tier change
    pub fn update_performance_tier(&mut self, tier: PerformanceTier) {
        if tier == self.performance_tier {
            return;
        }
        let previous = self.performance_tier;
        self.performance_tier = tier;

        if self.preferences.auto_performance_adjust {
            self.run_ladder(tier);
        }
        tracing::info!(
            target: "adaptive_effects::effects",
            tier = %tier,
            previous = %previous,
            active = self.active.len(),
            "Performance tier applied"
        );

        if tier.is_degraded() {
            self.events.emit(&EffectsEvent::PerformanceDegradation { tier, previous });
        } else if previous.is_degraded() {
            self.events.emit(&EffectsEvent::PerformanceRecovery { tier, previous });
        }
    }

    /// Show or hide every active effect without changing the active set
    pub fn set_page_visible(&mut self, visible: bool) {
        if self.page_visible == visible {
            return;
        }
        self.page_visible = visible;

        for id in &self.order {
            if !self.active.contains(id) {
                continue;
            }
            if let Some(effect) = self.effects.get_mut(id) {
                if visible {
                    effect.apply(&ApplyTarget::All);
                } else {
                    effect.remove(&ApplyTarget::All);
                }
            }
        }
        tracing::debug!(target: "adaptive_effects::effects", visible, "Page visibility changed");
    }

    fn run_ladder(&mut self, tier: PerformanceTier) {
        for id in self.order.clone() {
            let Some(effect) = self.effects.get(&id) else { continue };
            let priority = effect.config().priority;
            let current = effect.config().intensity;

            match (tier, priority) {
                (_, EffectPriority::Critical) => {}
                (PerformanceTier::Poor | PerformanceTier::Fair, EffectPriority::Luxury) => {
                    self.deactivate(&id, true);
                }
                (PerformanceTier::Poor | PerformanceTier::Fair, EffectPriority::Standard) => {
                    let cap = self.tier_cap(priority).unwrap_or(100);
                    if self.active.contains(&id) && current > cap {
                        self.set_intensity_internal(&id, cap);
                        self.emit_intensity(&id, cap);
                    }
                }
                (PerformanceTier::Good, EffectPriority::Standard) => {
                    if self.global_enabled && self.preferred(&id).is_some_and(|p| p.enabled) {
                        self.activate(&id, true);
                    }
                    if self.active.contains(&id) && current != GOOD_STANDARD_INTENSITY {
                        self.set_intensity_internal(&id, GOOD_STANDARD_INTENSITY);
                        self.emit_intensity(&id, GOOD_STANDARD_INTENSITY);
                    }
                }
                (PerformanceTier::Good, EffectPriority::Luxury) => {}
                (PerformanceTier::Excellent, _) => {
                    let Some(preferred) = self.preferred(&id) else { continue };
                    if !preferred.enabled || !self.global_enabled {
                        continue;
                    }
                    self.activate(&id, true);
                    if self.active.contains(&id) && current != preferred.intensity {
                        self.set_intensity_internal(&id, preferred.intensity);
                        self.emit_intensity(&id, preferred.intensity);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Subscribe to one kind of manager event
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EffectsEvent) -> Result<(), CallbackError> + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> EffectsManagerState {
        EffectsManagerState {
            active: self
                .order
                .iter()
                .filter(|id| self.active.contains(*id))
                .cloned()
                .collect(),
            performance_tier: self.performance_tier,
            device_tier: self.device_tier,
            global_enabled: self.global_enabled,
            page_visible: self.page_visible,
            preferences: self.preferences.clone(),
            max_simultaneous_effects: self.max_simultaneous_effects,
        }
    }

    pub fn effect_config(&self, id: &str) -> Option<&EffectConfig> {
        self.effects.get(id).map(|e| e.config())
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Registered ids in registration order
    pub fn effect_ids(&self) -> &[String] {
        &self.order
    }

    pub fn preferences(&self) -> &EffectsPreferences {
        &self.preferences
    }

    pub fn performance_tier(&self) -> PerformanceTier {
        self.performance_tier
    }

    /// Sum of the advisory per-frame cost of active effects
    pub fn estimated_cost_ms(&self) -> f64 {
        self.active
            .iter()
            .filter_map(|id| self.effects.get(id))
            .map(|e| e.config().cost_ms)
            .sum()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn activate(&mut self, id: &str, emit: bool) -> bool {
        if self.active.contains(id) {
            return false;
        }
        let motion_gate = self.motion_gate_active();
        let page_visible = self.page_visible;
        let Some(priority) = self.effects.get(id).map(|e| e.config().priority) else {
            return false;
        };
        let cap = self.tier_cap(priority);
        let Some(effect) = self.effects.get_mut(id) else {
            return false;
        };
        if motion_gate && effect.config().motion_sensitive {
            tracing::debug!(target: "adaptive_effects::effects", id, "Suppressed by reduced motion preference");
            return false;
        }

        if let Some(cap) = cap {
            if effect.config().intensity > cap {
                effect.set_intensity(i32::from(cap));
            }
        }
        effect.enable();
        if !effect.is_active() {
            return false;
        }
        if !page_visible {
            effect.remove(&ApplyTarget::All);
        }
        self.active.insert(id.to_string());

        if emit {
            self.events.emit(&EffectsEvent::EffectEnabled { id: id.to_string() });
        }
        true
    }

    fn deactivate(&mut self, id: &str, emit: bool) -> bool {
        if !self.active.remove(id) {
            return false;
        }
        if let Some(effect) = self.effects.get_mut(id) {
            effect.disable();
        }
        if emit {
            self.events.emit(&EffectsEvent::EffectDisabled { id: id.to_string() });
        }
        true
    }

    /// Forward an intensity, capped by the current tier; returns what was applied
    fn set_intensity_internal(&mut self, id: &str, intensity: u8) -> u8 {
        let page_visible = self.page_visible;
        let active = self.active.contains(id);
        let Some(priority) = self.effects.get(id).map(|e| e.config().priority) else {
            return intensity;
        };
        let applied = self.tier_cap(priority).map_or(intensity, |cap| intensity.min(cap));
        if let Some(effect) = self.effects.get_mut(id) {
            effect.set_intensity(i32::from(applied));
            // set_intensity re-applies; keep hidden pages clean
            if active && !page_visible {
                effect.remove(&ApplyTarget::All);
            }
        }
        applied
    }

    fn emit_intensity(&mut self, id: &str, intensity: u8) {
        self.events.emit(&EffectsEvent::IntensityChanged {
            id: id.to_string(),
            intensity,
        });
    }

    /// Stored override, else the effect's defaults
    fn preferred(&self, id: &str) -> Option<EffectDefaults> {
        let effect = self.effects.get(id)?;
        Some(match self.preferences.effect(id) {
            Some(o) => EffectDefaults {
                enabled: o.enabled,
                intensity: o.intensity,
            },
            None => effect.defaults(),
        })
    }

    fn record_override(&mut self, id: &str, enabled: bool, intensity: u8) {
        self.preferences
            .effects
            .insert(id.to_string(), EffectOverride { enabled, intensity });
    }

    fn persist(&mut self) {
        match self.preferences.save(self.store.as_ref(), &self.storage_key) {
            Ok(()) => self.has_stored_preferences = true,
            Err(e) => {
                tracing::warn!(
                    target: "adaptive_effects::effects",
                    key = %self.storage_key,
                    error = %e,
                    "Failed to persist effect preferences"
                );
            }
        }
    }

    fn motion_gate_active(&self) -> bool {
        self.reduced_motion && self.preferences.respect_reduced_motion
    }

    /// Whether the current tier allows activating this priority class
    fn tier_permits(&self, priority: EffectPriority) -> bool {
        !(self.preferences.auto_performance_adjust
            && self.performance_tier.is_degraded()
            && priority == EffectPriority::Luxury)
    }

    /// Intensity ceiling the current tier imposes on this priority class
    fn tier_cap(&self, priority: EffectPriority) -> Option<u8> {
        if !self.preferences.auto_performance_adjust || priority != EffectPriority::Standard {
            return None;
        }
        match self.performance_tier {
            PerformanceTier::Poor => Some(POOR_STANDARD_CAP),
            PerformanceTier::Fair => Some(FAIR_STANDARD_CAP),
            _ => None,
        }
    }
}

impl std::fmt::Debug for EffectsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsManager")
            .field("effects", &self.order)
            .field("active", &self.active.len())
            .field("performance_tier", &self.performance_tier)
            .field("global_enabled", &self.global_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::traits::{EffectContext, EffectCore, Technique};
    use crate::settings::{MemoryStore, StoreError, DEFAULT_STORAGE_KEY};
    use crate::surface::{FilterOp, MemorySurface, Stage, StyleTarget, SurfaceStyle};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Writes its intensity as a root brightness filter
    struct Marker;

    impl Technique for Marker {
        fn apply(&mut self, ctx: &EffectContext<'_>, _target: &ApplyTarget) {
            ctx.stage.surface.set_style(
                &StyleTarget::Root,
                ctx.id,
                SurfaceStyle::Filter(vec![FilterOp::Brightness(f64::from(ctx.intensity))]),
            );
        }

        fn remove(&mut self, ctx: &EffectContext<'_>, _target: &ApplyTarget) {
            ctx.stage.surface.clear_style(&StyleTarget::Root, ctx.id);
        }
    }

    struct Fixture {
        manager: EffectsManager,
        store: MemoryStore,
        surface: Rc<MemorySurface>,
        events: Rc<RefCell<Vec<EffectsEvent>>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_store(MemoryStore::new())
        }

        fn with_store(store: MemoryStore) -> Self {
            let manager = EffectsManager::new(Box::new(store.clone()), DEFAULT_STORAGE_KEY);
            let mut fixture = Self {
                manager,
                store,
                surface: Rc::new(MemorySurface::new(["hero", "work"])),
                events: Rc::new(RefCell::new(Vec::new())),
            };
            for kind in [
                EventKind::EffectEnabled,
                EventKind::EffectDisabled,
                EventKind::IntensityChanged,
                EventKind::PerformanceDegradation,
                EventKind::PerformanceRecovery,
                EventKind::PresetChanged,
            ] {
                let sink = Rc::clone(&fixture.events);
                fixture.manager.on(kind, move |event| {
                    sink.borrow_mut().push(event.clone());
                    Ok(())
                });
            }
            fixture
        }

        fn effect(&self, id: &str, priority: EffectPriority, enabled: bool, intensity: u8) -> Box<dyn Effect> {
            let config = EffectConfig::new(id, id)
                .priority(priority)
                .enabled(enabled)
                .intensity(intensity)
                .cost_ms(1.0);
            Box::new(EffectCore::new(config, Marker, Stage::from_memory(&self.surface)))
        }

        fn register(&mut self, id: &str, priority: EffectPriority, enabled: bool, intensity: u8) {
            let effect = self.effect(id, priority, enabled, intensity);
            assert!(self.manager.register_effect(effect).is_ok());
        }

        /// critical, two standard, two luxury (one off by default)
        fn populated() -> Self {
            Self::new().with_standard_set()
        }

        fn with_standard_set(mut self) -> Self {
            self.register("focus-ring", EffectPriority::Critical, true, 100);
            self.register("depth", EffectPriority::Standard, true, 90);
            self.register("grading", EffectPriority::Standard, true, 60);
            self.register("vignette", EffectPriority::Luxury, true, 60);
            self.register("blur", EffectPriority::Luxury, false, 50);
            self.events.borrow_mut().clear();
            self
        }

        fn intensity(&self, id: &str) -> u8 {
            self.manager.effect_config(id).map_or(0, |c| c.intensity)
        }

        fn count(&self, kind: EventKind) -> usize {
            self.events.borrow().iter().filter(|e| e.kind() == kind).count()
        }
    }

    #[test]
    fn test_registration_applies_defaults() {
        let fixture = Fixture::populated();
        assert_eq!(
            fixture.manager.state().active,
            vec!["focus-ring", "depth", "grading", "vignette"]
        );
        assert!(!fixture.manager.is_active("blur"));
        assert_eq!(fixture.intensity("depth"), 90);
        // Registration is not a user mutation.
        assert!(fixture.store.get(DEFAULT_STORAGE_KEY).is_none());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut fixture = Fixture::populated();
        let duplicate = fixture.effect("depth", EffectPriority::Luxury, false, 10);
        let rejected = fixture.manager.register_effect(duplicate);

        assert!(rejected.is_err());
        assert_eq!(fixture.manager.effect_ids().len(), 5);
        assert_eq!(fixture.intensity("depth"), 90);
        assert!(fixture.manager.is_active("depth"));
    }

    #[test]
    fn test_registration_uses_stored_override() {
        let store = MemoryStore::new();
        let mut prefs = EffectsPreferences::default();
        prefs.effects.insert("depth".into(), EffectOverride { enabled: false, intensity: 25 });
        prefs.save(&store, DEFAULT_STORAGE_KEY).unwrap();

        let mut fixture = Fixture::with_store(store);
        assert!(fixture.manager.has_stored_preferences());
        fixture.register("depth", EffectPriority::Standard, true, 90);

        assert!(!fixture.manager.is_active("depth"));
        assert_eq!(fixture.intensity("depth"), 25);
    }

    #[test]
    fn test_enable_disable_emit_once() {
        let mut fixture = Fixture::populated();

        assert!(fixture.manager.enable_effect("blur"));
        assert!(!fixture.manager.enable_effect("blur"));
        assert!(fixture.manager.disable_effect("blur"));
        assert!(!fixture.manager.disable_effect("blur"));

        assert_eq!(fixture.count(EventKind::EffectEnabled), 1);
        assert_eq!(fixture.count(EventKind::EffectDisabled), 1);
        assert_eq!(
            fixture.manager.preferences().effect("blur"),
            Some(&EffectOverride { enabled: false, intensity: 50 })
        );
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut fixture = Fixture::populated();
        assert!(!fixture.manager.enable_effect("missing"));
        assert!(!fixture.manager.disable_effect("missing"));
        assert!(!fixture.manager.set_effect_intensity("missing", 10));
        assert!(!fixture.manager.unregister_effect("missing"));
        assert!(fixture.events.borrow().is_empty());
    }

    #[test]
    fn test_intensity_is_clamped_and_persisted() {
        let mut fixture = Fixture::populated();
        assert!(fixture.manager.set_effect_intensity("grading", 150));
        assert_eq!(fixture.intensity("grading"), 100);

        let stored = EffectsPreferences::load(&fixture.store, DEFAULT_STORAGE_KEY).unwrap();
        assert_eq!(stored.effect("grading").map(|o| o.intensity), Some(100));
        assert_eq!(
            *fixture.events.borrow(),
            vec![EffectsEvent::IntensityChanged { id: "grading".into(), intensity: 100 }]
        );

        fixture.manager.set_effect_intensity("grading", -20);
        assert_eq!(fixture.intensity("grading"), 0);
    }

    #[test]
    fn test_minimal_preset_disables_luxury_only() {
        let mut fixture = Fixture::populated();
        fixture.manager.apply_preset(Preset::Minimal);

        let state = fixture.manager.state();
        assert_eq!(state.active, vec!["focus-ring", "depth", "grading"]);
        assert_eq!(state.preferences.preset, Preset::Minimal);
        for id in fixture.manager.effect_ids().to_vec() {
            assert_eq!(fixture.intensity(&id), 30);
        }
        assert_eq!(fixture.count(EventKind::PresetChanged), 1);
    }

    #[test]
    fn test_full_and_balanced_presets() {
        let mut fixture = Fixture::populated();
        fixture.manager.apply_preset(Preset::Full);
        assert_eq!(fixture.manager.state().active.len(), 5);
        assert_eq!(fixture.intensity("blur"), 100);

        fixture.manager.disable_effect("blur");
        fixture.manager.apply_preset(Preset::Balanced);
        assert!(!fixture.manager.is_active("blur"));
        assert_eq!(fixture.intensity("depth"), 60);

        fixture.manager.apply_preset(Preset::Custom);
        assert_eq!(fixture.intensity("depth"), 60);
        assert_eq!(fixture.manager.preferences().preset, Preset::Custom);
    }

    #[test]
    fn test_degradation_ladder_to_poor() {
        let mut fixture = Fixture::populated();
        fixture.manager.enable_effect("blur");
        let persisted = fixture.store.get(DEFAULT_STORAGE_KEY);

        fixture.manager.update_performance_tier(PerformanceTier::Poor);

        let state = fixture.manager.state();
        assert_eq!(state.active, vec!["focus-ring", "depth", "grading"]);
        assert_eq!(fixture.intensity("depth"), 50);
        assert_eq!(fixture.intensity("grading"), 50);
        assert_eq!(fixture.intensity("focus-ring"), 100);
        assert_eq!(fixture.count(EventKind::PerformanceDegradation), 1);
        // Ladder changes are not written through.
        assert_eq!(fixture.store.get(DEFAULT_STORAGE_KEY), persisted);
    }

    #[test]
    fn test_fair_tier_clamps_to_70_in_one_notification() {
        let mut fixture = Fixture::populated();
        fixture.manager.update_performance_tier(PerformanceTier::Fair);

        assert!(!fixture.manager.is_active("vignette"));
        assert_eq!(fixture.intensity("depth"), 70);
        assert_eq!(fixture.intensity("grading"), 60);
        assert_eq!(
            fixture.events.borrow().last(),
            Some(&EffectsEvent::PerformanceDegradation {
                tier: PerformanceTier::Fair,
                previous: PerformanceTier::Excellent,
            })
        );
    }

    #[test]
    fn test_recovery_restores_preferred_effects() {
        let mut fixture = Fixture::populated();
        fixture.manager.set_effect_intensity("vignette", 45);
        fixture.manager.update_performance_tier(PerformanceTier::Poor);
        fixture.manager.update_performance_tier(PerformanceTier::Excellent);

        let state = fixture.manager.state();
        assert_eq!(state.active, vec!["focus-ring", "depth", "grading", "vignette"]);
        assert_eq!(fixture.intensity("depth"), 90);
        assert_eq!(fixture.intensity("vignette"), 45);
        assert!(!fixture.manager.is_active("blur"));
        assert_eq!(fixture.count(EventKind::PerformanceRecovery), 1);
    }

    #[test]
    fn test_recovery_keeps_explicitly_disabled_effects_off() {
        let mut fixture = Fixture::populated();
        fixture.manager.disable_effect("grading");
        fixture.manager.update_performance_tier(PerformanceTier::Poor);
        fixture.manager.update_performance_tier(PerformanceTier::Excellent);
        assert!(!fixture.manager.is_active("grading"));
        assert!(fixture.manager.is_active("depth"));
    }

    #[test]
    fn test_good_tier_restores_standard_at_80() {
        let mut fixture = Fixture::populated();
        fixture.manager.update_performance_tier(PerformanceTier::Poor);
        fixture.manager.update_performance_tier(PerformanceTier::Good);

        assert_eq!(fixture.intensity("depth"), 80);
        assert_eq!(fixture.intensity("grading"), 80);
        assert!(!fixture.manager.is_active("vignette"));
        assert_eq!(fixture.count(EventKind::PerformanceRecovery), 1);
    }

    #[test]
    fn test_same_tier_is_noop() {
        let mut fixture = Fixture::populated();
        fixture.manager.update_performance_tier(PerformanceTier::Excellent);
        assert!(fixture.events.borrow().is_empty());
    }

    #[test]
    fn test_auto_adjust_off_skips_ladder() {
        let mut fixture = Fixture::populated();
        fixture.manager.set_auto_performance_adjust(false);
        fixture.manager.update_performance_tier(PerformanceTier::Poor);

        assert!(fixture.manager.is_active("vignette"));
        assert_eq!(fixture.intensity("depth"), 90);
        assert_eq!(fixture.count(EventKind::PerformanceDegradation), 1);

        // Turning it back on catches up with the current tier.
        fixture.manager.set_auto_performance_adjust(true);
        assert!(!fixture.manager.is_active("vignette"));
    }

    #[test]
    fn test_luxury_registered_while_degraded_stays_off() {
        let mut fixture = Fixture::new();
        fixture.manager.update_performance_tier(PerformanceTier::Poor);
        fixture.register("sparkle", EffectPriority::Luxury, true, 60);
        fixture.register("depth", EffectPriority::Standard, true, 90);

        assert!(!fixture.manager.is_active("sparkle"));
        assert_eq!(fixture.intensity("depth"), 50);
    }

    #[test]
    fn test_user_controls_hold_poor_tier_caps() {
        let mut fixture = Fixture::populated();
        fixture.manager.disable_effect("depth");
        fixture.manager.update_performance_tier(PerformanceTier::Poor);

        assert!(fixture.manager.enable_effect("depth"));
        assert_eq!(fixture.intensity("depth"), 50);
        assert_eq!(fixture.manager.preferences().effect("depth").map(|o| o.intensity), Some(90));

        assert!(fixture.manager.set_effect_intensity("grading", 95));
        assert_eq!(fixture.intensity("grading"), 50);
        assert_eq!(fixture.manager.preferences().effect("grading").map(|o| o.intensity), Some(95));
        assert_eq!(
            fixture.events.borrow().last(),
            Some(&EffectsEvent::IntensityChanged { id: "grading".into(), intensity: 50 })
        );

        fixture.manager.reset_preferences();
        assert_eq!(fixture.intensity("depth"), 50);
        assert!(!fixture.manager.is_active("vignette"));

        fixture.manager.disable_all_effects();
        fixture.manager.enable_all_effects();
        assert_eq!(fixture.manager.state().active, vec!["focus-ring", "depth", "grading"]);
        assert_eq!(fixture.intensity("depth"), 50);
        assert_eq!(fixture.intensity("grading"), 50);

        fixture.manager.apply_preset(Preset::Full);
        assert_eq!(fixture.manager.state().active, vec!["focus-ring", "depth", "grading"]);
        assert_eq!(fixture.intensity("depth"), 50);
        assert_eq!(fixture.intensity("focus-ring"), 100);

        // The preset is remembered and takes effect once the tier recovers.
        fixture.manager.update_performance_tier(PerformanceTier::Excellent);
        assert_eq!(fixture.manager.state().active.len(), 5);
        assert_eq!(fixture.intensity("depth"), 100);
        assert_eq!(fixture.intensity("blur"), 100);
    }

    #[test]
    fn test_fair_tier_caps_enable_at_70() {
        let mut fixture = Fixture::populated();
        fixture.manager.disable_effect("depth");
        fixture.manager.update_performance_tier(PerformanceTier::Fair);

        fixture.manager.enable_effect("depth");
        assert_eq!(fixture.intensity("depth"), 70);
        fixture.manager.apply_preset(Preset::Balanced);
        assert_eq!(fixture.intensity("depth"), 60);
    }

    #[test]
    fn test_preferences_survive_reload() {
        let mut fixture = Fixture::populated();
        fixture.manager.apply_preset(Preset::Minimal);
        fixture.manager.enable_effect("blur");
        fixture.manager.set_effect_intensity("depth", 75);
        fixture.manager.disable_effect("grading");
        fixture.manager.toggle_effect("vignette");
        fixture.manager.set_respect_reduced_motion(false);

        let reloaded = Fixture::with_store(fixture.store.clone()).with_standard_set();

        assert!(reloaded.manager.has_stored_preferences());
        assert_eq!(reloaded.manager.preferences(), fixture.manager.preferences());
        assert_eq!(reloaded.manager.state().active, vec!["focus-ring", "depth", "vignette", "blur"]);
        assert_eq!(reloaded.manager.state().active, fixture.manager.state().active);
        for id in fixture.manager.effect_ids().to_vec() {
            assert_eq!(reloaded.intensity(&id), fixture.intensity(&id), "intensity of {id}");
        }
        assert_eq!(reloaded.intensity("depth"), 75);
        assert_eq!(reloaded.intensity("grading"), 30);
    }

    #[test]
    fn test_hidden_page_removes_styles_but_keeps_state() {
        let mut fixture = Fixture::populated();
        assert_eq!(fixture.surface.style_count(), 4);

        fixture.manager.set_page_visible(false);
        assert_eq!(fixture.surface.style_count(), 0);
        assert_eq!(fixture.manager.state().active.len(), 4);

        // Changes while hidden stay off the surface.
        fixture.manager.set_effect_intensity("depth", 20);
        fixture.manager.enable_effect("blur");
        assert_eq!(fixture.surface.style_count(), 0);

        fixture.manager.set_page_visible(true);
        assert_eq!(fixture.surface.style_count(), 5);
        assert_eq!(
            fixture.surface.style(&StyleTarget::Root, "depth"),
            Some(SurfaceStyle::Filter(vec![FilterOp::Brightness(20.0)]))
        );
    }

    #[test]
    fn test_disable_all_keeps_preferences() {
        let mut fixture = Fixture::populated();
        fixture.manager.disable_all_effects();
        assert!(fixture.manager.state().active.is_empty());
        assert!(fixture.manager.preferences().effects.is_empty());

        // Registration respects the global flag.
        fixture.register("late", EffectPriority::Standard, true, 50);
        assert!(!fixture.manager.is_active("late"));

        fixture.manager.enable_all_effects();
        assert_eq!(
            fixture.manager.state().active,
            vec!["focus-ring", "depth", "grading", "vignette", "late"]
        );
    }

    #[test]
    fn test_reset_preferences_restores_defaults() {
        let mut fixture = Fixture::populated();
        fixture.manager.apply_preset(Preset::Full);
        fixture.manager.set_auto_performance_adjust(false);

        fixture.manager.reset_preferences();

        assert_eq!(*fixture.manager.preferences(), EffectsPreferences::default());
        assert!(!fixture.manager.is_active("blur"));
        assert_eq!(fixture.intensity("depth"), 90);
        let stored = EffectsPreferences::load(&fixture.store, DEFAULT_STORAGE_KEY).unwrap();
        assert_eq!(stored, EffectsPreferences::default());
    }

    #[test]
    fn test_unregister_cleans_up() {
        let mut fixture = Fixture::populated();
        assert!(fixture.manager.unregister_effect("vignette"));
        assert!(!fixture.manager.is_active("vignette"));
        assert!(fixture.manager.effect_config("vignette").is_none());
        assert_eq!(fixture.surface.styled_count("vignette"), 0);
    }

    #[test]
    fn test_shortcut_toggles_bound_effect() {
        let mut fixture = Fixture::new();
        let config = EffectConfig::new("blur", "Blur").enabled(false).shortcut('m');
        let effect = EffectCore::new(config, Marker, Stage::from_memory(&fixture.surface));
        assert!(fixture.manager.register_effect(Box::new(effect)).is_ok());

        assert!(fixture.manager.handle_shortcut('M'));
        assert!(fixture.manager.is_active("blur"));
        assert!(fixture.manager.handle_shortcut('m'));
        assert!(!fixture.manager.is_active("blur"));
        assert!(!fixture.manager.handle_shortcut('x'));
    }

    #[test]
    fn test_reduced_motion_gates_motion_sensitive_effects() {
        use crate::device::{DeviceCapabilityDetector, StaticProbe};

        let mut fixture = Fixture::new();
        let mut detector = DeviceCapabilityDetector::new(Box::new(StaticProbe {
            prefers_reduced_motion: true,
            ..StaticProbe::default()
        }));
        let caps = detector.capabilities().clone();
        let recommended = detector.recommended_settings();
        fixture.manager.apply_device_profile(&caps, &recommended);

        let config = EffectConfig::new("motion", "Motion").motion_sensitive(true);
        let effect = EffectCore::new(config, Marker, Stage::from_memory(&fixture.surface));
        assert!(fixture.manager.register_effect(Box::new(effect)).is_ok());
        assert!(!fixture.manager.is_active("motion"));
        assert!(!fixture.manager.enable_effect("motion"));

        fixture.manager.set_respect_reduced_motion(false);
        assert!(fixture.manager.is_active("motion"));

        fixture.manager.set_respect_reduced_motion(true);
        assert!(!fixture.manager.is_active("motion"));
        assert_eq!(fixture.manager.state().max_simultaneous_effects, 1);
    }

    #[test]
    fn test_estimated_cost_sums_active_effects() {
        let fixture = Fixture::populated();
        assert_eq!(fixture.manager.estimated_cost_ms(), 4.0);
    }

    struct FailingStore;

    impl PreferenceStore for FailingStore {
        fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::NoConfigDir)
        }
        fn write(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::NoConfigDir)
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::NoConfigDir)
        }
    }

    #[test]
    fn test_store_failures_are_not_fatal() {
        let surface = Rc::new(MemorySurface::new(["hero"]));
        let mut manager = EffectsManager::new(Box::new(FailingStore), DEFAULT_STORAGE_KEY);
        assert_eq!(*manager.preferences(), EffectsPreferences::default());

        let effect = EffectCore::new(EffectConfig::new("fx", "Fx"), Marker, Stage::from_memory(&surface));
        assert!(manager.register_effect(Box::new(effect)).is_ok());
        assert!(manager.disable_effect("fx"));
        assert!(!manager.is_active("fx"));
    }

    #[test]
    fn test_shutdown_empties_registry() {
        let mut fixture = Fixture::populated();
        fixture.manager.shutdown();
        assert!(fixture.manager.effect_ids().is_empty());
        assert_eq!(fixture.surface.style_count(), 0);
    }
}
