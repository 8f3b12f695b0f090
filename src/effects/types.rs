//! Core effect data types
//!
//! Static descriptors and targeting. Runtime state lives inside each effect's
//! technique; the manager only reads and writes `enabled` and `intensity`.

use serde::{Deserialize, Serialize};

use crate::surface::{SectionId, Stage, StyleTarget};

/// Degradation class of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectPriority {
    /// Never touched by performance adjustment
    Critical,
    /// Clamped under load, restored at `good`
    Standard,
    /// Disabled under load
    Luxury,
}

impl EffectPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectPriority::Critical => "critical",
            EffectPriority::Standard => "standard",
            EffectPriority::Luxury => "luxury",
        }
    }
}

/// Descriptor for one effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectConfig {
    /// Unique, stable identifier
    pub id: String,
    pub name: String,
    pub description: String,
    pub priority: EffectPriority,
    /// Whether the effect is currently on
    pub enabled: bool,
    /// 0..=100
    pub intensity: u8,
    /// Estimated per-frame cost (advisory)
    pub cost_ms: f64,
    /// Keyboard toggle
    pub shortcut: Option<char>,
    /// Why the effect exists, shown in settings UIs
    pub rationale: String,
    /// Suppressed when the user prefers reduced motion
    pub motion_sensitive: bool,
}

impl EffectConfig {
    /// Descriptor with defaults: standard, enabled, intensity 50, no shortcut
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            priority: EffectPriority::Standard,
            enabled: true,
            intensity: 50,
            cost_ms: 0.0,
            shortcut: None,
            rationale: String::new(),
            motion_sensitive: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: EffectPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity.min(100);
        self
    }

    pub fn cost_ms(mut self, cost_ms: f64) -> Self {
        self.cost_ms = cost_ms;
        self
    }

    pub fn shortcut(mut self, key: char) -> Self {
        self.shortcut = Some(key);
        self
    }

    pub fn rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn motion_sensitive(mut self, motion_sensitive: bool) -> Self {
        self.motion_sensitive = motion_sensitive;
        self
    }

    /// Whether `key` triggers this effect (case-insensitive)
    pub fn matches_shortcut(&self, key: char) -> bool {
        self.shortcut
            .is_some_and(|shortcut| shortcut.to_lowercase().eq(key.to_lowercase()))
    }
}

/// Enabled state and intensity an effect ships with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDefaults {
    pub enabled: bool,
    pub intensity: u8,
}

impl From<&EffectConfig> for EffectDefaults {
    fn from(config: &EffectConfig) -> Self {
        Self {
            enabled: config.enabled,
            intensity: config.intensity,
        }
    }
}

/// What `apply` / `remove` act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyTarget {
    /// Every section plus the root
    All,
    Section(SectionId),
}

impl ApplyTarget {
    /// Sections covered by this target
    pub fn sections(&self, stage: &Stage) -> Vec<SectionId> {
        match self {
            ApplyTarget::All => stage.surface.sections(),
            ApplyTarget::Section(id) => vec![id.clone()],
        }
    }

    /// Whether the root target is covered
    pub fn includes_root(&self) -> bool {
        matches!(self, ApplyTarget::All)
    }

    /// Style targets for the covered sections
    pub fn section_targets(&self, stage: &Stage) -> Vec<StyleTarget> {
        self.sections(stage).into_iter().map(StyleTarget::Section).collect()
    }
}
