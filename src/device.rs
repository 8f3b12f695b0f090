//! Device capability detection
//!
//! Runs once at startup: scores hardware and platform signals, derives a
//! capability tier and recommends an effect preset. The result is cached
//! until [`DeviceCapabilityDetector::reset`].

use serde::{Deserialize, Serialize};

use crate::settings::Preset;

/// Environment variable a native host can set to request reduced motion
pub const REDUCED_MOTION_ENV: &str = "ADAPTIVE_EFFECTS_REDUCED_MOTION";

/// Viewports narrower than this count as mobile on touch devices
const MOBILE_VIEWPORT_WIDTH: u32 = 768;

const MOBILE_KEYWORDS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Read-only hardware and preference queries
pub trait DeviceProbe {
    /// Platform identification string
    fn user_agent(&self) -> String;

    /// Whether the primary input is touch
    fn has_touch(&self) -> bool;

    /// Viewport width in CSS pixels
    fn viewport_width(&self) -> u32;

    /// Approximate device memory in GB, if exposed
    fn memory_gb(&self) -> Option<f64>;

    /// Logical processor count, if exposed
    fn logical_cores(&self) -> Option<u32>;

    /// Whether an accelerated graphics context can be created
    fn accelerated_graphics(&self) -> bool;

    fn supports_backdrop_filter(&self) -> bool;

    fn supports_filter(&self) -> bool;

    /// Whether the user asked the platform to minimize motion
    fn prefers_reduced_motion(&self) -> bool;
}

/// Fixed probe values, deserializable for scripted hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticProbe {
    pub user_agent: String,
    pub has_touch: bool,
    pub viewport_width: u32,
    pub memory_gb: Option<f64>,
    pub logical_cores: Option<u32>,
    pub accelerated_graphics: bool,
    pub backdrop_filter: bool,
    pub filter: bool,
    pub prefers_reduced_motion: bool,
}

impl Default for StaticProbe {
    /// A capable desktop
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
            has_touch: false,
            viewport_width: 1920,
            memory_gb: Some(8.0),
            logical_cores: Some(8),
            accelerated_graphics: true,
            backdrop_filter: true,
            filter: true,
            prefers_reduced_motion: false,
        }
    }
}

impl DeviceProbe for StaticProbe {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn has_touch(&self) -> bool {
        self.has_touch
    }

    fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    fn memory_gb(&self) -> Option<f64> {
        self.memory_gb
    }

    fn logical_cores(&self) -> Option<u32> {
        self.logical_cores
    }

    fn accelerated_graphics(&self) -> bool {
        self.accelerated_graphics
    }

    fn supports_backdrop_filter(&self) -> bool {
        self.backdrop_filter
    }

    fn supports_filter(&self) -> bool {
        self.filter
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.prefers_reduced_motion
    }
}

/// Probe for native hosts
///
/// Core count comes from the OS; memory is not exposed; the compositor is
/// assumed to support filters. Reduced motion is read from
/// `ADAPTIVE_EFFECTS_REDUCED_MOTION`.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe;

impl DeviceProbe for SystemProbe {
    fn user_agent(&self) -> String {
        format!("{}/{} ({})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), std::env::consts::OS)
    }

    fn has_touch(&self) -> bool {
        false
    }

    fn viewport_width(&self) -> u32 {
        1920
    }

    fn memory_gb(&self) -> Option<f64> {
        None
    }

    fn logical_cores(&self) -> Option<u32> {
        std::thread::available_parallelism()
            .ok()
            .and_then(|n| u32::try_from(n.get()).ok())
    }

    fn accelerated_graphics(&self) -> bool {
        true
    }

    fn supports_backdrop_filter(&self) -> bool {
        true
    }

    fn supports_filter(&self) -> bool {
        true
    }

    fn prefers_reduced_motion(&self) -> bool {
        std::env::var(REDUCED_MOTION_ENV)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "reduce"))
            .unwrap_or(false)
    }
}

/// Device capability tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    High,
    Medium,
    Low,
}

impl DeviceTier {
    /// Tier for a capability score
    pub fn from_score(score: i32) -> Self {
        if score >= 8 {
            Self::High
        } else if score >= 5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detected capabilities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCapabilities {
    pub tier: DeviceTier,
    pub is_mobile: bool,
    pub memory_gb: Option<f64>,
    pub cores: u32,
    pub accelerated_graphics: bool,
    pub backdrop_filter: bool,
    pub css_filter: bool,
    pub prefers_reduced_motion: bool,
    /// Raw capability score the tier was derived from
    pub score: i32,
}

/// Preset recommendation for the detected device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecommendedSettings {
    pub preset: Preset,
    /// Advisory cap on simultaneously active effects
    pub max_simultaneous_effects: usize,
}

/// Scores the probe once and caches the result
pub struct DeviceCapabilityDetector {
    probe: Box<dyn DeviceProbe>,
    cached: Option<DeviceCapabilities>,
}

impl DeviceCapabilityDetector {
    pub fn new(probe: Box<dyn DeviceProbe>) -> Self {
        Self { probe, cached: None }
    }

    /// Detected capabilities, computed on first use
    pub fn capabilities(&mut self) -> &DeviceCapabilities {
        let probe = &self.probe;
        self.cached.get_or_insert_with(|| {
            let caps = detect(probe.as_ref());
            tracing::info!(
                target: "adaptive_effects::device",
                tier = %caps.tier,
                score = caps.score,
                mobile = caps.is_mobile,
                cores = caps.cores,
                reduced_motion = caps.prefers_reduced_motion,
                "Device capabilities detected"
            );
            caps
        })
    }

    /// Recommended preset and effect cap for this device
    pub fn recommended_settings(&mut self) -> RecommendedSettings {
        recommend(self.capabilities())
    }

    /// Drop the cached result; the next query re-detects
    pub fn reset(&mut self) {
        self.cached = None;
    }
}

impl std::fmt::Debug for DeviceCapabilityDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCapabilityDetector")
            .field("cached", &self.cached)
            .finish()
    }
}

/// Mobile heuristic: keyword match, or a narrow touch viewport
pub fn is_mobile(user_agent: &str, has_touch: bool, viewport_width: u32) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_KEYWORDS.iter().any(|keyword| ua.contains(keyword))
        || (has_touch && viewport_width < MOBILE_VIEWPORT_WIDTH)
}

fn detect(probe: &dyn DeviceProbe) -> DeviceCapabilities {
    let is_mobile = is_mobile(&probe.user_agent(), probe.has_touch(), probe.viewport_width());
    let memory_gb = probe.memory_gb();
    let cores = probe.logical_cores().unwrap_or(2);
    let accelerated_graphics = probe.accelerated_graphics();
    let backdrop_filter = probe.supports_backdrop_filter();
    let css_filter = probe.supports_filter();

    let memory_score = match memory_gb {
        Some(gb) if gb >= 8.0 => 3,
        Some(gb) if gb >= 4.0 => 2,
        Some(_) => 1,
        None => 2,
    };
    let core_score = match cores {
        c if c >= 8 => 3,
        c if c >= 4 => 2,
        _ => 1,
    };
    let feature_score = [accelerated_graphics, backdrop_filter, css_filter]
        .iter()
        .filter(|&&supported| supported)
        .count() as i32;
    let score = memory_score + core_score + feature_score - if is_mobile { 2 } else { 0 };

    DeviceCapabilities {
        tier: DeviceTier::from_score(score),
        is_mobile,
        memory_gb,
        cores,
        accelerated_graphics,
        backdrop_filter,
        css_filter,
        prefers_reduced_motion: probe.prefers_reduced_motion(),
        score,
    }
}

fn recommend(caps: &DeviceCapabilities) -> RecommendedSettings {
    if caps.prefers_reduced_motion {
        return RecommendedSettings {
            preset: Preset::Minimal,
            max_simultaneous_effects: 1,
        };
    }
    let (preset, max_simultaneous_effects) = match caps.tier {
        DeviceTier::High => (Preset::Full, 5),
        DeviceTier::Medium => (Preset::Balanced, 3),
        DeviceTier::Low => (Preset::Minimal, 2),
    };
    RecommendedSettings {
        preset,
        max_simultaneous_effects,
    }
}
