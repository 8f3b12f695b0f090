//! Settings management
//!
//! Persisted effect preferences (the user's preset and per-effect overrides),
//! the key-value stores they live in, and the runtime tuning file read from
//! the config directory.

use serde::{Deserialize, Deserializer, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Directory under the platform config dir
pub const CONFIG_DIR_NAME: &str = "AdaptiveEffects";

/// Fixed key addressing the preference document
pub const DEFAULT_STORAGE_KEY: &str = "adaptive-effects.preferences";

/// Named effect profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Luxury effects off, everything at 30
    Minimal,
    /// Everything at 60, enable state untouched
    #[default]
    Balanced,
    /// Everything on at 100
    Full,
    /// Hand-tuned; recorded only
    Custom,
}

impl Preset {
    /// Intensity the preset applies to every effect, if any
    pub fn intensity(self) -> Option<u8> {
        match self {
            Preset::Minimal => Some(30),
            Preset::Balanced => Some(60),
            Preset::Full => Some(100),
            Preset::Custom => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Minimal => "minimal",
            Preset::Balanced => "balanced",
            Preset::Full => "full",
            Preset::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User override for one effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectOverride {
    pub enabled: bool,
    #[serde(deserialize_with = "deserialize_intensity")]
    pub intensity: u8,
}

/// Accept any integer and clamp it into 0..=100
fn deserialize_intensity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, 100) as u8)
}

/// Persisted preference document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectsPreferences {
    pub preset: Preset,
    /// Per-effect overrides keyed by effect id
    pub effects: BTreeMap<String, EffectOverride>,
    pub respect_reduced_motion: bool,
    pub auto_performance_adjust: bool,
}

impl Default for EffectsPreferences {
    fn default() -> Self {
        Self {
            preset: Preset::Balanced,
            effects: BTreeMap::new(),
            respect_reduced_motion: true,
            auto_performance_adjust: true,
        }
    }
}

impl EffectsPreferences {
    /// Load the document stored under `key`
    ///
    /// Never fails. `None` means nothing usable is stored (absent or
    /// unreadable); a malformed document yields the defaults.
    pub fn load(store: &dyn PreferenceStore, key: &str) -> Option<Self> {
        let raw = match store.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(target: "adaptive_effects::settings", key, error = %e, "Failed to read preferences; using defaults");
                return None;
            }
        };

        match serde_json::from_str::<Self>(&raw) {
            Ok(mut prefs) => {
                prefs.clamp();
                Some(prefs)
            }
            Err(e) => {
                tracing::warn!(target: "adaptive_effects::settings", key, error = %e, "Malformed preferences; using defaults");
                Some(Self::default())
            }
        }
    }

    /// Write the whole document under `key`
    pub fn save(&self, store: &dyn PreferenceStore, key: &str) -> Result<(), StoreError> {
        let json = serde_json::to_string(self).map_err(StoreError::Json)?;
        store.write(key, &json)
    }

    /// Override for `id`, if the user set one
    pub fn effect(&self, id: &str) -> Option<&EffectOverride> {
        self.effects.get(id)
    }

    /// Clamp intensities to 0..=100
    pub fn clamp(&mut self) {
        for entry in self.effects.values_mut() {
            entry.intensity = entry.intensity.min(100);
        }
    }
}

/// Key-value store for preference documents
pub trait PreferenceStore {
    /// Stored value, `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value under `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the value; absent keys are not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store; clones share contents
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl PreferenceStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// File-backed store writing `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under `<config_dir>/AdaptiveEffects`
    pub fn in_config_dir() -> Result<Self, StoreError> {
        config_dir().map(Self::new).ok_or(StoreError::NoConfigDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl PreferenceStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(StoreError::Io)?;

        // Write-then-rename so a crash never leaves a truncated document.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(StoreError::Io)?;
        fs::rename(&tmp, &path).map_err(StoreError::Io)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Runtime tuning (`runtime.json` in the config directory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Per-tick scheduler budget
    pub frame_budget_ms: f64,
    /// Performance evaluation interval
    pub monitor_interval_ms: f64,
    /// Rolling window size in frames
    pub sample_window: usize,
    /// Preference document key
    pub storage_key: String,
    /// Stop the monitor while the page is hidden
    pub visibility_pauses_monitor: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            frame_budget_ms: 16.0,
            monitor_interval_ms: 1000.0,
            sample_window: 60,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            visibility_pauses_monitor: true,
        }
    }
}

impl RuntimeSettings {
    /// Load from the config directory; missing or invalid files yield defaults
    pub fn load() -> Self {
        let Some(path) = config_dir().map(|dir| dir.join("runtime.json")) else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(target: "adaptive_effects::settings", path = %path.display(), error = %e, "Invalid runtime settings; using defaults");
                Self::default()
            }
        }
    }

    /// Load and clamp a settings file
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let contents = fs::read_to_string(path).map_err(StoreError::Io)?;
        let mut settings: Self = serde_json::from_str(&contents).map_err(StoreError::Json)?;
        settings.clamp();
        Ok(settings)
    }

    /// Keep values in workable ranges
    pub fn clamp(&mut self) {
        self.frame_budget_ms = if self.frame_budget_ms.is_finite() {
            self.frame_budget_ms.clamp(4.0, 100.0)
        } else {
            16.0
        };
        self.monitor_interval_ms = if self.monitor_interval_ms.is_finite() {
            self.monitor_interval_ms.clamp(100.0, 10_000.0)
        } else {
            1000.0
        };
        self.sample_window = self.sample_window.clamp(10, 600);
        if self.storage_key.trim().is_empty() {
            self.storage_key = DEFAULT_STORAGE_KEY.to_string();
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push(CONFIG_DIR_NAME);
        p
    })
}

/// Persistence error
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NoConfigDir,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Json(e) => write!(f, "JSON error: {}", e),
            StoreError::NoConfigDir => write!(f, "Could not find config directory"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Json(e) => Some(e),
            StoreError::NoConfigDir => None,
        }
    }
}
