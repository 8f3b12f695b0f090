//! Effects manager events
//!
//! Listeners subscribe per event kind and are called synchronously in
//! registration order. A failing or panicking listener is logged and does
//! not stop its siblings.

use std::panic::{self, AssertUnwindSafe};

use crate::error::{panic_message, CallbackError};
use crate::settings::Preset;
use crate::telemetry::PerformanceTier;

/// Something observable happened in the effects manager
#[derive(Debug, Clone, PartialEq)]
pub enum EffectsEvent {
    EffectEnabled { id: String },
    EffectDisabled { id: String },
    IntensityChanged { id: String, intensity: u8 },
    /// Entered `fair` or `poor`
    PerformanceDegradation { tier: PerformanceTier, previous: PerformanceTier },
    /// Left `fair`/`poor` for `good` or `excellent`
    PerformanceRecovery { tier: PerformanceTier, previous: PerformanceTier },
    PresetChanged { preset: Preset },
}

impl EffectsEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EffectsEvent::EffectEnabled { .. } => EventKind::EffectEnabled,
            EffectsEvent::EffectDisabled { .. } => EventKind::EffectDisabled,
            EffectsEvent::IntensityChanged { .. } => EventKind::IntensityChanged,
            EffectsEvent::PerformanceDegradation { .. } => EventKind::PerformanceDegradation,
            EffectsEvent::PerformanceRecovery { .. } => EventKind::PerformanceRecovery,
            EffectsEvent::PresetChanged { .. } => EventKind::PresetChanged,
        }
    }
}

/// Discriminant used to subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EffectEnabled,
    EffectDisabled,
    IntensityChanged,
    PerformanceDegradation,
    PerformanceRecovery,
    PresetChanged,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::EffectEnabled => "effect-enabled",
            EventKind::EffectDisabled => "effect-disabled",
            EventKind::IntensityChanged => "intensity-changed",
            EventKind::PerformanceDegradation => "performance-degradation",
            EventKind::PerformanceRecovery => "performance-recovery",
            EventKind::PresetChanged => "preset-changed",
        }
    }
}

/// Handle for [`EventBus::off`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event listener
pub type EventListener = Box<dyn FnMut(&EffectsEvent) -> Result<(), CallbackError>>;

/// Per-kind synchronous dispatch
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, EventKind, EventListener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EffectsEvent) -> Result<(), CallbackError> + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, ..)| *listener != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Dispatch to every listener of the event's kind
    pub fn emit(&mut self, event: &EffectsEvent) {
        let kind = event.kind();
        for (_, _, listener) in self.listeners.iter_mut().filter(|entry| entry.1 == kind) {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        target: "adaptive_effects::events",
                        event = kind.as_str(),
                        error = %err,
                        "Event listener failed"
                    );
                }
                Err(payload) => {
                    tracing::error!(
                        target: "adaptive_effects::events",
                        event = kind.as_str(),
                        panic = %panic_message(payload.as_ref()),
                        "Event listener panicked"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
