//! Runtime composition root
//!
//! Builds exactly one scheduler, detector, monitor and manager and wires
//! them together: detection seeds the manager, the monitor samples frames
//! through the scheduler, and tier changes flow back into the manager.
//!
//! The host drives everything by calling [`EffectsRuntime::tick`] once per
//! display refresh while the scheduler's clock is running.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::device::{DeviceCapabilities, DeviceCapabilityDetector, DeviceProbe};
use crate::effects::builtin::register_builtin_effects;
use crate::effects::EffectsManager;
use crate::host::FrameHost;
use crate::scheduler::FrameScheduler;
use crate::settings::{PreferenceStore, RuntimeSettings};
use crate::surface::Stage;
use crate::telemetry::PerformanceMonitor;

/// Owns and connects the four components
pub struct EffectsRuntime {
    settings: RuntimeSettings,
    scheduler: FrameScheduler,
    detector: DeviceCapabilityDetector,
    monitor: PerformanceMonitor,
    manager: Rc<RefCell<EffectsManager>>,
    stage: Stage,
    page_visible: bool,
    initialized: bool,
}

impl EffectsRuntime {
    /// Construct the components; nothing runs until [`initialize`](Self::initialize)
    pub fn new(
        host: Box<dyn FrameHost>,
        probe: Box<dyn DeviceProbe>,
        store: Box<dyn PreferenceStore>,
        stage: Stage,
        settings: RuntimeSettings,
    ) -> Self {
        let scheduler = FrameScheduler::new(host, settings.frame_budget_ms);
        let monitor = PerformanceMonitor::new(settings.monitor_interval_ms, settings.sample_window);
        let manager = EffectsManager::new(store, settings.storage_key.clone());

        Self {
            settings,
            scheduler,
            detector: DeviceCapabilityDetector::new(probe),
            monitor,
            manager: Rc::new(RefCell::new(manager)),
            stage,
            page_visible: true,
            initialized: false,
        }
    }

    /// Detect the device, register the built-in effects and start monitoring
    ///
    /// On first run (no stored preferences) the device's recommended preset is
    /// applied and saved. Calling this twice is a no-op.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let caps = self.detector.capabilities().clone();
        let recommended = self.detector.recommended_settings();

        {
            let mut manager = self.manager.borrow_mut();
            manager.apply_device_profile(&caps, &recommended);
            let first_run = !manager.has_stored_preferences();
            register_builtin_effects(&mut manager, &self.stage, &self.scheduler);
            if first_run {
                manager.apply_preset(recommended.preset);
            }
        }

        let manager: Weak<RefCell<EffectsManager>> = Rc::downgrade(&self.manager);
        self.monitor.set_tier_listener(move |tier, _previous| {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            let borrowed = manager.try_borrow_mut();
            match borrowed {
                Ok(mut manager) => manager.update_performance_tier(tier),
                Err(_) => {
                    tracing::warn!(
                        target: "adaptive_effects::runtime",
                        tier = %tier,
                        "Effects manager busy; tier change dropped"
                    );
                }
            };
        });

        if self.page_visible || !self.settings.visibility_pauses_monitor {
            self.monitor.start(&self.scheduler);
        }

        tracing::info!(
            target: "adaptive_effects::runtime",
            device_tier = %caps.tier,
            preset = %recommended.preset,
            active = self.manager.borrow().state().active.len(),
            "Effects runtime initialized"
        );
    }

    /// Run one frame
    pub fn tick(&self, timestamp: f64) {
        self.scheduler.tick(timestamp);
    }

    /// Page or window visibility changed
    pub fn set_page_visible(&mut self, visible: bool) {
        if self.page_visible == visible {
            return;
        }
        self.page_visible = visible;
        self.manager.borrow_mut().set_page_visible(visible);

        if self.initialized && self.settings.visibility_pauses_monitor {
            if visible {
                self.monitor.start(&self.scheduler);
            } else {
                self.monitor.stop();
            }
        }
    }

    /// Stop monitoring and clean up every effect
    pub fn shutdown(&mut self) {
        self.monitor.stop();
        self.manager.borrow_mut().shutdown();
        self.initialized = false;
        tracing::info!(target: "adaptive_effects::runtime", "Effects runtime shut down");
    }

    pub fn manager(&self) -> Ref<'_, EffectsManager> {
        self.manager.borrow()
    }

    pub fn manager_mut(&self) -> RefMut<'_, EffectsManager> {
        self.manager.borrow_mut()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn capabilities(&mut self) -> &DeviceCapabilities {
        self.detector.capabilities()
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn is_page_visible(&self) -> bool {
        self.page_visible
    }
}

impl std::fmt::Debug for EffectsRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsRuntime")
            .field("scheduler", &self.scheduler)
            .field("monitor", &self.monitor)
            .field("page_visible", &self.page_visible)
            .field("initialized", &self.initialized)
            .finish()
    }
}
