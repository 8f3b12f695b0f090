//! Adaptive Effects - headless demo host
//!
//! Drives the effects runtime against an in-memory surface at display rate
//! for a few seconds, moving focus and scroll velocity so the effects have
//! something to react to, then logs the final state.

use std::rc::Rc;
use std::time::Duration;

use adaptive_effects::telemetry::{init_logging, LogConfig};
use adaptive_effects::{
    EffectsRuntime, FileStore, MemoryStore, MemorySurface, PreferenceStore, RuntimeSettings, Stage, SystemFrameHost,
    SystemProbe,
};

const SECTIONS: [&str; 4] = ["hero", "work", "about", "contact"];
const RUN_FOR_MS: f64 = 5_000.0;
const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

fn main() {
    let _log_guard = match init_logging(&LogConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let settings = RuntimeSettings::load();
    let store: Box<dyn PreferenceStore> = match FileStore::in_config_dir() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "Preferences will not be saved");
            Box::new(MemoryStore::new())
        }
    };

    let surface = Rc::new(MemorySurface::new(SECTIONS));
    let mut runtime = EffectsRuntime::new(
        Box::new(SystemFrameHost::new()),
        Box::new(SystemProbe),
        store,
        Stage::from_memory(&surface),
        settings,
    );
    runtime.initialize();

    let start = runtime.scheduler().now_ms();
    while runtime.scheduler().is_clock_running() {
        let now = runtime.scheduler().now_ms();
        let elapsed = now - start;
        if elapsed >= RUN_FOR_MS {
            break;
        }

        // Dwell on each section for a second, scrolling in between.
        let section = (elapsed / 1000.0) as usize % SECTIONS.len();
        surface.set_focused(Some(SECTIONS[section]));
        let phase = (elapsed % 1000.0) / 1000.0;
        surface.set_scroll_velocity(if phase > 0.8 { 3.0 } else { 0.0 });

        runtime.tick(now);
        std::thread::sleep(FRAME_INTERVAL);
    }

    {
        let manager = runtime.manager();
        let state = manager.state();
        let metrics = runtime.monitor().metrics();
        tracing::info!(
            active = ?state.active,
            performance_tier = %state.performance_tier,
            device_tier = %state.device_tier,
            fps = metrics.fps,
            styles = surface.style_count(),
            cost_ms = manager.estimated_cost_ms(),
            "Demo finished"
        );
        let scheduler = runtime.scheduler().metrics();
        tracing::info!(
            frames = scheduler.frame_count,
            dropped = scheduler.dropped_frames,
            overruns = scheduler.budget_overruns,
            "Scheduler summary"
        );
    }

    runtime.shutdown();
}
