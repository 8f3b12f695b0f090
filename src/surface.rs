//! Rendering surface abstraction
//!
//! The only coupling between effects and the view layer. Effects read the
//! section list, the focused section and the scroll velocity, and write typed
//! style entries keyed by their own effect id. Writing the same key again
//! overwrites, so re-applying an effect never accumulates.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Identifier of a content section
pub type SectionId = String;

/// Handle returned by [`FocusedSectionProvider::watch_focus`]
pub type WatchId = u64;

/// Focus change listener
pub type FocusListener = Rc<dyn Fn(Option<SectionId>)>;

/// A single filter stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    /// Gaussian blur radius in px
    Blur(f64),
    /// Multiplier, 1.0 is identity
    Brightness(f64),
    /// Multiplier, 1.0 is identity
    Contrast(f64),
    /// Multiplier, 1.0 is identity
    Saturate(f64),
    /// Degrees
    HueRotate(f64),
    /// 0..=1
    Sepia(f64),
}

/// Style an effect writes to a target
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceStyle {
    /// Filter chain applied in order
    Filter(Vec<FilterOp>),
    /// Darkened edges
    Vignette { opacity: f64, spread: f64 },
    /// Offset color channels
    ChannelSplit { offset_px: f64, opacity: f64 },
}

/// Where a style is written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleTarget {
    /// The whole viewport
    Root,
    Section(SectionId),
}

/// Writable view surface
pub trait RenderSurface {
    /// Sections currently on the page, in document order
    fn sections(&self) -> Vec<SectionId>;

    /// Set (or overwrite) the style `effect_id` contributes to `target`
    fn set_style(&self, target: &StyleTarget, effect_id: &str, style: SurfaceStyle);

    /// Clear the style `effect_id` contributes to `target`
    fn clear_style(&self, target: &StyleTarget, effect_id: &str);
}

/// Source of the section currently in focus
pub trait FocusedSectionProvider {
    fn focused_section(&self) -> Option<SectionId>;

    /// Register a listener called on every focus change
    fn watch_focus(&self, listener: FocusListener) -> WatchId;

    fn unwatch_focus(&self, id: WatchId);
}

/// Source of scroll motion
pub trait MotionSource {
    /// Scroll velocity in px per ms, signed
    fn scroll_velocity(&self) -> f64;
}

/// View-layer collaborators handed to each effect
#[derive(Clone)]
pub struct Stage {
    pub surface: Rc<dyn RenderSurface>,
    pub focus: Rc<dyn FocusedSectionProvider>,
    pub motion: Rc<dyn MotionSource>,
}

impl Stage {
    pub fn new(
        surface: Rc<dyn RenderSurface>,
        focus: Rc<dyn FocusedSectionProvider>,
        motion: Rc<dyn MotionSource>,
    ) -> Self {
        Self { surface, focus, motion }
    }

    /// Stage whose three roles are served by one [`MemorySurface`]
    pub fn from_memory(surface: &Rc<MemorySurface>) -> Self {
        Self {
            surface: Rc::clone(surface) as Rc<dyn RenderSurface>,
            focus: Rc::clone(surface) as Rc<dyn FocusedSectionProvider>,
            motion: Rc::clone(surface) as Rc<dyn MotionSource>,
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").finish_non_exhaustive()
    }
}

/// In-memory surface for headless hosts and tests
#[derive(Default)]
pub struct MemorySurface {
    sections: RefCell<Vec<SectionId>>,
    styles: RefCell<HashMap<(StyleTarget, String), SurfaceStyle>>,
    focused: RefCell<Option<SectionId>>,
    watchers: RefCell<Vec<(WatchId, FocusListener)>>,
    next_watch: Cell<WatchId>,
    velocity: Cell<f64>,
}

impl MemorySurface {
    /// Surface with the given sections and no focus
    pub fn new<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SectionId>,
    {
        Self {
            sections: RefCell::new(sections.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Move focus and notify watchers
    pub fn set_focused(&self, section: Option<&str>) {
        let section = section.map(str::to_string);
        if *self.focused.borrow() == section {
            return;
        }
        *self.focused.borrow_mut() = section.clone();

        // Listeners may restyle the surface or (un)watch.
        let listeners: Vec<FocusListener> = self.watchers.borrow().iter().map(|(_, l)| Rc::clone(l)).collect();
        for listener in listeners {
            listener(section.clone());
        }
    }

    pub fn set_scroll_velocity(&self, px_per_ms: f64) {
        self.velocity.set(px_per_ms);
    }

    /// Style `effect_id` currently contributes to `target`
    pub fn style(&self, target: &StyleTarget, effect_id: &str) -> Option<SurfaceStyle> {
        self.styles
            .borrow()
            .get(&(target.clone(), effect_id.to_string()))
            .cloned()
    }

    /// Number of targets `effect_id` currently styles
    pub fn styled_count(&self, effect_id: &str) -> usize {
        self.styles.borrow().keys().filter(|(_, id)| id == effect_id).count()
    }

    /// Total style entries on the surface
    pub fn style_count(&self) -> usize {
        self.styles.borrow().len()
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }
}

impl RenderSurface for MemorySurface {
    fn sections(&self) -> Vec<SectionId> {
        self.sections.borrow().clone()
    }

    fn set_style(&self, target: &StyleTarget, effect_id: &str, style: SurfaceStyle) {
        self.styles
            .borrow_mut()
            .insert((target.clone(), effect_id.to_string()), style);
    }

    fn clear_style(&self, target: &StyleTarget, effect_id: &str) {
        self.styles
            .borrow_mut()
            .remove(&(target.clone(), effect_id.to_string()));
    }
}

impl FocusedSectionProvider for MemorySurface {
    fn focused_section(&self) -> Option<SectionId> {
        self.focused.borrow().clone()
    }

    fn watch_focus(&self, listener: FocusListener) -> WatchId {
        let id = self.next_watch.get();
        self.next_watch.set(id + 1);
        self.watchers.borrow_mut().push((id, listener));
        id
    }

    fn unwatch_focus(&self, id: WatchId) {
        self.watchers.borrow_mut().retain(|(watch, _)| *watch != id);
    }
}

impl MotionSource for MemorySurface {
    fn scroll_velocity(&self) -> f64 {
        self.velocity.get()
    }
}
