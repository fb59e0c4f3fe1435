// Window state module
// Per-overlay state store: opacity, click-through flag and window size, with change notifications

use crate::config::{OverlayConfig, SizeBounds};
use crate::image_loader::ImageSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use std::fmt;

/// Window dimensions in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Areas of the overlay that can be hit by the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerRegion {
    /// The image surface
    Image,
    /// The status strip; always interactive
    ControlRegion,
}

/// Snapshot of one overlay window's state
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    pub opacity: f32,
    pub penetrable: bool,
    /// Last size the windowing service accepted, if any
    pub window_size: Option<Size>,
    pub image: ImageSource,
}

impl OverlayState {
    /// Whether pointer input over `region` belongs to this overlay.
    /// While penetrable, everything except the control region passes through.
    pub fn accepts_pointer(&self, region: PointerRegion) -> bool {
        match region {
            PointerRegion::ControlRegion => true,
            PointerRegion::Image => !self.penetrable,
        }
    }
}

/// Notifications delivered to subscribers of a [`WindowStateStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    /// Full state, sent first to a view that has just attached
    Snapshot(OverlayState),
    OpacityChanged(f32),
    PenetrableChanged(bool),
    WindowResized(Size),
    /// The overlay window closed; no further events follow
    Closed,
}

/// Single source of truth for one overlay window
pub struct WindowStateStore {
    state: OverlayState,
    min_opacity: f32,
    max_opacity: f32,
    subscribers: Vec<Sender<OverlayEvent>>,
}

impl WindowStateStore {
    /// Create the store for a freshly opened overlay
    pub fn new(image: ImageSource, config: &OverlayConfig) -> Self {
        Self {
            state: OverlayState {
                opacity: normalize_opacity(
                    config.initial_opacity.clamp(config.min_opacity, config.max_opacity),
                ),
                penetrable: false,
                window_size: None,
                image,
            },
            min_opacity: config.min_opacity,
            max_opacity: config.max_opacity,
            subscribers: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> OverlayState {
        self.state.clone()
    }

    pub fn opacity(&self) -> f32 {
        self.state.opacity
    }

    pub fn is_penetrable(&self) -> bool {
        self.state.penetrable
    }

    pub fn window_size(&self) -> Option<Size> {
        self.state.window_size
    }

    pub fn image(&self) -> &ImageSource {
        &self.state.image
    }

    /// Register a new listener
    pub fn subscribe(&mut self) -> Receiver<OverlayEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Register a listener whose first message is the current state
    pub fn subscribe_with_snapshot(&mut self) -> Receiver<OverlayEvent> {
        let (tx, rx) = unbounded();
        let _ = tx.send(OverlayEvent::Snapshot(self.snapshot()));
        self.subscribers.push(tx);
        rx
    }

    /// Adjust opacity by `delta`, clamped to the configured range. Returns the new value.
    pub fn set_opacity(&mut self, delta: f32) -> f32 {
        let clamped = (self.state.opacity + delta).clamp(self.min_opacity, self.max_opacity);
        let new_opacity = normalize_opacity(clamped);
        if (new_opacity - self.state.opacity).abs() > f32::EPSILON {
            self.state.opacity = new_opacity;
            debug!("Opacity set to {:.2}", new_opacity);
            self.emit(OverlayEvent::OpacityChanged(new_opacity));
        }
        self.state.opacity
    }

    /// Flip the click-through flag and return the new value
    pub fn toggle_penetrable(&mut self) -> bool {
        self.state.penetrable = !self.state.penetrable;
        let penetrable = self.state.penetrable;
        self.emit(OverlayEvent::PenetrableChanged(penetrable));
        penetrable
    }

    /// Force the click-through flag, e.g. to undo a toggle the OS rejected
    pub fn set_penetrable(&mut self, penetrable: bool) {
        if self.state.penetrable != penetrable {
            self.state.penetrable = penetrable;
            self.emit(OverlayEvent::PenetrableChanged(penetrable));
        }
    }

    /// Record a size the windowing service has applied
    pub fn set_window_size(&mut self, size: Size) {
        self.state.window_size = Some(size);
        self.emit(OverlayEvent::WindowResized(size));
    }

    /// Tell every subscriber the window is gone
    pub(crate) fn announce_closed(&mut self) {
        self.emit(OverlayEvent::Closed);
        self.subscribers.clear();
    }

    fn emit(&mut self, event: OverlayEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Fit an image into `fit_ratio` of the screen, preserving aspect ratio.
/// Images that already fit are returned unchanged.
pub fn compute_fitted_size(natural: Size, screen: Size, fit_ratio: f64) -> Size {
    let max_w = fit_ratio * screen.width as f64;
    let max_h = fit_ratio * screen.height as f64;
    let (w, h) = (natural.width as f64, natural.height as f64);

    if w <= max_w && h <= max_h {
        return natural;
    }

    let scale = (max_w / w).min(max_h / h);
    Size::new(
        ((w * scale).round() as u32).max(1),
        ((h * scale).round() as u32).max(1),
    )
}

/// Scale a window for one wheel notch. Positive `wheel_delta_y` shrinks.
///
/// Both axes share the factor but are clamped independently, so the aspect
/// ratio can drift once one axis hits a bound.
pub fn compute_zoomed_size(
    current: Size,
    wheel_delta_y: f64,
    bounds: &SizeBounds,
    zoom_out_factor: f64,
    zoom_in_factor: f64,
) -> Size {
    let factor = if wheel_delta_y > 0.0 {
        zoom_out_factor
    } else {
        zoom_in_factor
    };
    let width = (current.width as f64 * factor)
        .clamp(bounds.min.width as f64, bounds.max.width as f64)
        .round();
    let height = (current.height as f64 * factor)
        .clamp(bounds.min.height as f64, bounds.max.height as f64)
        .round();
    Size::new(width as u32, height as u32)
}

fn normalize_opacity(opacity: f32) -> f32 {
    (opacity * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> WindowStateStore {
        WindowStateStore::new(
            ImageSource::Uri("https://example.com/ref.png".to_string()),
            &OverlayConfig::default(),
        )
    }

    fn zoom(current: Size, delta: f64) -> Size {
        let config = OverlayConfig::default();
        compute_zoomed_size(
            current,
            delta,
            &config.bounds,
            config.zoom_out_factor,
            config.zoom_in_factor,
        )
    }

    #[test]
    fn opacity_stays_within_range_for_any_delta() {
        let mut store = store();
        for delta in [-5.0, -0.3, -0.1, 0.0, 0.05, 0.1, 0.7, 12.0, f32::MIN, f32::MAX] {
            let opacity = store.set_opacity(delta);
            assert!((0.1..=1.0).contains(&opacity), "delta {delta} gave {opacity}");
        }
    }

    #[test]
    fn opacity_reaches_both_bounds() {
        let mut store = store();
        for _ in 0..20 {
            store.set_opacity(-0.1);
        }
        assert!((store.opacity() - 0.1).abs() < 1e-6);
        for _ in 0..20 {
            store.set_opacity(0.1);
        }
        assert!((store.opacity() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opacity_steps_land_on_a_stable_grid() {
        let mut store = store();
        store.set_opacity(-0.1);
        store.set_opacity(-0.1);
        store.set_opacity(0.1);
        assert!((store.opacity() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn opacity_notifies_only_on_change() {
        let mut store = store();
        let rx = store.subscribe();
        store.set_opacity(0.1);
        store.set_opacity(1.0);
        store.set_opacity(0.1);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], OverlayEvent::OpacityChanged(v) if (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let mut store = store();
        let original = store.is_penetrable();
        assert_eq!(store.toggle_penetrable(), !original);
        assert_eq!(store.toggle_penetrable(), original);
    }

    #[test]
    fn toggle_notifies_with_new_value() {
        let mut store = store();
        let rx = store.subscribe();
        store.toggle_penetrable();
        assert_eq!(rx.try_recv().unwrap(), OverlayEvent::PenetrableChanged(true));
    }

    #[test]
    fn set_penetrable_is_silent_when_unchanged() {
        let mut store = store();
        let rx = store.subscribe();
        store.set_penetrable(false);
        assert!(rx.try_recv().is_err());
        store.set_penetrable(true);
        assert_eq!(rx.try_recv().unwrap(), OverlayEvent::PenetrableChanged(true));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = store();
        let rx = store.subscribe();
        drop(rx);
        let live = store.subscribe();
        store.toggle_penetrable();
        assert_eq!(store.subscribers.len(), 1);
        assert_eq!(live.try_recv().unwrap(), OverlayEvent::PenetrableChanged(true));
    }

    #[test]
    fn snapshot_subscription_starts_with_current_state() {
        let mut store = store();
        store.toggle_penetrable();
        let rx = store.subscribe_with_snapshot();
        match rx.try_recv().unwrap() {
            OverlayEvent::Snapshot(state) => assert!(state.penetrable),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn control_region_always_accepts_pointer() {
        let mut store = store();
        assert!(store.snapshot().accepts_pointer(PointerRegion::Image));
        store.toggle_penetrable();
        let state = store.snapshot();
        assert!(!state.accepts_pointer(PointerRegion::Image));
        assert!(state.accepts_pointer(PointerRegion::ControlRegion));
    }

    #[test]
    fn large_image_is_fitted_to_screen() {
        let fitted = compute_fitted_size(Size::new(4000, 3000), Size::new(1920, 1080), 0.8);
        assert_eq!(fitted, Size::new(1152, 864));
    }

    #[test]
    fn small_image_keeps_natural_size() {
        let fitted = compute_fitted_size(Size::new(800, 600), Size::new(1920, 1080), 0.8);
        assert_eq!(fitted, Size::new(800, 600));
    }

    #[test]
    fn wide_image_is_limited_by_width() {
        let fitted = compute_fitted_size(Size::new(3072, 100), Size::new(1920, 1080), 0.8);
        assert_eq!(fitted, Size::new(1536, 50));
    }

    #[test]
    fn wheel_down_shrinks_by_ten_percent() {
        assert_eq!(zoom(Size::new(1000, 800), 120.0), Size::new(900, 720));
    }

    #[test]
    fn wheel_up_grows_by_ten_percent() {
        assert_eq!(zoom(Size::new(1000, 800), -120.0), Size::new(1100, 880));
        assert_eq!(zoom(Size::new(1000, 800), 0.0), Size::new(1100, 880));
    }

    #[test]
    fn zoom_clamps_each_axis_independently() {
        assert_eq!(zoom(Size::new(3200, 100), 120.0), Size::new(2880, 150));
        assert_eq!(zoom(Size::new(2900, 1000), -120.0), Size::new(3000, 1100));
    }
}
