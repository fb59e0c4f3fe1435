// Overlay controller module
// Sequences state store mutations and windowing-service calls for each user action

use crate::config::OverlayConfig;
use crate::image_loader::ImageSource;
use crate::intent::{self, Intent, OpacityDirection, ViewEvent};
use crate::state::{
    compute_fitted_size, compute_zoomed_size, OverlayEvent, OverlayState, Size, WindowStateStore,
};
use crate::windowing::{OverlayRequest, WindowHandle, WindowingError, WindowingService};
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use std::cell::{Cell, RefCell};
use thiserror::Error;

/// Lifecycle of the overlay window driven by a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Opening,
    Open,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error(transparent)]
    Windowing(#[from] WindowingError),

    #[error("no overlay window is open")]
    NotOpen,

    #[error("an overlay window is already open")]
    AlreadyOpen,

    #[error("failed to close overlay ({primary}); direct close also failed ({fallback})")]
    CloseFailed {
        primary: WindowingError,
        fallback: WindowingError,
    },
}

/// State that only exists while a window is open
struct Session {
    handle: WindowHandle,
    store: WindowStateStore,
    view_ready: bool,
    /// Click-through as last confirmed by the windowing service
    click_through: bool,
    /// Click-through calls issued but not yet finished
    pending_click_through: u32,
}

/// Owns one overlay window at a time.
///
/// All methods take `&self`: several actions can be in flight at once, each
/// suspended on its own windowing-service call. Store mutations happen
/// synchronously before any call is awaited, so same-field actions keep the
/// order they arrived in.
pub struct OverlayController<W> {
    service: W,
    config: OverlayConfig,
    phase: Cell<Phase>,
    session: RefCell<Option<Session>>,
}

impl<W: WindowingService> OverlayController<W> {
    pub fn new(service: W, config: OverlayConfig) -> Self {
        Self {
            service,
            config,
            phase: Cell::new(Phase::Closed),
            session: RefCell::new(None),
        }
    }

    pub fn service(&self) -> &W {
        &self.service
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn handle(&self) -> Option<WindowHandle> {
        self.session.borrow().as_ref().map(|s| s.handle)
    }

    /// Current state of the open overlay
    pub fn snapshot(&self) -> Option<OverlayState> {
        self.session.borrow().as_ref().map(|s| s.store.snapshot())
    }

    pub fn is_view_ready(&self) -> bool {
        self.session.borrow().as_ref().is_some_and(|s| s.view_ready)
    }

    /// Listen for state changes of the open overlay
    pub fn subscribe(&self) -> Result<Receiver<OverlayEvent>, OverlayError> {
        self.with_session(|s| s.store.subscribe())
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Result<T, OverlayError> {
        let mut session = self.session.borrow_mut();
        session.as_mut().map(f).ok_or(OverlayError::NotOpen)
    }

    /// Create the overlay window for `image`
    pub async fn open(&self, image: ImageSource) -> Result<WindowHandle, OverlayError> {
        if self.phase.get() != Phase::Closed {
            warn!("Ignoring open request for {}: overlay already {:?}", image, self.phase.get());
            return Err(OverlayError::AlreadyOpen);
        }

        self.phase.set(Phase::Opening);
        let request = OverlayRequest::new(image);
        debug!("Creating overlay window with {}", request.startup_url);

        match self.service.create_overlay_window(&request).await {
            Ok(handle) => {
                let store = WindowStateStore::new(request.image, &self.config);
                info!("Overlay {} open with {}", handle, store.image());
                *self.session.borrow_mut() = Some(Session {
                    handle,
                    store,
                    view_ready: false,
                    click_through: false,
                    pending_click_through: 0,
                });
                self.phase.set(Phase::Open);
                Ok(handle)
            }
            Err(e) => {
                error!("Failed to create overlay window: {}", e);
                self.phase.set(Phase::Closed);
                Err(e.into())
            }
        }
    }

    /// The view has rendered. Returns its subscription, starting with a snapshot.
    pub fn view_ready(&self) -> Result<Receiver<OverlayEvent>, OverlayError> {
        self.with_session(|s| {
            if s.view_ready {
                debug!("View for {} attached again", s.handle);
            }
            s.view_ready = true;
            s.store.subscribe_with_snapshot()
        })
    }

    /// Route a raw view event. Events arriving before the view is ready are dropped.
    pub async fn handle_view_event(&self, event: ViewEvent) -> Result<(), OverlayError> {
        let state = self.with_session(|s| s.view_ready.then(|| s.store.snapshot()))?;
        let Some(state) = state else {
            debug!("View not ready, dropping {:?}", event);
            return Ok(());
        };

        match intent::route(&event, &state) {
            Some(intent) => self.dispatch(intent).await,
            None => {
                debug!("No action for {:?}", event);
                Ok(())
            }
        }
    }

    pub async fn dispatch(&self, intent: Intent) -> Result<(), OverlayError> {
        match intent {
            Intent::ImageLoaded { natural, screen } => {
                self.image_loaded(natural, screen).await.map(|_| ())
            }
            Intent::TogglePenetrable => self.toggle_penetrable().await.map(|_| ()),
            Intent::Zoom { wheel_delta_y } => self.zoom(wheel_delta_y).await.map(|_| ()),
            Intent::AdjustOpacity(direction) => self.adjust_opacity(direction).map(|_| ()),
            Intent::CloseRequested => self.close().await,
        }
    }

    /// Fit the window to a freshly decoded image and center it.
    ///
    /// Windowing failures are absorbed: the window keeps its previous size and
    /// `Ok(None)` is returned.
    pub async fn image_loaded(
        &self,
        natural: Size,
        screen: Size,
    ) -> Result<Option<Size>, OverlayError> {
        let handle = self.with_session(|s| s.handle)?;
        let fitted = compute_fitted_size(natural, screen, self.config.fit_ratio);
        debug!("Image {} on screen {} fits as {}", natural, screen, fitted);

        if let Err(e) = self.service.resize(handle, fitted).await {
            warn!("Failed to resize window to fit image: {}", e);
            return Ok(None);
        }
        // The window may have closed while the resize was pending
        let _ = self.with_session(|s| {
            if s.handle == handle {
                s.store.set_window_size(fitted);
            }
        });

        if let Err(e) = self.service.center(handle).await {
            warn!("Failed to center window: {}", e);
        }
        info!("Window fitted to {}", fitted);
        Ok(Some(fitted))
    }

    /// Flip click-through mode. Returns the new value.
    ///
    /// Calls may finish in any order. Once the last pending one has settled,
    /// the flag is brought back in line with the click-through state the
    /// service actually holds: a failure falls back to the last confirmed
    /// value, a late success of an older toggle gets the newest value re-sent.
    pub async fn toggle_penetrable(&self) -> Result<bool, OverlayError> {
        let (handle, penetrable) = self.with_session(|s| {
            s.pending_click_through += 1;
            (s.handle, s.store.toggle_penetrable())
        })?;
        info!("Penetrable mode {}", if penetrable { "enabled" } else { "disabled" });

        let result = self.service.set_click_through(handle, penetrable).await;
        if let Err(e) = &result {
            error!("Failed to set click-through to {}: {}", penetrable, e);
        }

        let mut outcome = result.is_ok();
        let mut requested = penetrable;
        while let Some(target) = self.settle_click_through(handle, requested, outcome) {
            warn!(
                "Click-through left at {} by an earlier toggle, re-applying {}",
                requested, target
            );
            requested = target;
            outcome = match self.service.set_click_through(handle, target).await {
                Ok(()) => true,
                Err(e) => {
                    error!("Failed to re-apply click-through {}: {}", target, e);
                    false
                }
            };
        }

        result.map(|()| penetrable).map_err(OverlayError::from)
    }

    /// Record a finished click-through call. Returns a value to re-send when
    /// the service ended up away from the flag with nothing else pending.
    fn settle_click_through(
        &self,
        handle: WindowHandle,
        requested: bool,
        ok: bool,
    ) -> Option<bool> {
        self.with_session(|s| {
            if s.handle != handle {
                return None;
            }
            s.pending_click_through = s.pending_click_through.saturating_sub(1);
            if ok {
                s.click_through = requested;
            }
            if s.pending_click_through > 0 || s.store.is_penetrable() == s.click_through {
                return None;
            }
            if ok {
                s.pending_click_through += 1;
                return Some(s.store.is_penetrable());
            }
            s.store.set_penetrable(s.click_through);
            warn!("Penetrable mode reverted to {}", s.click_through);
            None
        })
        .ok()
        .flatten()
    }

    /// Host-side global shortcut. Only acts on an open overlay.
    pub async fn shortcut_toggle(&self) -> Result<Option<bool>, OverlayError> {
        if self.phase.get() != Phase::Open {
            debug!("Toggle shortcut ignored, no overlay open");
            return Ok(None);
        }
        self.toggle_penetrable().await.map(Some)
    }

    /// Resize the window for one wheel notch. Returns the new size.
    pub async fn zoom(&self, wheel_delta_y: f64) -> Result<Size, OverlayError> {
        let handle = self.with_session(|s| s.handle)?;
        let current = self.service.current_size(handle).await.map_err(|e| {
            error!("Failed to read window size: {}", e);
            e
        })?;

        let zoomed = compute_zoomed_size(
            current,
            wheel_delta_y,
            &self.config.bounds,
            self.config.zoom_out_factor,
            self.config.zoom_in_factor,
        );
        if let Err(e) = self.service.resize(handle, zoomed).await {
            error!("Failed to resize window: {}", e);
            return Err(e.into());
        }

        debug!("Zoomed {} -> {}", current, zoomed);
        let _ = self.with_session(|s| {
            if s.handle == handle {
                s.store.set_window_size(zoomed);
            }
        });
        Ok(zoomed)
    }

    /// Step opacity up or down. View-local, no windowing call.
    pub fn adjust_opacity(&self, direction: OpacityDirection) -> Result<f32, OverlayError> {
        let delta = direction.delta(self.config.opacity_step);
        self.with_session(|s| s.store.set_opacity(delta))
    }

    /// Close the overlay, falling back to a direct close.
    ///
    /// When both attempts fail the overlay stays open and the error is returned.
    pub async fn close(&self) -> Result<(), OverlayError> {
        let (handle, click_through) =
            self.with_session(|s| (s.handle, s.store.is_penetrable() || s.click_through))?;
        info!("Closing overlay {}", handle);

        // Hosts may only hide the window; it must come back interactive
        if click_through {
            match self.service.set_click_through(handle, false).await {
                Ok(()) => {
                    let _ = self.with_session(|s| {
                        if s.handle == handle {
                            s.click_through = false;
                            s.store.set_penetrable(false);
                        }
                    });
                }
                Err(e) => warn!("Failed to restore pointer input before close: {}", e),
            }
        }

        if let Err(primary) = self.service.close_window(handle).await {
            warn!("Close failed ({}), closing window directly", primary);
            if let Err(fallback) = self.service.close_current(handle).await {
                error!("Overlay {} left open: {}; {}", handle, primary, fallback);
                return Err(OverlayError::CloseFailed { primary, fallback });
            }
        }

        self.finish_close(handle);
        Ok(())
    }

    fn finish_close(&self, handle: WindowHandle) {
        let mut session = self.session.borrow_mut();
        if session.as_ref().is_some_and(|s| s.handle == handle) {
            if let Some(mut closed) = session.take() {
                closed.store.announce_closed();
            }
            self.phase.set(Phase::Closed);
            info!("Overlay {} closed", handle);
        }
    }
}
