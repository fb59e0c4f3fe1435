// Headless windowing module
// In-process stand-in for a native window host that simulates one overlay window

use crate::state::Size;
use crate::windowing::{
    OverlayRequest, WindowHandle, WindowOp, WindowingError, WindowingResult, WindowingService,
};
use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

/// Size a window gets before anything resizes it
const INITIAL_SIZE: Size = Size::new(800, 600);

/// The simulated overlay window
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessWindow {
    pub handle: WindowHandle,
    pub size: Size,
    /// Top-left corner in screen coordinates
    pub position: (i32, i32),
    pub click_through: bool,
    pub always_on_top: bool,
    pub startup_url: String,
}

pub struct HeadlessWindowing {
    screen: Size,
    next_id: Cell<u64>,
    window: RefCell<Option<HeadlessWindow>>,
    failing: HashSet<WindowOp>,
}

impl HeadlessWindowing {
    pub fn new(screen: Size) -> Self {
        Self {
            screen,
            next_id: Cell::new(1),
            window: RefCell::new(None),
            failing: HashSet::new(),
        }
    }

    /// Make every call of the given operations fail
    pub fn with_failures(mut self, ops: impl IntoIterator<Item = WindowOp>) -> Self {
        self.failing.extend(ops);
        self
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    /// The window currently alive, if any
    pub fn window(&self) -> Option<HeadlessWindow> {
        self.window.borrow().clone()
    }

    fn check(&self, op: WindowOp) -> WindowingResult<()> {
        if self.failing.contains(&op) {
            return Err(WindowingError::Rejected {
                op,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn with_window<T>(
        &self,
        op: WindowOp,
        handle: WindowHandle,
        f: impl FnOnce(&mut HeadlessWindow) -> T,
    ) -> WindowingResult<T> {
        self.check(op)?;
        let mut window = self.window.borrow_mut();
        match window.as_mut() {
            Some(w) if w.handle == handle => Ok(f(w)),
            _ => Err(WindowingError::WindowNotFound(handle)),
        }
    }

    fn remove(&self, op: WindowOp, handle: WindowHandle) -> WindowingResult<()> {
        self.with_window(op, handle, |_| ())?;
        self.window.borrow_mut().take();
        info!("[host] {} closed via {}", handle, op);
        Ok(())
    }

    fn centered(&self, size: Size) -> (i32, i32) {
        (
            (self.screen.width as i32 - size.width as i32) / 2,
            (self.screen.height as i32 - size.height as i32) / 2,
        )
    }
}

impl WindowingService for HeadlessWindowing {
    async fn create_overlay_window(
        &self,
        request: &OverlayRequest,
    ) -> WindowingResult<WindowHandle> {
        self.check(WindowOp::Create)?;
        if self.window.borrow().is_some() {
            return Err(WindowingError::Rejected {
                op: WindowOp::Create,
                reason: "an overlay window already exists".to_string(),
            });
        }

        let handle = WindowHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);
        let window = HeadlessWindow {
            handle,
            size: INITIAL_SIZE,
            position: self.centered(INITIAL_SIZE),
            click_through: false,
            always_on_top: true,
            startup_url: request.startup_url.clone(),
        };
        info!("[host] created {} at {} loading {}", handle, window.size, window.startup_url);
        *self.window.borrow_mut() = Some(window);
        Ok(handle)
    }

    async fn resize(&self, handle: WindowHandle, size: Size) -> WindowingResult<()> {
        self.with_window(WindowOp::Resize, handle, |w| w.size = size)?;
        info!("[host] {} resized to {}", handle, size);
        Ok(())
    }

    async fn center(&self, handle: WindowHandle) -> WindowingResult<()> {
        let size = self.with_window(WindowOp::Center, handle, |w| w.size)?;
        let position = self.centered(size);
        self.with_window(WindowOp::Center, handle, |w| w.position = position)?;
        debug!("[host] {} centered at {:?}", handle, position);
        Ok(())
    }

    async fn set_click_through(&self, handle: WindowHandle, enabled: bool) -> WindowingResult<()> {
        self.with_window(WindowOp::SetClickThrough, handle, |w| w.click_through = enabled)?;
        info!("[host] {} click-through {}", handle, if enabled { "on" } else { "off" });
        Ok(())
    }

    async fn close_window(&self, handle: WindowHandle) -> WindowingResult<()> {
        self.remove(WindowOp::Close, handle)
    }

    async fn close_current(&self, handle: WindowHandle) -> WindowingResult<()> {
        self.remove(WindowOp::CloseCurrent, handle)
    }

    async fn current_size(&self, handle: WindowHandle) -> WindowingResult<Size> {
        self.with_window(WindowOp::CurrentSize, handle, |w| w.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::ImageSource;
    use pollster::block_on;

    fn request() -> OverlayRequest {
        OverlayRequest::new(ImageSource::Uri("https://example.com/ref.png".to_string()))
    }

    #[test]
    fn creates_one_centered_always_on_top_window() {
        let host = HeadlessWindowing::new(Size::new(1920, 1080));
        let handle = block_on(host.create_overlay_window(&request())).unwrap();
        let window = host.window().unwrap();
        assert_eq!(window.handle, handle);
        assert_eq!(window.position, (560, 240));
        assert!(window.always_on_top);
        assert!(!window.click_through);
        assert!(block_on(host.create_overlay_window(&request())).is_err());
    }

    #[test]
    fn center_follows_resize() {
        let host = HeadlessWindowing::new(Size::new(1920, 1080));
        let handle = block_on(host.create_overlay_window(&request())).unwrap();
        block_on(host.resize(handle, Size::new(1152, 864))).unwrap();
        block_on(host.center(handle)).unwrap();
        assert_eq!(host.window().unwrap().position, (384, 108));
        assert_eq!(block_on(host.current_size(handle)).unwrap(), Size::new(1152, 864));
    }

    #[test]
    fn stale_handles_are_rejected() {
        let host = HeadlessWindowing::new(Size::new(1920, 1080));
        let handle = block_on(host.create_overlay_window(&request())).unwrap();
        block_on(host.close_window(handle)).unwrap();
        assert_eq!(
            block_on(host.resize(handle, Size::new(10, 10))),
            Err(WindowingError::WindowNotFound(handle))
        );
        let next = block_on(host.create_overlay_window(&request())).unwrap();
        assert_ne!(next, handle);
    }

    #[test]
    fn injected_failures_leave_window_untouched() {
        let host = HeadlessWindowing::new(Size::new(1920, 1080)).with_failures([WindowOp::Close]);
        let handle = block_on(host.create_overlay_window(&request())).unwrap();
        assert!(block_on(host.close_window(handle)).is_err());
        assert!(host.window().is_some());
        block_on(host.close_current(handle)).unwrap();
        assert!(host.window().is_none());
    }
}
