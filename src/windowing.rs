// Windowing service contract
// The host that owns native windows implements this; the controller only talks to it through here

use crate::image_loader::ImageSource;
use crate::state::Size;
use std::fmt;
use thiserror::Error;

/// Page the view is loaded from inside the overlay window
pub const OVERLAY_PAGE: &str = "image-overlay.html";

/// Opaque identifier of a window created by the windowing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Windowing operations, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowOp {
    Create,
    Resize,
    Center,
    SetClickThrough,
    Close,
    CloseCurrent,
    CurrentSize,
}

impl fmt::Display for WindowOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowOp::Create => "create",
            WindowOp::Resize => "resize",
            WindowOp::Center => "center",
            WindowOp::SetClickThrough => "set-click-through",
            WindowOp::Close => "close",
            WindowOp::CloseCurrent => "close-current",
            WindowOp::CurrentSize => "current-size",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowingError {
    #[error("{0} no longer exists")]
    WindowNotFound(WindowHandle),

    #[error("{op} rejected: {reason}")]
    Rejected { op: WindowOp, reason: String },

    #[error("windowing service unavailable")]
    Unavailable,
}

pub type WindowingResult<T> = Result<T, WindowingError>;

/// Everything the windowing service needs to create an overlay window
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRequest {
    pub image: ImageSource,
    /// URL the view is started with; carries the image as its `img` parameter
    pub startup_url: String,
}

impl OverlayRequest {
    pub fn new(image: ImageSource) -> Self {
        let startup_url = format!(
            "{}?img={}",
            OVERLAY_PAGE,
            urlencoding::encode(&image.to_string())
        );
        Self { image, startup_url }
    }
}

/// Host-side window operations.
///
/// Calls may suspend; the controller never holds state borrows across them.
/// Every method reports failure atomically: an `Err` means the change did not
/// take effect.
#[allow(async_fn_in_trait)]
pub trait WindowingService {
    /// Create a borderless, always-on-top window and start the view in it
    async fn create_overlay_window(
        &self,
        request: &OverlayRequest,
    ) -> WindowingResult<WindowHandle>;

    async fn resize(&self, handle: WindowHandle, size: Size) -> WindowingResult<()>;

    async fn center(&self, handle: WindowHandle) -> WindowingResult<()>;

    /// Route pointer input to the windows beneath (`true`) or back to the overlay
    async fn set_click_through(&self, handle: WindowHandle, enabled: bool) -> WindowingResult<()>;

    /// Regular close through the host's command path
    async fn close_window(&self, handle: WindowHandle) -> WindowingResult<()>;

    /// Direct close of the window itself, used when `close_window` fails
    async fn close_current(&self, handle: WindowHandle) -> WindowingResult<()>;

    async fn current_size(&self, handle: WindowHandle) -> WindowingResult<Size>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_url_encodes_image() {
        let request = OverlayRequest::new(ImageSource::Uri("https://host/a b.png?x=1".to_string()));
        assert_eq!(
            request.startup_url,
            "image-overlay.html?img=https%3A%2F%2Fhost%2Fa%20b.png%3Fx%3D1"
        );
    }

    #[test]
    fn errors_name_the_operation() {
        let err = WindowingError::Rejected {
            op: WindowOp::SetClickThrough,
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "set-click-through rejected: permission denied");
        assert_eq!(
            WindowingError::WindowNotFound(WindowHandle(3)).to_string(),
            "window#3 no longer exists"
        );
    }
}
