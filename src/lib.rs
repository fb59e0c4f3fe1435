// overpin - an always-on-top reference image overlay
// Core: per-window state store and the controller that keeps it in step with the windowing service

pub mod config;
pub mod controller;
pub mod headless;
pub mod image_loader;
pub mod intent;
pub mod state;
pub mod windowing;

pub use config::{OverlayConfig, SizeBounds};
pub use controller::{OverlayController, OverlayError, Phase};
pub use image_loader::ImageSource;
pub use intent::{HostCommand, Intent, OpacityDirection, ViewEvent};
pub use state::{OverlayEvent, OverlayState, PointerRegion, Size, WindowStateStore};
pub use windowing::{OverlayRequest, WindowHandle, WindowOp, WindowingError, WindowingService};
