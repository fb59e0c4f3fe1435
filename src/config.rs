// Configuration module
// Compiled-in defaults for the overlay; the binary overrides a few from the command line

use crate::state::Size;

/// Lower and upper window size bounds applied when zooming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: Size,
    pub max: Size,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self {
            min: Size::new(200, 150),
            max: Size::new(3000, 2000),
        }
    }
}

/// Overlay behaviour knobs
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Opacity a freshly opened overlay starts with
    pub initial_opacity: f32,
    /// Lowest reachable opacity
    pub min_opacity: f32,
    /// Highest reachable opacity
    pub max_opacity: f32,
    /// Opacity change per arrow key press
    pub opacity_step: f32,
    /// Fraction of the screen a freshly loaded image may cover
    pub fit_ratio: f64,
    /// Scale applied when the wheel scrolls down (positive delta)
    pub zoom_out_factor: f64,
    /// Scale applied otherwise
    pub zoom_in_factor: f64,
    pub bounds: SizeBounds,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            initial_opacity: 0.7,
            min_opacity: 0.1,
            max_opacity: 1.0,
            opacity_step: 0.1,
            fit_ratio: 0.8,
            zoom_out_factor: 0.9,
            zoom_in_factor: 1.1,
            bounds: SizeBounds::default(),
        }
    }
}

impl OverlayConfig {
    /// Replace the starting opacity, clamped into the configured range
    pub fn with_initial_opacity(mut self, opacity: f32) -> Self {
        self.initial_opacity = opacity.clamp(self.min_opacity, self.max_opacity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_overlay_policy() {
        let config = OverlayConfig::default();
        assert_eq!(config.initial_opacity, 0.7);
        assert_eq!(config.bounds.min, Size::new(200, 150));
        assert_eq!(config.bounds.max, Size::new(3000, 2000));
    }

    #[test]
    fn initial_opacity_override_is_clamped() {
        assert_eq!(OverlayConfig::default().with_initial_opacity(0.0).initial_opacity, 0.1);
        assert_eq!(OverlayConfig::default().with_initial_opacity(0.4).initial_opacity, 0.4);
    }
}
