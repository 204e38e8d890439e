//! # Viewport
//!
//! The map view follows data, not the user: whenever the focus coordinate
//! changes the view jumps to it at the configured zoom, discarding any pan or
//! zoom made since the previous change.

use common::Coordinate;

use crate::config::MapConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    center: Coordinate,
    zoom: u8,
    focus: Option<Coordinate>,
    config: MapConfig,
}

impl Viewport {
    /// Zoom bounds given out of order are swapped.
    #[must_use]
    pub const fn new(config: MapConfig) -> Self {
        let config = config.normalized();
        Self { center: config.default_center, zoom: config.zoom, focus: None, config }
    }

    #[must_use]
    pub const fn center(&self) -> Coordinate {
        self.center
    }

    #[must_use]
    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Recenter on `focus` if it differs from the last focus followed.
    ///
    /// Returns `true` when the view moved.
    pub fn follow(&mut self, focus: Coordinate) -> bool {
        if self.focus == Some(focus) {
            return false;
        }

        self.focus = Some(focus);
        self.center = clamp(focus);
        self.zoom = self.config.zoom;
        true
    }

    /// User drag. Kept until the next focus change.
    pub fn pan(&mut self, center: Coordinate) {
        self.center = clamp(center);
    }

    /// User zoom, bounded by the configured zoom range.
    pub fn zoom_to(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
    }

    /// Drop the focus and return to the default centre.
    pub const fn reset(&mut self) {
        self.focus = None;
        self.center = self.config.default_center;
        self.zoom = self.config.zoom;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

// no wrapping: the map is a single copy of the world
fn clamp(point: Coordinate) -> Coordinate {
    Coordinate::new(point.lat.clamp(-90.0, 90.0), point.lng.clamp(-180.0, 180.0))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::DEFAULT_CENTER;

    #[test]
    fn starts_at_default_center() {
        let viewport = Viewport::default();
        assert_eq!(viewport.center(), DEFAULT_CENTER);
        assert_eq!(viewport.zoom(), 15);
    }

    #[test]
    fn focus_change_overrides_user_pan() {
        let mut viewport = Viewport::default();
        assert!(viewport.follow(Coordinate::new(12.9, 77.6)));

        viewport.pan(Coordinate::new(13.5, 78.0));
        viewport.zoom_to(8);
        assert_eq!(viewport.center(), Coordinate::new(13.5, 78.0));

        assert!(viewport.follow(Coordinate::new(12.91, 77.61)));
        assert_eq!(viewport.center(), Coordinate::new(12.91, 77.61));
        assert_eq!(viewport.zoom(), 15);
    }

    #[test]
    fn unchanged_focus_keeps_user_pan() {
        let mut viewport = Viewport::default();
        viewport.follow(Coordinate::new(12.9, 77.6));
        viewport.pan(Coordinate::new(13.5, 78.0));

        assert!(!viewport.follow(Coordinate::new(12.9, 77.6)));
        assert_eq!(viewport.center(), Coordinate::new(13.5, 78.0));
    }

    #[test]
    fn bounded_to_one_world() {
        let mut viewport = Viewport::default();
        viewport.pan(Coordinate::new(95.0, -200.0));
        assert_eq!(viewport.center(), Coordinate::new(90.0, -180.0));

        viewport.zoom_to(25);
        assert_eq!(viewport.zoom(), 19);
        viewport.zoom_to(0);
        assert_eq!(viewport.zoom(), 3);
    }

    #[test]
    fn inverted_zoom_bounds() {
        let config = MapConfig { zoom: 2, min_zoom: 17, max_zoom: 5, ..MapConfig::default() };
        let mut viewport = Viewport::new(config);
        assert_eq!(viewport.zoom(), 5);

        viewport.zoom_to(30);
        assert_eq!(viewport.zoom(), 17);
        viewport.zoom_to(1);
        assert_eq!(viewport.zoom(), 5);
    }

    #[test]
    fn reset_clears_focus() {
        let mut viewport = Viewport::default();
        viewport.follow(Coordinate::new(12.9, 77.6));
        viewport.reset();

        assert_eq!(viewport.center(), DEFAULT_CENTER);
        // same coordinate recenters again after a reset
        assert!(viewport.follow(Coordinate::new(12.9, 77.6)));
    }
}
