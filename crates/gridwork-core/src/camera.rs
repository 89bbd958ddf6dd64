//! View transform between drawing space and window space.

use crate::physize::PhysSize;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view transform of a drawing.
///
/// Window (device) coordinates are `offset + zoom * drawing`. All interactive
/// geometry (bounding boxes, handle positions, snap candidates) lives in
/// window coordinates; element geometry lives in drawing coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Window position of the drawing origin.
    pub offset: Vec2,
    /// Window pixels per drawing pixel.
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.01,
            max_zoom: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drawing to window transform.
    pub fn view(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Window to drawing transform.
    pub fn inverse_view(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn window_to_drawing(&self, window_point: Point) -> Point {
        self.inverse_view() * window_point
    }

    pub fn drawing_to_window(&self, drawing_point: Point) -> Point {
        self.view() * drawing_point
    }

    /// Pan by a window-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping `window_point` over the same drawing point.
    pub fn zoom_at(&mut self, window_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let anchor = self.window_to_drawing(window_point);
        self.zoom = new_zoom;
        self.offset += window_point - self.drawing_to_window(anchor);
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Fit the whole physical drawing into a viewport with padding.
    pub fn fit_drawing(&mut self, size: &PhysSize, viewport: Size, padding: f64) {
        let px = size.size_px();
        if px.width <= 0.0 || px.height <= 0.0 {
            self.reset();
            return;
        }
        let avail = Size::new(
            (viewport.width - 2.0 * padding).max(1.0),
            (viewport.height - 2.0 * padding).max(1.0),
        );
        self.zoom = (avail.width / px.width)
            .min(avail.height / px.height)
            .clamp(self.min_zoom, self.max_zoom);
        let drawing = Rect::from_origin_size(Point::ZERO, px);
        self.offset = Point::new(0.5 * viewport.width, 0.5 * viewport.height).to_vec2()
            - drawing.center().to_vec2() * self.zoom;
    }

    /// Grid spacing in window pixels.
    pub fn grid_dots(&self, size: &PhysSize) -> f64 {
        size.grid_px() * self.zoom
    }

    /// Window position of the grid origin, from which grid lines are spaced.
    pub fn grid_origin(&self) -> Vec2 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physize::{StdSize, Units};

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.view(), Affine::IDENTITY);
    }

    #[test]
    fn test_round_trip_conversion() {
        let camera = Camera {
            offset: Vec2::new(30.0, -20.0),
            zoom: 1.5,
            ..Camera::default()
        };
        let original = Point::new(123.0, 456.0);
        let back = camera.drawing_to_window(camera.window_to_drawing(original));
        assert!((back - original).hypot() < 1e-10);
        assert_eq!(camera.drawing_to_window(Point::ZERO), Point::new(30.0, -20.0));
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut camera = Camera::new();
        let anchor = Point::new(200.0, 100.0);
        let before = camera.window_to_drawing(anchor);
        camera.zoom_at(anchor, 2.0);
        assert!((camera.zoom - 2.0).abs() < f64::EPSILON);
        assert!((camera.drawing_to_window(before) - anchor).hypot() < 1e-9);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 1e-6);
        assert!((camera.zoom - camera.min_zoom).abs() < f64::EPSILON);
        camera.zoom_at(Point::ZERO, 1e9);
        assert!((camera.zoom - camera.max_zoom).abs() < f64::EPSILON);
    }

    #[test]
    fn test_grid_dots() {
        let mut camera = Camera::new();
        let mut size = PhysSize::default();
        assert_eq!(camera.grid_dots(&size), 12.0);
        camera.zoom = 2.0;
        assert_eq!(camera.grid_dots(&size), 24.0);
        size.units = Units::In;
        size.grid = 0.25;
        assert_eq!(camera.grid_dots(&size), 48.0);
    }

    #[test]
    fn test_fit_drawing() {
        let mut camera = Camera::new();
        let mut size = PhysSize::default();
        size.set_std_size(StdSize::Img1920x1080);
        camera.fit_drawing(&size, Size::new(980.0, 1000.0), 10.0);
        assert!((camera.zoom - 0.5).abs() < 1e-12);
        let center = camera.drawing_to_window(Point::new(960.0, 540.0));
        assert!((center - Point::new(490.0, 500.0)).hypot() < 1e-9);
    }
}
