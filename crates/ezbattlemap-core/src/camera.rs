//! Pan/zoom transform between a display surface and map image coordinates.

use kurbo::{Affine, Point, Size, Vec2};

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 10.0;
/// Zoom multiplier applied per mouse-wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;
/// Share of the surface a freshly loaded image fills on the controller.
pub const CONTROLLER_FILL: f64 = 0.9;
/// Share of the surface a new viewport fills on the audience display.
pub const AUDIENCE_FILL: f64 = 0.95;

/// View transform for one display surface.
///
/// Image point `p` is drawn at `offset + p * zoom` on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Surface position of the image origin.
    pub offset: Vec2,
    /// Surface pixels per image pixel.
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    /// Create a camera with no offset at 1:1 zoom.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform from image coordinates to surface coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Transform from surface coordinates to image coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a surface point to image coordinates.
    pub fn screen_to_image(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert an image point to surface coordinates.
    pub fn image_to_screen(&self, image_point: Point) -> Point {
        self.transform() * image_point
    }

    /// Map a surface point onto the image, or `None` if it misses the image.
    pub fn image_point(&self, screen_point: Point, image_size: Size) -> Option<Point> {
        let p = self.screen_to_image(screen_point);
        let inside = p.x >= 0.0 && p.x < image_size.width && p.y >= 0.0 && p.y < image_size.height;
        inside.then_some(p)
    }

    /// Pan by a delta in surface pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping `screen_point` over the same image point.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let anchor = self.screen_to_image(screen_point);
        self.zoom = new_zoom;
        let moved = self.image_to_screen(anchor);
        self.offset += screen_point - moved;
    }

    /// Apply one mouse-wheel notch at `screen_point`.
    pub fn wheel(&mut self, screen_point: Point, zoom_in: bool) {
        let factor = if zoom_in {
            WHEEL_ZOOM_STEP
        } else {
            1.0 / WHEEL_ZOOM_STEP
        };
        self.zoom_at(screen_point, factor);
    }

    /// Scale `image` to fill `fill` of `surface` and center it.
    ///
    /// Degenerate sizes reset the camera.
    pub fn fit_image(&mut self, image: Size, surface: Size, fill: f64) {
        let degenerate = |size: Size| size.width <= 0.0 || size.height <= 0.0;
        if degenerate(image) || degenerate(surface) {
            *self = Self::default();
            return;
        }

        let scale = (surface.width / image.width).min(surface.height / image.height) * fill;
        self.zoom = scale.clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset = Vec2::new(
            (surface.width - image.width * self.zoom) / 2.0,
            (surface.height - image.height * self.zoom) / 2.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let camera = Camera::new();
        let p = Point::new(12.0, 34.0);
        assert_eq!(camera.screen_to_image(p), p);
    }

    #[test]
    fn test_screen_to_image_with_offset_and_zoom() {
        let camera = Camera {
            offset: Vec2::new(50.0, 100.0),
            zoom: 2.0,
        };
        let p = camera.screen_to_image(Point::new(250.0, 300.0));
        assert!((p.x - 100.0).abs() < 1e-10);
        assert!((p.y - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let camera = Camera {
            offset: Vec2::new(30.0, -20.0),
            zoom: 1.5,
        };
        let start = Point::new(123.0, 456.0);
        let back = camera.image_to_screen(camera.screen_to_image(start));
        assert!((back.x - start.x).abs() < 1e-10);
        assert!((back.y - start.y).abs() < 1e-10);
    }

    #[test]
    fn test_image_point_outside_image() {
        let camera = Camera::new();
        let size = Size::new(200.0, 100.0);
        assert!(camera.image_point(Point::new(10.0, 10.0), size).is_some());
        assert!(camera.image_point(Point::new(-1.0, 10.0), size).is_none());
        assert!(camera.image_point(Point::new(10.0, 100.0), size).is_none());
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut camera = Camera::new();
        let anchor = Point::new(80.0, 60.0);
        let before = camera.screen_to_image(anchor);
        camera.wheel(anchor, true);
        let after = camera.screen_to_image(anchor);
        assert!((camera.zoom - WHEEL_ZOOM_STEP).abs() < 1e-12);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 0.001);
        assert!((camera.zoom - MIN_ZOOM).abs() < f64::EPSILON);

        camera.zoom_at(Point::ZERO, 1000.0);
        assert!((camera.zoom - MAX_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(10.0, 20.0));
        camera.pan(Vec2::new(-4.0, 1.0));
        assert_eq!(camera.offset, Vec2::new(6.0, 21.0));
    }

    #[test]
    fn test_fit_image_centers() {
        let mut camera = Camera::new();
        camera.fit_image(Size::new(2000.0, 1000.0), Size::new(1000.0, 1000.0), CONTROLLER_FILL);
        assert!((camera.zoom - 0.45).abs() < 1e-12);
        assert!((camera.offset.x - 50.0).abs() < 1e-9);
        assert!((camera.offset.y - 275.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_degenerate_resets() {
        let mut camera = Camera {
            offset: Vec2::new(5.0, 5.0),
            zoom: 3.0,
        };
        camera.fit_image(Size::new(0.0, 10.0), Size::new(100.0, 100.0), AUDIENCE_FILL);
        assert_eq!(camera, Camera::default());
    }
}
