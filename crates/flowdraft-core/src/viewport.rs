//! Viewport pan/zoom transform.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Scale that corresponds to "100%" in the UI.
pub const BASE_SCALE: f64 = 1.0;

/// Inclusive zoom bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 0.5, max: 2.5 }
    }
}

impl ZoomLimits {
    /// Nearest scale inside the window. Never panics, even for an
    /// inverted window, where `max` wins.
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.max(self.min).min(self.max)
    }
}

/// Pan and zoom of the canvas: `screen = canvas * scale + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ViewportRecord", into = "ViewportRecord")]
pub struct Viewport {
    /// Zoom factor (1.0 = 100%).
    pub scale: f64,
    /// Pan offset in screen pixels.
    pub translation: Vec2,
}

/// Persisted form: `{scale, panX, panY}`.
#[derive(Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ViewportRecord {
    scale: f64,
    pan_x: f64,
    pan_y: f64,
}

impl Default for ViewportRecord {
    fn default() -> Self {
        Self {
            scale: BASE_SCALE,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl From<ViewportRecord> for Viewport {
    fn from(record: ViewportRecord) -> Self {
        let scale = if record.scale.is_finite() && record.scale > 0.0 {
            record.scale
        } else {
            BASE_SCALE
        };
        Self {
            scale,
            translation: Vec2::new(record.pan_x, record.pan_y),
        }
    }
}

impl From<Viewport> for ViewportRecord {
    fn from(viewport: Viewport) -> Self {
        Self {
            scale: viewport.scale,
            pan_x: viewport.translation.x,
            pan_y: viewport.translation.y,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: BASE_SCALE,
            translation: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn new(scale: f64, translation: Vec2) -> Self {
        Self { scale, translation }
    }

    /// Canvas-to-screen matrix for the renderer.
    pub fn transform(&self) -> Affine {
        let Vec2 { x, y } = self.translation;
        Affine::new([self.scale, 0.0, 0.0, self.scale, x, y])
    }

    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        ((screen.to_vec2() - self.translation) / self.scale).to_point()
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        (canvas.to_vec2() * self.scale + self.translation).to_point()
    }

    /// Set the scale to `scale` clamped into `limits`, pinning the canvas
    /// point under the screen point `focal`.
    ///
    /// Returns false when the clamped scale is already current; the scale
    /// is still snapped onto the bound in that case.
    pub fn zoom_to(&mut self, scale: f64, focal: Point, limits: ZoomLimits) -> bool {
        let scale = limits.clamp(scale);
        if (scale - self.scale).abs() < f64::EPSILON {
            self.scale = scale;
            return false;
        }
        let pinned = self.screen_to_canvas(focal);
        self.scale = scale;
        self.translation = focal.to_vec2() - pinned.to_vec2() * scale;
        true
    }

    /// Show all of `content` inside a screen area of `area`, leaving
    /// `padding` pixels on each side. Degenerate content gives the default view.
    pub fn fit(&mut self, content: Rect, area: Size, padding: f64, limits: ZoomLimits) {
        if content.width() <= 0.0 || content.height() <= 0.0 {
            *self = Self::default();
            return;
        }
        let room_x = (area.width - 2.0 * padding).max(1.0);
        let room_y = (area.height - 2.0 * padding).max(1.0);
        self.scale = limits.clamp((room_x / content.width()).min(room_y / content.height()));
        let area_center = Vec2::new(area.width, area.height) / 2.0;
        self.translation = area_center - content.center().to_vec2() * self.scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn test_screen_canvas_conversion() {
        let viewport = Viewport::new(2.0, Vec2::new(50.0, -30.0));
        let canvas = Point::new(10.0, 20.0);
        let screen = viewport.canvas_to_screen(canvas);
        assert_eq!(screen, Point::new(70.0, 10.0));
        assert!(close(viewport.screen_to_canvas(screen), canvas));
        assert_eq!(viewport.transform() * canvas, screen);
    }

    #[test]
    fn test_focal_point_stays_put_across_clamp_range() {
        let limits = ZoomLimits::default();
        let focal = Point::new(412.0, 287.0);
        let mut viewport = Viewport::new(1.0, Vec2::new(-75.0, 40.0));
        let pinned = viewport.screen_to_canvas(focal);

        for target in [0.1, 0.5, 0.73, 1.0, 1.9, 2.5, 7.0] {
            viewport.zoom_to(target, focal, limits);
            assert!(viewport.scale >= limits.min && viewport.scale <= limits.max);
            assert!(close(viewport.canvas_to_screen(pinned), focal), "scale {target}");
        }
    }

    #[test]
    fn test_additive_steps_land_exactly_on_bounds() {
        let limits = ZoomLimits::default();
        let mut viewport = Viewport::default();
        let mut changes = 0;
        for _ in 0..20 {
            if viewport.zoom_to(viewport.scale + 0.1, Point::ZERO, limits) {
                changes += 1;
            }
        }
        assert_eq!(viewport.scale, 2.5);
        assert_eq!(changes, 15);

        for _ in 0..40 {
            viewport.zoom_to(viewport.scale - 0.1, Point::ZERO, limits);
        }
        assert_eq!(viewport.scale, 0.5);
        assert!(!viewport.zoom_to(0.4, Point::ZERO, limits));
    }

    #[test]
    fn test_inverted_limits_do_not_panic() {
        let limits = ZoomLimits { min: 3.0, max: 1.0 };
        assert_eq!(limits.clamp(2.0), 1.0);
    }

    #[test]
    fn test_serde_record_shape() {
        let viewport = Viewport::new(1.5, Vec2::new(10.0, -4.0));
        let value = serde_json::to_value(viewport).unwrap();
        assert_eq!(value["scale"], 1.5);
        assert_eq!(value["panX"], 10.0);
        assert_eq!(value["panY"], -4.0);

        let partial: Viewport = serde_json::from_str(r#"{"panX": 5}"#).unwrap();
        assert_eq!(partial.scale, 1.0);
        assert_eq!(partial.translation, Vec2::new(5.0, 0.0));

        let broken: Viewport = serde_json::from_str(r#"{"scale": -2}"#).unwrap();
        assert_eq!(broken.scale, BASE_SCALE);
    }

    #[test]
    fn test_fit_centers_and_clamps() {
        let limits = ZoomLimits::default();
        let mut viewport = Viewport::default();
        let small = Rect::new(100.0, 100.0, 300.0, 200.0);
        viewport.fit(small, Size::new(800.0, 600.0), 50.0, limits);
        assert_eq!(viewport.scale, 2.5);
        assert!(close(viewport.canvas_to_screen(small.center()), Point::new(400.0, 300.0)));

        let wide = Rect::new(0.0, 0.0, 1400.0, 100.0);
        viewport.fit(wide, Size::new(800.0, 600.0), 50.0, limits);
        assert_eq!(viewport.scale, 0.5);

        viewport.fit(Rect::new(5.0, 5.0, 5.0, 5.0), Size::new(800.0, 600.0), 50.0, limits);
        assert_eq!(viewport, Viewport::default());
    }
}
