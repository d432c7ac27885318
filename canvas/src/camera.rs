#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{FIT_PADDING, MAX_ZOOM, MIN_ZOOM};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle, in whichever space the caller is working.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// `pan_x` / `pan_y` are in CSS pixels.
/// `zoom` is a scale factor (1.0 = no zoom), clamped to
/// [`MIN_ZOOM`]..=[`MAX_ZOOM`] by every mutating operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

impl Camera {
    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Zoom to `new_zoom` keeping the screen point `origin` fixed: the world
    /// point under `origin` before the zoom is still under it afterwards.
    pub fn zoom_to(&mut self, new_zoom: f64, origin: Point) {
        let clamped = clamp_zoom(new_zoom);
        let ratio = clamped / self.zoom;
        self.pan_x = origin.x - (origin.x - self.pan_x) * ratio;
        self.pan_y = origin.y - (origin.y - self.pan_y) * ratio;
        self.zoom = clamped;
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Fit a world rectangle (plus fixed padding) into the viewport, clamped
    /// to the zoom bounds, then center it.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size) {
        let content_width = bounds.width() + FIT_PADDING * 2.0;
        let content_height = bounds.height() + FIT_PADDING * 2.0;

        let scale_x = viewport.width / content_width;
        let scale_y = viewport.height / content_height;
        self.zoom = clamp_zoom(scale_x.min(scale_y));

        let center = bounds.center();
        self.pan_x = viewport.width / 2.0 - center.x * self.zoom;
        self.pan_y = viewport.height / 2.0 - center.y * self.zoom;
    }

    /// Center the viewport on a world point, optionally changing zoom.
    pub fn center_on(&mut self, point: Point, new_zoom: Option<f64>, viewport: Size) {
        if let Some(z) = new_zoom {
            self.zoom = clamp_zoom(z);
        }
        self.pan_x = viewport.width / 2.0 - point.x * self.zoom;
        self.pan_y = viewport.height / 2.0 - point.y * self.zoom;
    }

    /// Reset to the default view.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The world rectangle currently visible through the viewport.
    #[must_use]
    pub fn visible_world(&self, viewport: Size) -> Rect {
        let top_left = self.screen_to_world(Point::new(0.0, 0.0));
        Rect {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + viewport.width / self.zoom,
            max_y: top_left.y + viewport.height / self.zoom,
        }
    }
}
