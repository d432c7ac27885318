#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;
use crate::consts::{MAX_ZOOM, MIN_ZOOM};

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

// --- Camera defaults ---

#[test]
fn camera_default_pan_is_zero() {
    let cam = Camera::default();
    assert_eq!(cam.pan_x, 0.0);
    assert_eq!(cam.pan_y, 0.0);
}

#[test]
fn camera_default_zoom_is_one() {
    let cam = Camera::default();
    assert_eq!(cam.zoom, 1.0);
}

// --- screen_to_world ---

#[test]
fn screen_to_world_identity() {
    let cam = Camera::default();
    let world = cam.screen_to_world(Point::new(50.0, 75.0));
    assert!(point_approx_eq(world, Point::new(50.0, 75.0)));
}

#[test]
fn screen_to_world_with_zoom() {
    let cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 2.0 };
    let world = cam.screen_to_world(Point::new(40.0, 80.0));
    assert!(approx_eq(world.x, 20.0));
    assert!(approx_eq(world.y, 40.0));
}

#[test]
fn screen_to_world_with_pan() {
    let cam = Camera { pan_x: 100.0, pan_y: 50.0, zoom: 1.0 };
    let world = cam.screen_to_world(Point::new(100.0, 50.0));
    assert!(point_approx_eq(world, Point::new(0.0, 0.0)));
}

#[test]
fn screen_to_world_with_pan_and_zoom() {
    let cam = Camera { pan_x: 20.0, pan_y: 10.0, zoom: 2.0 };
    // screen (20, 10) -> world (0, 0) because (20-20)/2 = 0, (10-10)/2 = 0
    let world = cam.screen_to_world(Point::new(20.0, 10.0));
    assert!(point_approx_eq(world, Point::new(0.0, 0.0)));
}

#[test]
fn screen_to_world_negative_coords() {
    let cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 };
    let world = cam.screen_to_world(Point::new(-10.0, -20.0));
    assert!(point_approx_eq(world, Point::new(-10.0, -20.0)));
}

// --- world_to_screen ---

#[test]
fn world_to_screen_identity() {
    let cam = Camera::default();
    let screen = cam.world_to_screen(Point::new(50.0, 75.0));
    assert!(point_approx_eq(screen, Point::new(50.0, 75.0)));
}

#[test]
fn world_to_screen_with_zoom() {
    let cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 2.0 };
    let screen = cam.world_to_screen(Point::new(10.0, 20.0));
    assert!(approx_eq(screen.x, 20.0));
    assert!(approx_eq(screen.y, 40.0));
}

#[test]
fn world_to_screen_with_pan_and_zoom() {
    let cam = Camera { pan_x: 20.0, pan_y: 10.0, zoom: 1.5 };
    let screen = cam.world_to_screen(Point::new(5.0, 5.0));
    // 5*1.5 + 20 = 27.5, 5*1.5 + 10 = 17.5
    assert!(approx_eq(screen.x, 27.5));
    assert!(approx_eq(screen.y, 17.5));
}

// --- Round trips ---

#[test]
fn round_trip_identity() {
    let cam = Camera::default();
    let world = Point::new(100.0, 200.0);
    let back = cam.screen_to_world(cam.world_to_screen(world));
    assert!(point_approx_eq(world, back));
}

#[test]
fn round_trip_with_pan_and_zoom() {
    let cam = Camera { pan_x: 50.0, pan_y: -30.0, zoom: 2.0 };
    let world = Point::new(100.0, 200.0);
    let back = cam.screen_to_world(cam.world_to_screen(world));
    assert!(point_approx_eq(world, back));
}

#[test]
fn round_trip_fractional_zoom() {
    let cam = Camera { pan_x: 13.7, pan_y: -42.3, zoom: 0.75 };
    let world = Point::new(333.3, -999.9);
    let back = cam.screen_to_world(cam.world_to_screen(world));
    assert!(point_approx_eq(world, back));
}

#[test]
fn round_trip_screen_first() {
    let cam = Camera { pan_x: 10.0, pan_y: 20.0, zoom: 1.5 };
    let screen = Point::new(400.0, 300.0);
    let back = cam.world_to_screen(cam.screen_to_world(screen));
    assert!(point_approx_eq(screen, back));
}

// --- screen_dist_to_world ---

#[test]
fn screen_dist_to_world_with_zoom() {
    let cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 2.0 };
    assert!(approx_eq(cam.screen_dist_to_world(10.0), 5.0));
}

#[test]
fn screen_dist_to_world_ignores_pan() {
    let cam = Camera { pan_x: 999.0, pan_y: -999.0, zoom: 0.5 };
    assert!(approx_eq(cam.screen_dist_to_world(8.0), 16.0));
}

// --- zoom_to ---

#[test]
fn zoom_to_keeps_origin_fixed() {
    let mut cam = Camera { pan_x: 35.0, pan_y: -12.0, zoom: 1.0 };
    let origin = Point::new(400.0, 300.0);
    let before = cam.screen_to_world(origin);

    cam.zoom_to(1.6, origin);
    let after = cam.screen_to_world(origin);
    assert!(point_approx_eq(before, after));
}

#[test]
fn zoom_to_anchor_holds_across_repeated_zooms() {
    let mut cam = Camera::default();
    let origin = Point::new(123.0, 456.0);
    let anchor = cam.screen_to_world(origin);

    for z in [0.5, 0.75, 1.25, 2.0, 0.25] {
        cam.zoom_to(z, origin);
        assert!(point_approx_eq(cam.screen_to_world(origin), anchor));
    }
}

#[test]
fn zoom_to_clamps_to_bounds() {
    let mut cam = Camera::default();
    cam.zoom_to(10.0, Point::new(0.0, 0.0));
    assert_eq!(cam.zoom, MAX_ZOOM);
    cam.zoom_to(0.01, Point::new(0.0, 0.0));
    assert_eq!(cam.zoom, MIN_ZOOM);
}

#[test]
fn zoom_to_clamped_value_still_anchors() {
    let mut cam = Camera { pan_x: 7.0, pan_y: 9.0, zoom: 1.0 };
    let origin = Point::new(50.0, 60.0);
    let before = cam.screen_to_world(origin);
    // Request far above the bound; the anchor must hold at the clamped zoom.
    cam.zoom_to(99.0, origin);
    assert!(point_approx_eq(cam.screen_to_world(origin), before));
}

// --- fit_to_bounds ---

#[test]
fn fit_to_bounds_centers_content() {
    let mut cam = Camera::default();
    let bounds = Rect::new(0.0, 0.0, 400.0, 200.0);
    let viewport = Size::new(1280.0, 720.0);
    cam.fit_to_bounds(bounds, viewport);

    // The bounds center lands on the viewport center.
    let center_screen = cam.world_to_screen(bounds.center());
    assert!(approx_eq(center_screen.x, 640.0));
    assert!(approx_eq(center_screen.y, 360.0));
}

#[test]
fn fit_to_bounds_fits_both_axes() {
    let mut cam = Camera::default();
    let bounds = Rect::new(-500.0, -100.0, 2_500.0, 100.0);
    let viewport = Size::new(800.0, 600.0);
    cam.fit_to_bounds(bounds, viewport);

    let visible = cam.visible_world(viewport);
    assert!(visible.min_x <= bounds.min_x);
    assert!(visible.max_x >= bounds.max_x);
    assert!(visible.min_y <= bounds.min_y);
    assert!(visible.max_y >= bounds.max_y);
}

#[test]
fn fit_to_bounds_clamps_zoom_for_tiny_content() {
    let mut cam = Camera::default();
    // A tiny rect would want a huge zoom; it must clamp instead.
    cam.fit_to_bounds(Rect::new(0.0, 0.0, 1.0, 1.0), Size::new(1920.0, 1080.0));
    assert_eq!(cam.zoom, MAX_ZOOM);
}

// --- center_on / reset / pan ---

#[test]
fn center_on_places_point_mid_viewport() {
    let mut cam = Camera::default();
    let viewport = Size::new(1000.0, 500.0);
    cam.center_on(Point::new(300.0, 300.0), Some(2.0), viewport);

    let screen = cam.world_to_screen(Point::new(300.0, 300.0));
    assert!(approx_eq(screen.x, 500.0));
    assert!(approx_eq(screen.y, 250.0));
    assert_eq!(cam.zoom, 2.0);
}

#[test]
fn center_on_without_zoom_keeps_current_zoom() {
    let mut cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 0.5 };
    cam.center_on(Point::new(0.0, 0.0), None, Size::new(100.0, 100.0));
    assert_eq!(cam.zoom, 0.5);
}

#[test]
fn reset_restores_default_view() {
    let mut cam = Camera { pan_x: 17.0, pan_y: -3.0, zoom: 1.75 };
    cam.reset();
    assert_eq!(cam.pan_x, 0.0);
    assert_eq!(cam.pan_y, 0.0);
    assert_eq!(cam.zoom, 1.0);
}

#[test]
fn pan_by_accumulates() {
    let mut cam = Camera::default();
    cam.pan_by(10.0, -5.0);
    cam.pan_by(2.5, 1.0);
    assert!(approx_eq(cam.pan_x, 12.5));
    assert!(approx_eq(cam.pan_y, -4.0));
}

#[test]
fn visible_world_matches_inverse_transform() {
    let cam = Camera { pan_x: -100.0, pan_y: 40.0, zoom: 0.5 };
    let viewport = Size::new(640.0, 480.0);
    let visible = cam.visible_world(viewport);
    let tl = cam.screen_to_world(Point::new(0.0, 0.0));
    let br = cam.screen_to_world(Point::new(640.0, 480.0));
    assert!(approx_eq(visible.min_x, tl.x));
    assert!(approx_eq(visible.min_y, tl.y));
    assert!(approx_eq(visible.max_x, br.x));
    assert!(approx_eq(visible.max_y, br.y));
}
