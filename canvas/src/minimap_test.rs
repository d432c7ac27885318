#![allow(clippy::float_cmp)]

use super::*;
use crate::consts::{
    CARD_HEIGHT, CARD_WIDTH, EMPTY_WORLD_HALF_EXTENT, MINIMAP_PADDING, MINIMAP_SIZE,
    MINIMAP_WORLD_PADDING,
};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

#[test]
fn empty_board_uses_default_world_box() {
    let map = Minimap::layout(&[]);
    assert_eq!(map.world_bounds.min_x, -EMPTY_WORLD_HALF_EXTENT);
    assert_eq!(map.world_bounds.max_y, EMPTY_WORLD_HALF_EXTENT);
}

#[test]
fn world_bounds_pad_the_card_box() {
    let map = Minimap::layout(&[Point::new(0.0, 0.0), Point::new(1000.0, 500.0)]);
    assert_eq!(map.world_bounds.min_x, -MINIMAP_WORLD_PADDING);
    assert_eq!(map.world_bounds.min_y, -MINIMAP_WORLD_PADDING);
    assert_eq!(map.world_bounds.max_x, 1000.0 + CARD_WIDTH + MINIMAP_WORLD_PADDING);
    assert_eq!(map.world_bounds.max_y, 500.0 + CARD_HEIGHT + MINIMAP_WORLD_PADDING);
}

#[test]
fn scale_fits_the_longer_axis() {
    let map = Minimap::layout(&[Point::new(0.0, 0.0), Point::new(5000.0, 0.0)]);
    let usable = MINIMAP_SIZE - MINIMAP_PADDING * 2.0;
    assert!(approx_eq(map.scale, usable / map.world_bounds.width()));
    // Everything projects inside the square.
    let br = map.world_to_minimap(Point::new(map.world_bounds.max_x, map.world_bounds.max_y));
    assert!(br.x <= MINIMAP_SIZE + EPSILON);
    assert!(br.y <= MINIMAP_SIZE + EPSILON);
}

#[test]
fn world_minimap_round_trip() {
    let map = Minimap::layout(&[Point::new(-320.0, 80.0), Point::new(900.0, 640.0)]);
    let world = Point::new(123.4, 567.8);
    let back = map.minimap_to_world(map.world_to_minimap(world));
    assert!(approx_eq(back.x, world.x));
    assert!(approx_eq(back.y, world.y));
}

#[test]
fn bounds_corner_maps_to_padding_corner() {
    let map = Minimap::layout(&[Point::new(50.0, 50.0)]);
    let corner = map.world_to_minimap(Point::new(map.world_bounds.min_x, map.world_bounds.min_y));
    assert!(approx_eq(corner.x, MINIMAP_PADDING));
    assert!(approx_eq(corner.y, MINIMAP_PADDING));
}

#[test]
fn viewport_rect_tracks_camera() {
    let map = Minimap::layout(&[Point::new(0.0, 0.0)]);
    let camera = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 };
    let viewport = Size::new(800.0, 600.0);

    let rect = map.viewport_rect(&camera, viewport);
    // Visible world is (0,0)..(800,600); check its projection.
    let tl = map.world_to_minimap(Point::new(0.0, 0.0));
    let br = map.world_to_minimap(Point::new(800.0, 600.0));
    assert!(approx_eq(rect.min_x, tl.x));
    assert!(approx_eq(rect.max_y, br.y));
}

#[test]
fn viewport_rect_grows_when_zooming_out() {
    let map = Minimap::layout(&[Point::new(0.0, 0.0)]);
    let viewport = Size::new(800.0, 600.0);

    let near = map.viewport_rect(&Camera { pan_x: 0.0, pan_y: 0.0, zoom: 2.0 }, viewport);
    let far = map.viewport_rect(&Camera { pan_x: 0.0, pan_y: 0.0, zoom: 0.5 }, viewport);
    assert!(far.width() > near.width());
    assert!(far.height() > near.height());
}

#[test]
fn card_markers_have_card_proportions() {
    let map = Minimap::layout(&[Point::new(0.0, 0.0), Point::new(400.0, 400.0)]);
    let markers = map.card_markers(&[Point::new(0.0, 0.0), Point::new(400.0, 400.0)]);
    assert_eq!(markers.len(), 2);
    for marker in markers {
        assert!(approx_eq(marker.width(), CARD_WIDTH * map.scale));
        assert!(approx_eq(marker.height(), CARD_HEIGHT * map.scale));
    }
}

#[test]
fn pointer_clamps_to_padded_square() {
    let map = Minimap::layout(&[Point::new(0.0, 0.0)]);
    // Pointer far past the top-left corner clamps onto the padding edge.
    let world = map.world_from_pointer(Point::new(-50.0, -50.0));
    let corner = map.minimap_to_world(Point::new(MINIMAP_PADDING, MINIMAP_PADDING));
    assert!(approx_eq(world.x, corner.x));
    assert!(approx_eq(world.y, corner.y));

    // And past the bottom-right corner onto the opposite edge.
    let world = map.world_from_pointer(Point::new(1e6, 1e6));
    let corner = map.minimap_to_world(Point::new(
        MINIMAP_SIZE - MINIMAP_PADDING,
        MINIMAP_SIZE - MINIMAP_PADDING,
    ));
    assert!(approx_eq(world.x, corner.x));
    assert!(approx_eq(world.y, corner.y));
}

#[test]
fn pointer_inside_maps_through_inverse() {
    let map = Minimap::layout(&[Point::new(100.0, 100.0)]);
    let pointer = Point::new(90.0, 120.0);
    let world = map.world_from_pointer(pointer);
    let direct = map.minimap_to_world(pointer);
    assert!(approx_eq(world.x, direct.x));
    assert!(approx_eq(world.y, direct.y));
}
