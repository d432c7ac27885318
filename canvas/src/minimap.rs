//! Minimap layout: a scaled-down overview of the card field and viewport.
//!
//! The layout is a pure function of the card positions and the camera. World
//! bounds are the padded bounding box of all cards (a fixed default box when
//! the board is empty), squeezed uniformly into a fixed-size square. The
//! world↔minimap mapping is the same affine form as the camera transform, so
//! drag-to-navigate and wheel zoom invert cleanly back to world coordinates.

#[cfg(test)]
#[path = "minimap_test.rs"]
mod minimap_test;

use crate::camera::{Camera, Point, Rect, Size};
use crate::consts::{
    CARD_HEIGHT, CARD_WIDTH, EMPTY_WORLD_HALF_EXTENT, MINIMAP_PADDING, MINIMAP_SIZE,
    MINIMAP_WORLD_PADDING,
};

/// Computed minimap geometry for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Minimap {
    /// Padded world bounding box represented by the minimap.
    pub world_bounds: Rect,
    /// Uniform world→minimap scale.
    pub scale: f64,
    /// Edge length of the minimap square, in pixels.
    pub size: f64,
}

impl Minimap {
    /// Lay out the minimap for the given card positions (top-left corners).
    #[must_use]
    pub fn layout(card_positions: &[Point]) -> Self {
        let world_bounds = world_bounds(card_positions);
        let usable = MINIMAP_SIZE - MINIMAP_PADDING * 2.0;
        let scale = (usable / world_bounds.width()).min(usable / world_bounds.height());
        Self { world_bounds, scale, size: MINIMAP_SIZE }
    }

    /// Map a world point into minimap pixels.
    #[must_use]
    pub fn world_to_minimap(&self, world: Point) -> Point {
        Point {
            x: MINIMAP_PADDING + (world.x - self.world_bounds.min_x) * self.scale,
            y: MINIMAP_PADDING + (world.y - self.world_bounds.min_y) * self.scale,
        }
    }

    /// Map a minimap pixel back into world coordinates.
    #[must_use]
    pub fn minimap_to_world(&self, minimap: Point) -> Point {
        Point {
            x: self.world_bounds.min_x + (minimap.x - MINIMAP_PADDING) / self.scale,
            y: self.world_bounds.min_y + (minimap.y - MINIMAP_PADDING) / self.scale,
        }
    }

    /// The camera's visible world rectangle, in minimap pixels.
    #[must_use]
    pub fn viewport_rect(&self, camera: &Camera, viewport: Size) -> Rect {
        let world = camera.visible_world(viewport);
        let tl = self.world_to_minimap(Point::new(world.min_x, world.min_y));
        let br = self.world_to_minimap(Point::new(world.max_x, world.max_y));
        Rect { min_x: tl.x, min_y: tl.y, max_x: br.x, max_y: br.y }
    }

    /// Card markers in minimap pixels, one rect per card footprint.
    #[must_use]
    pub fn card_markers(&self, card_positions: &[Point]) -> Vec<Rect> {
        card_positions
            .iter()
            .map(|p| {
                let tl = self.world_to_minimap(*p);
                let br = self.world_to_minimap(Point::new(p.x + CARD_WIDTH, p.y + CARD_HEIGHT));
                Rect { min_x: tl.x, min_y: tl.y, max_x: br.x, max_y: br.y }
            })
            .collect()
    }

    /// Resolve a pointer position on the minimap (relative to its top-left
    /// corner) to world coordinates, clamping into the padded square so drags
    /// past the edge stay on the map.
    #[must_use]
    pub fn world_from_pointer(&self, pointer: Point) -> Point {
        let x = pointer.x.clamp(MINIMAP_PADDING, self.size - MINIMAP_PADDING);
        let y = pointer.y.clamp(MINIMAP_PADDING, self.size - MINIMAP_PADDING);
        self.minimap_to_world(Point::new(x, y))
    }
}

/// Padded bounding box of all card footprints, or the default box when empty.
fn world_bounds(card_positions: &[Point]) -> Rect {
    if card_positions.is_empty() {
        return Rect::new(
            -EMPTY_WORLD_HALF_EXTENT,
            -EMPTY_WORLD_HALF_EXTENT,
            EMPTY_WORLD_HALF_EXTENT,
            EMPTY_WORLD_HALF_EXTENT,
        );
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for p in card_positions {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x + CARD_WIDTH);
        max_y = max_y.max(p.y + CARD_HEIGHT);
    }

    Rect {
        min_x: min_x - MINIMAP_WORLD_PADDING,
        min_y: min_y - MINIMAP_WORLD_PADDING,
        max_x: max_x + MINIMAP_WORLD_PADDING,
        max_y: max_y + MINIMAP_WORLD_PADDING,
    }
}
