//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Lower zoom bound.
pub const MIN_ZOOM: f64 = 0.25;

/// Upper zoom bound.
pub const MAX_ZOOM: f64 = 2.0;

/// Screen-pixel padding added around content by `fit_to_bounds`.
pub const FIT_PADDING: f64 = 100.0;

// ── Cards ───────────────────────────────────────────────────────

/// Card footprint in world units.
pub const CARD_WIDTH: f64 = 224.0;
pub const CARD_HEIGHT: f64 = 206.0;

// ── Minimap ─────────────────────────────────────────────────────

/// Minimap edge length in pixels (square).
pub const MINIMAP_SIZE: f64 = 194.0;

/// Inner padding of the minimap, in minimap pixels.
pub const MINIMAP_PADDING: f64 = 8.0;

/// World-space margin added around the card bounding box.
pub const MINIMAP_WORLD_PADDING: f64 = 200.0;

/// Half-extent of the default world box shown when the board is empty.
pub const EMPTY_WORLD_HALF_EXTENT: f64 = 500.0;
