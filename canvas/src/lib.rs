//! Canvas geometry for ideaboard: the pan/zoom camera and the minimap.
//!
//! Everything here is pure coordinate math with no knowledge of the network
//! or the card model — positions come in, geometry goes out. The camera owns
//! the world/screen affine transform; the minimap derives a scaled overview
//! through the inverse of the same transform.

pub mod camera;
pub mod consts;
pub mod minimap;

pub use camera::{Camera, Point, Rect, Size};
pub use minimap::Minimap;
