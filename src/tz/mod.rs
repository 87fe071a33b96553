//! Timezone boundary polygons and the fixed-grid index over them.

pub mod index;
pub mod polygon;
pub mod service;

pub use index::TzIndex;
pub use polygon::{load_polygons, TzPolygon};
pub use service::load_shared;
