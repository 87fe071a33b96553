//! Load-once access to the timezone index.
//!
//! Building the grid is a one-time initialization; later calls reuse the
//! already-built index rather than re-reading the polygon file.

use std::path::Path;

use once_cell::sync::OnceCell;

use super::{polygon, TzIndex};

static SHARED: OnceCell<TzIndex> = OnceCell::new();

/// Build the shared index from a GeoJSON file, or hand back the one that
/// was already built this process.
pub fn load_shared(path: &Path) -> anyhow::Result<&'static TzIndex> {
    if let Some(index) = SHARED.get() {
        return Ok(index);
    }
    let index = TzIndex::build(polygon::load_polygons(path)?);
    Ok(SHARED.get_or_init(|| index))
}
