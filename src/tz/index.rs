//! Fixed-grid spatial index over timezone polygons.
//!
//! The globe is cut into 24 longitude bands by 12 latitude bands (15°
//! cells). Each polygon is registered in every cell its bounding box
//! spans; a query tests exact containment only against the owning cell's
//! candidates.

use geo::{Contains, Point};
use tracing::info;

use super::TzPolygon;

pub const GRID_COLS: usize = 24;
pub const GRID_ROWS: usize = 12;
const CELL_DEG: f64 = 15.0;

/// Built once, read-only afterwards.
pub struct TzIndex {
    polygons: Vec<TzPolygon>,
    cells: Vec<Vec<u32>>,
}

/// Shift a bbox into the `[0, 360)` longitude domain. Negative bounds
/// move up by 360°, then the upper bound is extended until it is not
/// below the lower one, so antimeridian-crossing boxes stay contiguous.
fn normalize_lon_span(min_lon: f64, max_lon: f64) -> (f64, f64) {
    let min = if min_lon < 0.0 { min_lon + 360.0 } else { min_lon };
    let mut max = if max_lon < 0.0 { max_lon + 360.0 } else { max_lon };
    while max < min {
        max += 360.0;
    }
    (min, max)
}

fn row_of(lat: f64) -> usize {
    (((lat + 90.0) / CELL_DEG) as usize).min(GRID_ROWS - 1)
}

fn col_of(lon: f64) -> usize {
    ((lon.rem_euclid(360.0) / CELL_DEG) as usize).min(GRID_COLS - 1)
}

impl TzIndex {
    /// Register every polygon in each grid cell its bbox overlaps.
    pub fn build(polygons: Vec<TzPolygon>) -> Self {
        let mut cells: Vec<Vec<u32>> = vec![Vec::new(); GRID_COLS * GRID_ROWS];

        for (idx, polygon) in polygons.iter().enumerate() {
            let Some((min_lon, min_lat, max_lon, max_lat)) = polygon.bbox() else {
                continue;
            };
            let row_lo = row_of(min_lat);
            let row_hi = row_of(max_lat);
            // A bbox covering the full circle spans every column; the
            // shift rule would collapse it to a zero-width span.
            let (col_lo, col_hi) = if max_lon - min_lon >= 360.0 {
                (0, GRID_COLS - 1)
            } else {
                let (min_lon, max_lon) = normalize_lon_span(min_lon, max_lon);
                ((min_lon / CELL_DEG) as usize, (max_lon / CELL_DEG) as usize)
            };

            for row in row_lo..=row_hi {
                for col in col_lo..=col_hi {
                    cells[row * GRID_COLS + col % GRID_COLS].push(idx as u32);
                }
            }
        }

        let occupied = cells.iter().filter(|c| !c.is_empty()).count();
        info!(
            polygons = polygons.len(),
            occupied_cells = occupied,
            "built timezone grid index"
        );

        Self { polygons, cells }
    }

    /// Exact point-to-timezone lookup. First containing polygon in load
    /// order wins; `None` when no loaded polygon covers the point.
    pub fn find_timezone(&self, lat: f64, lon: f64) -> Option<&str> {
        let point = Point::new(lon, lat);
        let cell = &self.cells[row_of(lat) * GRID_COLS + col_of(lon)];

        cell.iter()
            .map(|&idx| &self.polygons[idx as usize])
            .find(|p| p.geometry.contains(&point))
            .map(|p| p.tzid.as_str())
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}
