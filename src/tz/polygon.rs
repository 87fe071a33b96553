//! Timezone boundary polygons loaded from a GeoJSON feature collection.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context;
use flate2::read::GzDecoder;
use geo::{LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use tracing::{debug, info};

/// A single timezone boundary with its identifier.
#[derive(Debug, Clone)]
pub struct TzPolygon {
    pub tzid: String,
    pub geometry: MultiPolygon<f64>,
}

impl TzPolygon {
    /// Bounding box as `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        use geo::BoundingRect;
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    geometry: Geometry,
}

#[derive(Deserialize, Default)]
struct Properties {
    tzid: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

/// Positions may carry a third altitude element; only lon and lat are
/// kept, anything shorter than two elements is dropped.
fn ring(coords: Vec<Vec<f64>>) -> LineString<f64> {
    LineString::from(
        coords
            .into_iter()
            .filter_map(|pos| match pos.as_slice() {
                [x, y, ..] => Some((*x, *y)),
                _ => None,
            })
            .collect::<Vec<_>>(),
    )
}

/// First ring is the exterior, the rest are holes.
fn polygon(mut rings: Vec<Vec<Vec<f64>>>) -> Option<Polygon<f64>> {
    if rings.is_empty() {
        return None;
    }
    let exterior = ring(rings.remove(0));
    let interiors = rings.into_iter().map(ring).collect();
    Some(Polygon::new(exterior, interiors))
}

impl Geometry {
    fn into_multi(self) -> MultiPolygon<f64> {
        match self {
            Geometry::Polygon { coordinates } => {
                MultiPolygon(polygon(coordinates).into_iter().collect())
            }
            Geometry::MultiPolygon { coordinates } => {
                MultiPolygon(coordinates.into_iter().filter_map(polygon).collect())
            }
        }
    }
}

fn collection_from_reader<R: Read>(reader: R) -> anyhow::Result<Vec<TzPolygon>> {
    let collection: FeatureCollection =
        serde_json::from_reader(reader).context("parsing timezone GeoJSON")?;

    let mut polygons = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(tzid) = feature.properties.tzid else {
            debug!("skipping timezone feature without tzid");
            continue;
        };
        let geometry = feature.geometry.into_multi();
        if geometry.0.is_empty() {
            debug!(%tzid, "skipping timezone feature with empty geometry");
            continue;
        }
        polygons.push(TzPolygon { tzid, geometry });
    }
    Ok(polygons)
}

/// Load every usable timezone polygon from a GeoJSON file. Gzip input is
/// handled transparently by extension.
pub fn load_polygons(path: &Path) -> anyhow::Result<Vec<TzPolygon>> {
    let file = File::open(path)
        .with_context(|| format!("opening timezone boundaries {}", path.display()))?;
    let reader = BufReader::new(file);

    let polygons = if path.extension().is_some_and(|e| e == "gz") {
        collection_from_reader(GzDecoder::new(reader))?
    } else {
        collection_from_reader(reader)?
    };

    info!(count = polygons.len(), "loaded timezone polygons");
    Ok(polygons)
}
