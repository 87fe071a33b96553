//! Close-neighbor scan over a legacy/manual dataset.
//!
//! Flags same-class place pairs within a few kilometers of each other for
//! human review. Never merges anything.

use geo::{Distance, Haversine, Point};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use crate::models::RawPlaceRecord;

/// Pairs closer than this (great-circle meters) are flagged.
pub const CLOSE_NEIGHBOR_METERS: f64 = 3_000.0;

/// Approximate meters per degree of latitude, for candidate envelopes.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// The slice of a place the scan needs.
#[derive(Debug, Clone)]
pub struct ScanPlace {
    pub id: i64,
    pub name: String,
    /// Feature class or code; only the leading letter is compared.
    pub class: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ScanPlace {
    fn class_letter(&self) -> Option<char> {
        self.class.chars().next()
    }
}

impl From<&RawPlaceRecord> for ScanPlace {
    fn from(record: &RawPlaceRecord) -> Self {
        Self {
            id: record.external_id,
            name: record.name.clone(),
            class: record.feature_class.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

/// A flagged pair, closest first in the scan output.
#[derive(Debug, Clone)]
pub struct CloseNeighbor {
    pub a_id: i64,
    pub a_name: String,
    pub b_id: i64,
    pub b_name: String,
    pub meters: f64,
}

/// Wrapper for R-tree indexing of scan points.
struct IndexedPlace {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPlace {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Candidate window around a point, padded past the flag radius. Longitude
/// widens with latitude; above roughly 87 degrees the window covers every
/// longitude.
fn candidate_envelope(lat: f64, lon: f64) -> AABB<[f64; 2]> {
    let lat_half = CLOSE_NEIGHBOR_METERS / METERS_PER_DEGREE * 1.2;
    let cos_lat = lat.to_radians().cos().abs();
    if cos_lat < 0.05 {
        return AABB::from_corners([-180.0, lat - lat_half], [180.0, lat + lat_half]);
    }
    let lon_half = lat_half / cos_lat;
    AABB::from_corners([lon - lon_half, lat - lat_half], [lon + lon_half, lat + lat_half])
}

/// Scan a dataset for same-class pairs within [`CLOSE_NEIGHBOR_METERS`].
/// Each unordered pair is reported once; output is sorted closest first.
pub fn find_close_neighbors(places: &[ScanPlace]) -> Vec<CloseNeighbor> {
    let indexed: Vec<IndexedPlace> = places
        .iter()
        .enumerate()
        .map(|(idx, p)| IndexedPlace {
            idx,
            envelope: AABB::from_point([p.longitude, p.latitude]),
        })
        .collect();
    let tree = RTree::bulk_load(indexed);

    let mut pairs = Vec::new();
    for item in tree.iter() {
        let place = &places[item.idx];
        let Some(letter) = place.class_letter() else {
            continue;
        };
        let envelope = candidate_envelope(place.latitude, place.longitude);
        for candidate in tree.locate_in_envelope_intersecting(&envelope) {
            // Visit each unordered pair once.
            if candidate.idx <= item.idx {
                continue;
            }
            let other = &places[candidate.idx];
            if other.class_letter() != Some(letter) {
                continue;
            }
            let meters = Haversine.distance(
                Point::new(place.longitude, place.latitude),
                Point::new(other.longitude, other.latitude),
            );
            if meters <= CLOSE_NEIGHBOR_METERS {
                pairs.push(CloseNeighbor {
                    a_id: place.id,
                    a_name: place.name.clone(),
                    b_id: other.id,
                    b_name: other.name.clone(),
                    meters,
                });
            }
        }
    }

    pairs.sort_by(|a, b| a.meters.total_cmp(&b.meters));
    info!(scanned = places.len(), flagged = pairs.len(), "close-neighbor scan done");
    pairs
}
