//! Canonical place and raw feed record structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a canonical place row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceSource {
    /// Loaded from the authoritative gazetteer feed.
    Gazetteer,
    /// Created by this pipeline to anchor a derived record (e.g. a postal
    /// code with no matching place). Low confidence; future runs must be
    /// able to tell these apart from feed rows.
    Synthetic,
}

impl std::fmt::Display for PlaceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceSource::Gazetteer => write!(f, "gazetteer"),
            PlaceSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Feature classes admitted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureClass {
    /// Populated place (class `P`).
    Populated,
    /// Terrain feature (class `T`).
    Terrain,
}

impl FeatureClass {
    /// Map a raw one-letter feed class to a known class.
    pub fn parse(class: &str) -> Option<Self> {
        match class {
            "P" => Some(FeatureClass::Populated),
            "T" => Some(FeatureClass::Terrain),
            _ => None,
        }
    }
}

/// One line of a places feed, exactly as parsed. Immutable input; records
/// are filtered and resolved before anything reaches [`CanonicalPlace`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlaceRecord {
    /// Source identifier, unique within the feed.
    pub external_id: i64,
    pub name: String,
    pub ascii_name: String,
    /// Comma-separated in the feed; split at parse time.
    pub alternate_names: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// One-letter feature class as shipped (`P`, `T`, `H`, ...).
    pub feature_class: String,
    pub feature_code: String,
    /// Two-letter country code as shipped.
    pub country_code: String,
    pub admin1_code: String,
    pub admin2_code: String,
    pub population: i64,
    pub elevation: Option<i32>,
    /// Empty when the feed has no timezone for this row.
    pub timezone: String,
}

/// A canonicalized, deduplicated place row.
///
/// `key` is a deterministic function of `display_name` and is not unique:
/// same-named places collide on it and are told apart by country/admin and
/// coordinate proximity. `external_id` is the primary dedup anchor when
/// present; synthetic rows have none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalPlace {
    /// ASCII-folded, uppercased, stripped, ≤40-char match key.
    pub key: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin2: Option<String>,
    /// Canonical state/province (2-letter where US/CA mapping applies).
    pub admin1: String,
    /// Three-letter country code, or a 2-char + `?` fallback when the feed
    /// code could not be resolved.
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<i32>,
    pub population: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub feature_code: String,
    /// Search tie-break signal; ties are legal.
    pub rank: i32,
    pub phonetic1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic2: Option<String>,
    pub source: PlaceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<i64>,
    /// Refreshed on every upsert.
    pub updated_at: DateTime<Utc>,
}

impl CanonicalPlace {
    pub fn is_synthetic(&self) -> bool {
        self.source == PlaceSource::Synthetic
    }
}

/// A canonical place together with its store-assigned row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPlace {
    pub id: i64,
    pub place: CanonicalPlace,
}

/// The mutable subset of [`CanonicalPlace`] a duplicate refreshes in the
/// store. Key, display name, source, and external id stay authoritative.
#[derive(Debug, Clone)]
pub struct PlaceRefresh {
    pub latitude: f64,
    pub longitude: f64,
    pub population: i64,
    pub rank: i32,
    pub timezone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PlaceRefresh {
    pub fn from_place(place: &CanonicalPlace) -> Self {
        Self {
            latitude: place.latitude,
            longitude: place.longitude,
            population: place.population,
            rank: place.rank,
            timezone: place.timezone.clone(),
            updated_at: place.updated_at,
        }
    }
}
