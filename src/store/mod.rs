//! Storage collaborator for the ingestion pipeline.
//!
//! The pipeline only ever talks to the [`PlaceStore`] trait: upserts keyed
//! by natural keys, generated-id inserts for places, and the bounding-box
//! proximity query the dedup and timezone fallbacks are built on. Every
//! write is idempotent so a full re-run is always safe.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    AlternateName, CanonicalPlace, PlaceRefresh, PostalAssignment, ReferenceEntity, StoredPlace,
};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no place with id {0}")]
    MissingPlace(i64),
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("store backend: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Latitude/longitude window for proximity queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Square box of `half` degrees on each side of a center point.
    pub fn around(lat: f64, lon: f64, half: f64) -> Self {
        Self {
            min_lat: lat - half,
            max_lat: lat + half,
            min_lon: lon - half,
            max_lon: lon + half,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Destination store contract.
#[async_trait]
pub trait PlaceStore: Send + Sync {
    // Reference tables, upsert by natural code key
    async fn upsert_country(&self, entity: &ReferenceEntity) -> Result<()>;
    async fn upsert_admin1(&self, entity: &ReferenceEntity) -> Result<()>;
    async fn upsert_admin2(&self, entity: &ReferenceEntity) -> Result<()>;

    // Place operations
    async fn insert_place(&self, place: &CanonicalPlace) -> Result<i64>;
    async fn refresh_place(&self, id: i64, refresh: &PlaceRefresh) -> Result<()>;
    async fn place_by_external_id(&self, external_id: i64) -> Result<Option<StoredPlace>>;
    async fn places_in_box(&self, bbox: BoundingBox) -> Result<Vec<StoredPlace>>;
    async fn places(&self) -> Result<Vec<StoredPlace>>;

    // Alternate names, upsert by (owner, language, name)
    async fn upsert_alternate_name(&self, name: &AlternateName) -> Result<()>;

    // Postal codes, upsert by (country, code, name)
    async fn upsert_postal(&self, postal: &PostalAssignment) -> Result<()>;
}
