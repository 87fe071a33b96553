//! Gazetteer - place-name ingestion and canonicalization
//!
//! This library provides shared types and modules for the ingest and review binaries.

pub mod feeds;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod store;
pub mod tz;

pub use models::{CanonicalPlace, RawPlaceRecord, ReferenceData, StoredPlace};
