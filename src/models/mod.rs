//! Core data models for the gazetteer pipeline.

pub mod names;
pub mod place;
pub mod reference;

pub use names::{AlternateName, NameFlags, PostalAssignment};
pub use place::{
    CanonicalPlace, FeatureClass, PlaceRefresh, PlaceSource, RawPlaceRecord, StoredPlace,
};
pub use reference::{EntityKind, ReferenceData, ReferenceEntity};
