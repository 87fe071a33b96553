//! Alternate names and postal assignments.

use serde::{Deserialize, Serialize};

use super::reference::EntityKind;

/// Usage flags carried on an alternate-name feed row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFlags {
    pub preferred: bool,
    pub short: bool,
    pub colloquial: bool,
    pub historic: bool,
}

/// A name variant attached to a canonical entity. Only created when the
/// normalized form differs from the owner's own name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternateName {
    pub name: String,
    pub key: String,
    /// ISO language code, or an empty string for unlabelled variants.
    pub language: String,
    pub owner_kind: EntityKind,
    /// Feed external id of the owning entity.
    pub owner_id: i64,
    pub flags: NameFlags,
}

/// A postal code anchored to a place.
///
/// `owner_place_id` points at the canonical place covering the postal
/// point; when no place matched within tolerance, a synthetic place is
/// created first and its id used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostalAssignment {
    pub country: String,
    pub postal_code: String,
    pub name: String,
    pub admin1: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_place_id: Option<i64>,
}
