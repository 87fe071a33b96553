//! Reference entities and the immutable lookup tables built from them.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::place::PlaceSource;

/// The four entity tables an external id can resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Country,
    Admin1,
    Admin2,
    Place,
}

impl EntityKind {
    /// One-letter tag written on alternate-name rows.
    pub fn type_code(&self) -> char {
        match self {
            EntityKind::Country => 'c',
            EntityKind::Admin1 => 'a',
            EntityKind::Admin2 => 'd',
            EntityKind::Place => 'p',
        }
    }
}

/// A country, state/province, or county/district row from a reference feed.
///
/// For countries `code` holds the 3-letter form (the 2-letter form is the
/// table key); for admin levels it holds the dotted feed code
/// (`US.29`, `US.29.189`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEntity {
    pub name: String,
    /// Canonical match key derived from `name` (ASCII, ≤40 chars).
    pub key: String,
    pub code: String,
    pub external_id: i64,
    pub source: PlaceSource,
}

/// Immutable code→name tables loaded once at startup and shared read-only
/// by every resolver call for the rest of the run.
#[derive(Debug, Default)]
pub struct ReferenceData {
    /// 2-letter country code → entity (entity.code carries the 3-letter form).
    countries: HashMap<String, ReferenceEntity>,
    /// `CC.A1` → entity.
    admin1: HashMap<String, ReferenceEntity>,
    /// `CC.A1.A2` → entity.
    admin2: HashMap<String, ReferenceEntity>,
    /// External id → table key, one index per table so lookups keep the
    /// table priority explicit.
    country_ids: HashMap<i64, String>,
    admin1_ids: HashMap<i64, String>,
    admin2_ids: HashMap<i64, String>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_country(&mut self, iso2: &str, entity: ReferenceEntity) {
        let iso2 = iso2.to_uppercase();
        self.country_ids.insert(entity.external_id, iso2.clone());
        self.countries.insert(iso2, entity);
    }

    pub fn add_admin1(&mut self, entity: ReferenceEntity) {
        self.admin1_ids
            .insert(entity.external_id, entity.code.clone());
        self.admin1.insert(entity.code.clone(), entity);
    }

    pub fn add_admin2(&mut self, entity: ReferenceEntity) {
        self.admin2_ids
            .insert(entity.external_id, entity.code.clone());
        self.admin2.insert(entity.code.clone(), entity);
    }

    /// Look up a country by its 2-letter feed code.
    pub fn country(&self, iso2: &str) -> Option<&ReferenceEntity> {
        self.countries.get(iso2.to_uppercase().as_str())
    }

    /// Look up a first-level division by its dotted code (`US.29`).
    pub fn admin1(&self, code: &str) -> Option<&ReferenceEntity> {
        self.admin1.get(code)
    }

    /// Look up a second-level division by its dotted code (`US.29.189`).
    pub fn admin2(&self, code: &str) -> Option<&ReferenceEntity> {
        self.admin2.get(code)
    }

    /// Resolve an external id against the reference tables, most specific
    /// first. Places live in the store and are checked by callers before
    /// this.
    pub fn entity_by_external_id(&self, id: i64) -> Option<(EntityKind, &ReferenceEntity)> {
        if let Some(code) = self.admin2_ids.get(&id) {
            return self.admin2.get(code).map(|e| (EntityKind::Admin2, e));
        }
        if let Some(code) = self.admin1_ids.get(&id) {
            return self.admin1.get(code).map(|e| (EntityKind::Admin1, e));
        }
        if let Some(iso2) = self.country_ids.get(&id) {
            return self.countries.get(iso2).map(|e| (EntityKind::Country, e));
        }
        None
    }
}
