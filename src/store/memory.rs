//! In-memory store used by tests and dry runs.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use hashbrown::HashMap;
use tracing::debug;

use super::{BoundingBox, PlaceStore, Result, StoreError};
use crate::models::{
    AlternateName, CanonicalPlace, EntityKind, PlaceRefresh, PostalAssignment, ReferenceEntity,
    StoredPlace,
};

type AltKey = (EntityKind, i64, String, String);
type PostalKey = (String, String, String);

#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    countries: Mutex<HashMap<String, ReferenceEntity>>,
    admin1: Mutex<HashMap<String, ReferenceEntity>>,
    admin2: Mutex<HashMap<String, ReferenceEntity>>,
    places: Mutex<HashMap<i64, CanonicalPlace>>,
    alternates: Mutex<HashMap<AltKey, AlternateName>>,
    postal: Mutex<HashMap<PostalKey, PostalAssignment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn place_count(&self) -> usize {
        self.places.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn alternate_count(&self) -> usize {
        self.alternates.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn postal_count(&self) -> usize {
        self.postal.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn postal_assignments(&self) -> Vec<PostalAssignment> {
        self.postal
            .lock()
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| StoreError::LockPoisoned)
}

#[async_trait]
impl PlaceStore for MemoryStore {
    async fn upsert_country(&self, entity: &ReferenceEntity) -> Result<()> {
        lock(&self.countries)?.insert(entity.code.clone(), entity.clone());
        Ok(())
    }

    async fn upsert_admin1(&self, entity: &ReferenceEntity) -> Result<()> {
        lock(&self.admin1)?.insert(entity.code.clone(), entity.clone());
        Ok(())
    }

    async fn upsert_admin2(&self, entity: &ReferenceEntity) -> Result<()> {
        lock(&self.admin2)?.insert(entity.code.clone(), entity.clone());
        Ok(())
    }

    async fn insert_place(&self, place: &CanonicalPlace) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.places)?.insert(id, place.clone());
        debug!(id, key = %place.key, source = %place.source, "inserted place");
        Ok(id)
    }

    async fn refresh_place(&self, id: i64, refresh: &PlaceRefresh) -> Result<()> {
        let mut places = lock(&self.places)?;
        let place = places.get_mut(&id).ok_or(StoreError::MissingPlace(id))?;
        place.latitude = refresh.latitude;
        place.longitude = refresh.longitude;
        place.population = refresh.population;
        place.rank = refresh.rank;
        if refresh.timezone.is_some() {
            place.timezone = refresh.timezone.clone();
        }
        place.updated_at = refresh.updated_at;
        debug!(id, key = %place.key, "refreshed place");
        Ok(())
    }

    async fn place_by_external_id(&self, external_id: i64) -> Result<Option<StoredPlace>> {
        let places = lock(&self.places)?;
        Ok(places
            .iter()
            .find(|(_, p)| p.external_id == Some(external_id))
            .map(|(id, p)| StoredPlace {
                id: *id,
                place: p.clone(),
            }))
    }

    async fn places_in_box(&self, bbox: BoundingBox) -> Result<Vec<StoredPlace>> {
        let places = lock(&self.places)?;
        let mut hits: Vec<StoredPlace> = places
            .iter()
            .filter(|(_, p)| bbox.contains(p.latitude, p.longitude))
            .map(|(id, p)| StoredPlace {
                id: *id,
                place: p.clone(),
            })
            .collect();
        hits.sort_by_key(|s| s.id);
        Ok(hits)
    }

    async fn places(&self) -> Result<Vec<StoredPlace>> {
        let places = lock(&self.places)?;
        let mut all: Vec<StoredPlace> = places
            .iter()
            .map(|(id, p)| StoredPlace {
                id: *id,
                place: p.clone(),
            })
            .collect();
        all.sort_by_key(|s| s.id);
        Ok(all)
    }

    async fn upsert_alternate_name(&self, name: &AlternateName) -> Result<()> {
        let key = (
            name.owner_kind,
            name.owner_id,
            name.language.clone(),
            name.name.clone(),
        );
        lock(&self.alternates)?.insert(key, name.clone());
        Ok(())
    }

    async fn upsert_postal(&self, postal: &PostalAssignment) -> Result<()> {
        let key = (
            postal.country.clone(),
            postal.postal_code.clone(),
            postal.name.clone(),
        );
        lock(&self.postal)?.insert(key, postal.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlaceSource;
    use chrono::Utc;

    fn place(key: &str, lat: f64, lon: f64, external_id: Option<i64>) -> CanonicalPlace {
        CanonicalPlace {
            key: key.to_string(),
            display_name: key.to_string(),
            admin2: None,
            admin1: "IL".to_string(),
            country: "USA".to_string(),
            latitude: lat,
            longitude: lon,
            elevation: None,
            population: 0,
            timezone: Some("America/Chicago".to_string()),
            feature_code: "PPL".to_string(),
            rank: 0,
            phonetic1: String::new(),
            phonetic2: None,
            source: PlaceSource::Gazetteer,
            external_id,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert_place(&place("A", 0.0, 0.0, None)).await.unwrap();
        let b = store.insert_place(&place("B", 0.0, 0.0, None)).await.unwrap();
        assert!(b > a);
        assert_eq!(store.place_count(), 2);
    }

    #[tokio::test]
    async fn box_query_is_inclusive_of_edges() {
        let store = MemoryStore::new();
        store.insert_place(&place("IN", 41.0, -87.0, None)).await.unwrap();
        store.insert_place(&place("EDGE", 41.25, -87.0, None)).await.unwrap();
        store.insert_place(&place("OUT", 43.0, -87.0, None)).await.unwrap();

        let hits = store
            .places_in_box(BoundingBox::around(41.0, -87.0, 0.25))
            .await
            .unwrap();
        let keys: Vec<&str> = hits.iter().map(|s| s.place.key.as_str()).collect();
        assert_eq!(keys, vec!["IN", "EDGE"]);
    }

    #[tokio::test]
    async fn refresh_keeps_existing_timezone_when_absent() {
        let store = MemoryStore::new();
        let id = store.insert_place(&place("A", 1.0, 2.0, Some(7))).await.unwrap();

        let mut refresh = PlaceRefresh {
            latitude: 1.5,
            longitude: 2.5,
            population: 100,
            rank: 3,
            timezone: None,
            updated_at: Utc::now(),
        };
        store.refresh_place(id, &refresh).await.unwrap();
        let stored = store.place_by_external_id(7).await.unwrap().unwrap();
        assert_eq!(stored.place.latitude, 1.5);
        assert_eq!(stored.place.timezone.as_deref(), Some("America/Chicago"));

        refresh.timezone = Some("America/New_York".to_string());
        store.refresh_place(id, &refresh).await.unwrap();
        let stored = store.place_by_external_id(7).await.unwrap().unwrap();
        assert_eq!(stored.place.timezone.as_deref(), Some("America/New_York"));
    }

    #[tokio::test]
    async fn alternate_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let name = AlternateName {
            name: "Chicagoland".to_string(),
            key: "CHICAGOLAND".to_string(),
            language: "en".to_string(),
            owner_kind: EntityKind::Place,
            owner_id: 1,
            flags: Default::default(),
        };
        store.upsert_alternate_name(&name).await.unwrap();
        store.upsert_alternate_name(&name).await.unwrap();
        assert_eq!(store.alternate_count(), 1);
    }
}
