//! Disposition of a resolved record against the destination store.

use crate::models::{CanonicalPlace, EntityKind, ReferenceData, StoredPlace};
use crate::store::{BoundingBox, PlaceStore, Result};

/// Coordinate tolerance (half-width, degrees) for the duplicate check.
pub const DUP_BOX_HALF: f64 = 0.25;

/// What the pipeline should do with a record.
#[derive(Debug)]
pub enum Disposition {
    /// Same key, country, and admin1 nearby: refresh the stored row.
    Duplicate(StoredPlace),
    /// The external id already names a known entity; the record's name
    /// becomes an alternate name of that entity. `owner_key` is the
    /// entity's own canonical key, so callers can drop names that fold
    /// to the same thing.
    AlternateOf {
        kind: EntityKind,
        owner_external_id: i64,
        owner_key: String,
    },
    /// Nothing matched; insert as a new place.
    New,
}

/// Duplicate check first, then the known-name tables in priority order
/// (place, admin2, admin1, country).
pub async fn classify(
    place: &CanonicalPlace,
    reference: &ReferenceData,
    store: &dyn PlaceStore,
) -> Result<Disposition> {
    let nearby = store
        .places_in_box(BoundingBox::around(
            place.latitude,
            place.longitude,
            DUP_BOX_HALF,
        ))
        .await?;
    if let Some(existing) = nearby.into_iter().find(|stored| {
        stored.place.key == place.key
            && stored.place.country == place.country
            && stored.place.admin1 == place.admin1
    }) {
        return Ok(Disposition::Duplicate(existing));
    }

    if let Some(external_id) = place.external_id {
        if let Some(stored) = store.place_by_external_id(external_id).await? {
            return Ok(Disposition::AlternateOf {
                kind: EntityKind::Place,
                owner_external_id: external_id,
                owner_key: stored.place.key,
            });
        }
        if let Some((kind, entity)) = reference.entity_by_external_id(external_id) {
            return Ok(Disposition::AlternateOf {
                kind,
                owner_external_id: external_id,
                owner_key: entity.key.clone(),
            });
        }
    }

    Ok(Disposition::New)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaceSource, ReferenceEntity};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn place(key: &str, lat: f64, lon: f64, external_id: Option<i64>) -> CanonicalPlace {
        CanonicalPlace {
            key: key.to_string(),
            display_name: key.to_string(),
            admin2: None,
            admin1: "MO".to_string(),
            country: "USA".to_string(),
            latitude: lat,
            longitude: lon,
            elevation: None,
            population: 1000,
            timezone: Some("America/Chicago".to_string()),
            feature_code: "PPL".to_string(),
            rank: 1,
            phonetic1: String::new(),
            phonetic2: None,
            source: PlaceSource::Gazetteer,
            external_id,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn nearby_same_key_is_duplicate() {
        let store = MemoryStore::new();
        let reference = ReferenceData::new();
        let id = store
            .insert_place(&place("STLOUIS", 38.62, -90.19, Some(1)))
            .await
            .unwrap();

        let incoming = place("STLOUIS", 38.63, -90.20, Some(2));
        match classify(&incoming, &reference, &store).await.unwrap() {
            Disposition::Duplicate(stored) => assert_eq!(stored.id, id),
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_key_far_away_is_new() {
        let store = MemoryStore::new();
        let reference = ReferenceData::new();
        store
            .insert_place(&place("SPRINGFIELD", 39.8, -89.6, Some(1)))
            .await
            .unwrap();

        // Springfield MO is several degrees from Springfield IL.
        let incoming = place("SPRINGFIELD", 37.2, -93.3, Some(2));
        assert!(matches!(
            classify(&incoming, &reference, &store).await.unwrap(),
            Disposition::New
        ));
    }

    #[tokio::test]
    async fn renamed_place_with_known_id_becomes_alternate() {
        let store = MemoryStore::new();
        let reference = ReferenceData::new();
        store
            .insert_place(&place("STLOUIS", 38.62, -90.19, Some(77)))
            .await
            .unwrap();

        let incoming = place("SAINTLEWIS", 38.62, -90.19, Some(77));
        match classify(&incoming, &reference, &store).await.unwrap() {
            Disposition::AlternateOf {
                kind,
                owner_external_id,
                owner_key,
            } => {
                assert_eq!(kind, EntityKind::Place);
                assert_eq!(owner_external_id, 77);
                assert_eq!(owner_key, "STLOUIS");
            }
            other => panic!("expected alternate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn admin_tables_checked_in_priority_order() {
        let store = MemoryStore::new();
        let mut reference = ReferenceData::new();
        reference.add_admin1(ReferenceEntity {
            name: "Missouri".to_string(),
            key: "MISSOURI".to_string(),
            code: "US.29".to_string(),
            external_id: 4398678,
            source: PlaceSource::Gazetteer,
        });

        let incoming = place("MISSOURIA", 38.5, -92.5, Some(4398678));
        match classify(&incoming, &reference, &store).await.unwrap() {
            Disposition::AlternateOf { kind, .. } => assert_eq!(kind, EntityKind::Admin1),
            other => panic!("expected alternate, got {other:?}"),
        }
    }
}
