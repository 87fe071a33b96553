//! Layered timezone resolution for records the feed left blank.

use hashbrown::HashSet;

use crate::store::{BoundingBox, PlaceStore, Result};
use crate::tz::TzIndex;

/// Half-widths of the expanding proximity boxes, in degrees.
pub const PROXIMITY_STEPS: [f64; 4] = [0.05, 0.1, 0.25, 0.5];

/// Which layer of the chain produced the timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TzOrigin {
    Feed,
    Polygon,
    Proximity,
    Unresolved,
}

/// Resolve a timezone for a point: the feed value wins, then the polygon
/// index, then agreement among already-stored neighbors.
///
/// The proximity search widens through [`PROXIMITY_STEPS`] until a box
/// holds any neighbors. Those neighbors must agree on exactly one
/// timezone and one country; any disagreement aborts the chain rather
/// than guessing.
pub async fn resolve_timezone(
    feed_value: &str,
    lat: f64,
    lon: f64,
    index: Option<&TzIndex>,
    store: &dyn PlaceStore,
) -> Result<(Option<String>, TzOrigin)> {
    let feed_value = feed_value.trim();
    if !feed_value.is_empty() {
        return Ok((Some(feed_value.to_string()), TzOrigin::Feed));
    }

    if let Some(index) = index {
        if let Some(tzid) = index.find_timezone(lat, lon) {
            return Ok((Some(tzid.to_string()), TzOrigin::Polygon));
        }
    }

    for half in PROXIMITY_STEPS {
        let neighbors = store.places_in_box(BoundingBox::around(lat, lon, half)).await?;
        if neighbors.is_empty() {
            continue;
        }

        let pairs: HashSet<(Option<&str>, &str)> = neighbors
            .iter()
            .map(|s| (s.place.timezone.as_deref(), s.place.country.as_str()))
            .collect();

        if pairs.len() != 1 {
            return Ok((None, TzOrigin::Unresolved));
        }
        return match pairs.into_iter().next().and_then(|(tz, _)| tz) {
            Some(tz) => Ok((Some(tz.to_string()), TzOrigin::Proximity)),
            None => Ok((None, TzOrigin::Unresolved)),
        };
    }

    Ok((None, TzOrigin::Unresolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalPlace, PlaceSource};
    use crate::store::MemoryStore;
    use crate::tz::TzPolygon;
    use chrono::Utc;
    use geo::{polygon, MultiPolygon};

    fn place(lat: f64, lon: f64, tz: Option<&str>, country: &str) -> CanonicalPlace {
        CanonicalPlace {
            key: "X".to_string(),
            display_name: "X".to_string(),
            admin2: None,
            admin1: "IL".to_string(),
            country: country.to_string(),
            latitude: lat,
            longitude: lon,
            elevation: None,
            population: 0,
            timezone: tz.map(str::to_string),
            feature_code: "PPL".to_string(),
            rank: 0,
            phonetic1: String::new(),
            phonetic2: None,
            source: PlaceSource::Gazetteer,
            external_id: None,
            updated_at: Utc::now(),
        }
    }

    fn chicago_index() -> TzIndex {
        TzIndex::build(vec![TzPolygon {
            tzid: "America/Chicago".to_string(),
            geometry: MultiPolygon(vec![polygon![
                (x: -93.0, y: 38.0),
                (x: -85.0, y: 38.0),
                (x: -85.0, y: 45.0),
                (x: -93.0, y: 45.0),
                (x: -93.0, y: 38.0),
            ]]),
        }])
    }

    #[tokio::test]
    async fn feed_value_short_circuits() {
        let store = MemoryStore::new();
        let (tz, origin) =
            resolve_timezone("Europe/Paris", 48.8, 2.3, Some(&chicago_index()), &store)
                .await
                .unwrap();
        assert_eq!(tz.as_deref(), Some("Europe/Paris"));
        assert_eq!(origin, TzOrigin::Feed);
    }

    #[tokio::test]
    async fn polygon_index_is_second() {
        let store = MemoryStore::new();
        let (tz, origin) = resolve_timezone("", 41.85, -87.65, Some(&chicago_index()), &store)
            .await
            .unwrap();
        assert_eq!(tz.as_deref(), Some("America/Chicago"));
        assert_eq!(origin, TzOrigin::Polygon);
    }

    #[tokio::test]
    async fn proximity_widens_until_agreement() {
        let store = MemoryStore::new();
        // Only neighbor sits 0.4° away: found at the widest step.
        store
            .insert_place(&place(38.6, -90.6, Some("America/Chicago"), "USA"))
            .await
            .unwrap();

        let (tz, origin) = resolve_timezone("", 38.6, -90.2, None, &store).await.unwrap();
        assert_eq!(tz.as_deref(), Some("America/Chicago"));
        assert_eq!(origin, TzOrigin::Proximity);
    }

    #[tokio::test]
    async fn disagreement_aborts_instead_of_guessing() {
        let store = MemoryStore::new();
        store
            .insert_place(&place(38.61, -90.21, Some("America/Chicago"), "USA"))
            .await
            .unwrap();
        store
            .insert_place(&place(38.59, -90.19, Some("America/New_York"), "USA"))
            .await
            .unwrap();

        let (tz, origin) = resolve_timezone("", 38.6, -90.2, None, &store).await.unwrap();
        assert_eq!(tz, None);
        assert_eq!(origin, TzOrigin::Unresolved);
    }

    #[tokio::test]
    async fn country_disagreement_also_aborts() {
        let store = MemoryStore::new();
        store
            .insert_place(&place(49.0, 8.0, Some("Europe/Berlin"), "DEU"))
            .await
            .unwrap();
        store
            .insert_place(&place(49.01, 8.01, Some("Europe/Berlin"), "FRA"))
            .await
            .unwrap();

        let (tz, _) = resolve_timezone("", 49.0, 8.0, None, &store).await.unwrap();
        assert_eq!(tz, None);
    }

    #[tokio::test]
    async fn empty_store_is_unresolved() {
        let store = MemoryStore::new();
        let (tz, origin) = resolve_timezone("", 0.0, 0.0, None, &store).await.unwrap();
        assert_eq!(tz, None);
        assert_eq!(origin, TzOrigin::Unresolved);
    }
}
