//! Postal-code ingestion: anchor each code to a canonical place.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info};

use super::{timezone, IngestReport, Progress};
use crate::feeds::PostalReader;
use crate::models::{CanonicalPlace, PlaceSource, PostalAssignment, ReferenceData, StoredPlace};
use crate::normalize;
use crate::resolver::{AdminResolver, ProcessedNames, RawNames};
use crate::store::{BoundingBox, PlaceStore};
use crate::tz::TzIndex;

/// Half-width (degrees) of the owner-matching box.
const OWNER_BOX_HALF: f64 = 0.25;

/// A stored place close to the postal point, in the same country, whose
/// name close-matches the postal locality name.
async fn find_owner(
    processed: &ProcessedNames,
    lat: f64,
    lon: f64,
    store: &dyn PlaceStore,
) -> crate::store::Result<Option<StoredPlace>> {
    let nearby = store
        .places_in_box(BoundingBox::around(lat, lon, OWNER_BOX_HALF))
        .await?;
    Ok(nearby.into_iter().find(|stored| {
        stored.place.country == processed.country
            && normalize::close_match(&stored.place.display_name, &processed.city)
    }))
}

/// Low-confidence place synthesized to anchor an orphan postal code.
fn synthetic_place(
    processed: &ProcessedNames,
    lat: f64,
    lon: f64,
    timezone: Option<String>,
) -> CanonicalPlace {
    let key = normalize::canonical_key(&processed.city);
    let (phonetic1, phonetic2) = normalize::phonetic_keys(&processed.city);
    let phonetic2 = (phonetic2 != phonetic1).then_some(phonetic2);

    CanonicalPlace {
        key,
        display_name: processed.city.clone(),
        admin2: processed.county.clone(),
        admin1: processed.state.clone(),
        country: processed.country.clone(),
        latitude: lat,
        longitude: lon,
        elevation: None,
        population: 0,
        timezone,
        feature_code: String::new(),
        rank: 0,
        phonetic1,
        phonetic2,
        source: PlaceSource::Synthetic,
        external_id: None,
        updated_at: Utc::now(),
    }
}

/// Stream the postal feed. Each code is tied to a nearby matching place,
/// or to a freshly inserted synthetic place when none exists.
pub async fn ingest_postal(
    reader: &mut PostalReader,
    store: &dyn PlaceStore,
    reference: &ReferenceData,
    tz_index: Option<&TzIndex>,
    report: &mut IngestReport,
    progress: &dyn Progress,
) -> Result<()> {
    progress.begin_stage("postal codes", None);
    let resolver = AdminResolver::new(reference);

    while let Some(row) = reader.next_postal()? {
        progress.advance(1);

        let state = if row.admin1_code.is_empty() {
            row.admin1_name.as_str()
        } else {
            row.admin1_code.as_str()
        };
        let Some(processed) = resolver.resolve(RawNames {
            city: &row.place_name,
            county: "",
            state,
            country: &row.country,
        }) else {
            report.rejected_names += 1;
            continue;
        };

        let (tz, origin) =
            timezone::resolve_timezone("", row.latitude, row.longitude, tz_index, store).await?;
        report.note_tz(origin);

        let owner_id = match find_owner(&processed, row.latitude, row.longitude, store).await {
            Ok(Some(stored)) => {
                report.postal_owned += 1;
                Some(stored.id)
            }
            Ok(None) => {
                let place = synthetic_place(&processed, row.latitude, row.longitude, tz.clone());
                match store.insert_place(&place).await {
                    Ok(id) => {
                        debug!(code = %row.postal_code, place = %place.display_name, "synthesized postal anchor");
                        report.postal_synthetic += 1;
                        Some(id)
                    }
                    Err(err) => {
                        error!(code = %row.postal_code, %err, "synthetic insert failed");
                        report.store_errors += 1;
                        None
                    }
                }
            }
            Err(err) => {
                error!(code = %row.postal_code, %err, "owner lookup failed");
                report.store_errors += 1;
                None
            }
        };

        let assignment = PostalAssignment {
            country: processed.country.clone(),
            postal_code: row.postal_code.clone(),
            name: processed.city.clone(),
            admin1: processed.state.clone(),
            latitude: row.latitude,
            longitude: row.longitude,
            accuracy: row.accuracy,
            timezone: tz,
            owner_place_id: owner_id,
        };
        if let Err(err) = store.upsert_postal(&assignment).await {
            error!(code = %assignment.postal_code, %err, "postal upsert failed");
            report.store_errors += 1;
        }
    }
    report.parse_skips += reader.parse_skips();

    progress.end_stage("postal codes");
    info!(
        owned = report.postal_owned,
        synthetic = report.postal_synthetic,
        "postal codes ingested"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceEntity;
    use crate::pipeline::NullProgress;
    use crate::store::MemoryStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn feed_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn reference() -> ReferenceData {
        let mut reference = ReferenceData::new();
        reference.add_country(
            "US",
            ReferenceEntity {
                name: "United States".to_string(),
                key: "UNITEDSTATES".to_string(),
                code: "USA".to_string(),
                external_id: 6252001,
                source: PlaceSource::Gazetteer,
            },
        );
        reference
    }

    fn saint_louis() -> CanonicalPlace {
        CanonicalPlace {
            key: "STLOUIS".to_string(),
            display_name: "Saint Louis".to_string(),
            admin2: Some("St. Louis".to_string()),
            admin1: "MO".to_string(),
            country: "USA".to_string(),
            latitude: 38.627,
            longitude: -90.198,
            elevation: None,
            population: 300_000,
            timezone: Some("America/Chicago".to_string()),
            feature_code: "PPL".to_string(),
            rank: 3,
            phonetic1: "SNTL".to_string(),
            phonetic2: None,
            source: PlaceSource::Gazetteer,
            external_id: Some(4407066),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn postal_code_attaches_to_matching_place() {
        let store = MemoryStore::new();
        let id = store.insert_place(&saint_louis()).await.unwrap();
        let reference = reference();
        let mut report = IngestReport::default();

        let file =
            feed_file("US\t63101\tSaint Louis\tMissouri\tMO\t\t\t\t\t38.6247\t-90.1981\t4\n");
        let mut reader = PostalReader::open(file.path()).unwrap();
        ingest_postal(&mut reader, &store, &reference, None, &mut report, &NullProgress)
            .await
            .unwrap();

        assert_eq!(report.postal_owned, 1);
        assert_eq!(report.postal_synthetic, 0);
        assert_eq!(store.place_count(), 1);
        assert_eq!(store.postal_count(), 1);
        assert_eq!(store.postal_assignments()[0].owner_place_id, Some(id));
    }

    #[tokio::test]
    async fn orphan_postal_code_gets_synthetic_anchor() {
        let store = MemoryStore::new();
        let reference = reference();
        let mut report = IngestReport::default();

        let file = feed_file("US\t99999\tRemote Corner\tMontana\tMT\t\t\t\t\t48.5\t-109.5\t1\n");
        let mut reader = PostalReader::open(file.path()).unwrap();
        ingest_postal(&mut reader, &store, &reference, None, &mut report, &NullProgress)
            .await
            .unwrap();

        assert_eq!(report.postal_synthetic, 1);
        assert_eq!(store.place_count(), 1);

        let all = store.places().await.unwrap();
        assert!(all[0].place.is_synthetic());
        assert_eq!(all[0].place.key, "REMOTECORNER");
        assert_eq!(all[0].place.country, "USA");
    }

    #[tokio::test]
    async fn abbreviated_spelling_still_matches_owner() {
        let store = MemoryStore::new();
        store.insert_place(&saint_louis()).await.unwrap();
        let reference = reference();
        let mut report = IngestReport::default();

        // Feed spells the city "St. Louis"; the stored place says "Saint Louis".
        let file = feed_file("US\t63102\tSt. Louis\tMissouri\tMO\t\t\t\t\t38.63\t-90.18\t4\n");
        let mut reader = PostalReader::open(file.path()).unwrap();
        ingest_postal(&mut reader, &store, &reference, None, &mut report, &NullProgress)
            .await
            .unwrap();

        assert_eq!(report.postal_owned, 1);
        assert_eq!(store.place_count(), 1);
    }
}
