//! The ingestion pipeline: filtering, resolution, ranking, timezone
//! assignment, classification, and emission to the store.
//!
//! Stages run in dependency order: countries, then admin codes, then
//! places, then alternate names and postal codes. Reference tables are
//! mutable only while their own stage runs; the place stages share them
//! read-only.

pub mod alternates;
pub mod classify;
pub mod filter;
pub mod neighbors;
pub mod postal;
pub mod progress;
pub mod rank;
pub mod timezone;

use anyhow::Result;
use chrono::Utc;
use hashbrown::HashSet;
use tracing::{debug, error, info};

use crate::feeds::{AdminRow, CountryRow, PlaceReader};
use crate::models::{
    AlternateName, CanonicalPlace, PlaceRefresh, PlaceSource, RawPlaceRecord, ReferenceData,
    ReferenceEntity,
};
use crate::normalize;
use crate::resolver::{AdminResolver, ProcessedNames, RawNames};
use crate::store::PlaceStore;
use crate::tz::TzIndex;

pub use alternates::ingest_alternate_names;
pub use classify::Disposition;
pub use postal::ingest_postal;
pub use progress::{NullProgress, Progress};
pub use rank::PlacePass;
pub use timezone::TzOrigin;

/// Counters accumulated across a run. Purely informational; the driver
/// returns it instead of mutating shared state.
#[derive(Debug, Default, Clone)]
pub struct IngestReport {
    pub countries: u64,
    pub admin1: u64,
    pub admin2: u64,
    pub places_read: u64,
    pub filtered: u64,
    pub rejected_names: u64,
    pub duplicates_in_run: u64,
    pub inserted: u64,
    pub refreshed: u64,
    pub alternate_names: u64,
    pub alternates_unowned: u64,
    pub postal_owned: u64,
    pub postal_synthetic: u64,
    pub tz_from_feed: u64,
    pub tz_from_polygons: u64,
    pub tz_from_neighbors: u64,
    pub tz_unresolved: u64,
    pub parse_skips: u64,
    pub store_errors: u64,
}

impl IngestReport {
    pub fn note_tz(&mut self, origin: TzOrigin) {
        match origin {
            TzOrigin::Feed => self.tz_from_feed += 1,
            TzOrigin::Polygon => self.tz_from_polygons += 1,
            TzOrigin::Proximity => self.tz_from_neighbors += 1,
            TzOrigin::Unresolved => self.tz_unresolved += 1,
        }
    }

    pub fn log_summary(&self) {
        info!(
            countries = self.countries,
            admin1 = self.admin1,
            admin2 = self.admin2,
            "reference tables loaded"
        );
        info!(
            read = self.places_read,
            filtered = self.filtered,
            rejected_names = self.rejected_names,
            duplicates_in_run = self.duplicates_in_run,
            inserted = self.inserted,
            refreshed = self.refreshed,
            alternates = self.alternate_names,
            "places processed"
        );
        info!(
            feed = self.tz_from_feed,
            polygons = self.tz_from_polygons,
            neighbors = self.tz_from_neighbors,
            unresolved = self.tz_unresolved,
            "timezone resolution"
        );
        info!(
            owned = self.postal_owned,
            synthetic = self.postal_synthetic,
            "postal assignments"
        );
        if self.parse_skips > 0 || self.store_errors > 0 {
            info!(
                parse_skips = self.parse_skips,
                store_errors = self.store_errors,
                "degraded rows"
            );
        }
    }
}

/// Upsert the country feed and build the 2-letter lookup table.
pub async fn ingest_countries(
    rows: Vec<CountryRow>,
    store: &dyn PlaceStore,
    reference: &mut ReferenceData,
    report: &mut IngestReport,
) -> Result<()> {
    for row in rows {
        let entity = ReferenceEntity {
            key: normalize::canonical_key(&row.name),
            name: row.name,
            code: row.iso3,
            external_id: row.external_id,
            source: PlaceSource::Gazetteer,
        };
        if let Err(err) = store.upsert_country(&entity).await {
            error!(iso2 = %row.iso2, %err, "country upsert failed");
            report.store_errors += 1;
            continue;
        }
        reference.add_country(&row.iso2, entity);
        report.countries += 1;
    }
    info!(count = report.countries, "countries ingested");
    Ok(())
}

fn admin_entity(row: AdminRow) -> ReferenceEntity {
    let name = if row.name.is_empty() {
        row.ascii_name
    } else {
        row.name
    };
    ReferenceEntity {
        key: normalize::canonical_key(&name),
        name,
        code: row.code,
        external_id: row.external_id,
        source: PlaceSource::Gazetteer,
    }
}

/// Upsert first-level divisions and register their dotted codes.
pub async fn ingest_admin1(
    rows: Vec<AdminRow>,
    store: &dyn PlaceStore,
    reference: &mut ReferenceData,
    report: &mut IngestReport,
) -> Result<()> {
    for row in rows {
        let entity = admin_entity(row);
        if let Err(err) = store.upsert_admin1(&entity).await {
            error!(code = %entity.code, %err, "admin1 upsert failed");
            report.store_errors += 1;
            continue;
        }
        reference.add_admin1(entity);
        report.admin1 += 1;
    }
    info!(count = report.admin1, "admin1 divisions ingested");
    Ok(())
}

/// Upsert second-level divisions and register their dotted codes.
pub async fn ingest_admin2(
    rows: Vec<AdminRow>,
    store: &dyn PlaceStore,
    reference: &mut ReferenceData,
    report: &mut IngestReport,
) -> Result<()> {
    for row in rows {
        let entity = admin_entity(row);
        if let Err(err) = store.upsert_admin2(&entity).await {
            error!(code = %entity.code, %err, "admin2 upsert failed");
            report.store_errors += 1;
            continue;
        }
        reference.add_admin2(entity);
        report.admin2 += 1;
    }
    info!(count = report.admin2, "admin2 divisions ingested");
    Ok(())
}

/// Assemble the canonical row for an accepted record.
fn build_place(
    record: &RawPlaceRecord,
    processed: &ProcessedNames,
    rank: i32,
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
        latitude: record.latitude,
        longitude: record.longitude,
        elevation: record.elevation,
        population: record.population,
        timezone,
        feature_code: record.feature_code.clone(),
        rank,
        phonetic1,
        phonetic2,
        source: PlaceSource::Gazetteer,
        external_id: Some(record.external_id),
        updated_at: Utc::now(),
    }
}

/// Stream one places file through the six pipeline states.
///
/// Records are buffered and ordered with the priority country first,
/// then by external id; the order shapes report output only. `limit`
/// caps how many ordered records are processed. `seen` spans every
/// place file of a run, so the first occurrence of an external id wins
/// even when a later file repeats it.
#[allow(clippy::too_many_arguments)]
pub async fn ingest_places(
    reader: &mut PlaceReader,
    pass: PlacePass,
    store: &dyn PlaceStore,
    reference: &ReferenceData,
    tz_index: Option<&TzIndex>,
    priority_country: &str,
    limit: Option<usize>,
    seen: &mut HashSet<i64>,
    report: &mut IngestReport,
    progress: &dyn Progress,
) -> Result<()> {
    let mut records = Vec::new();
    while let Some(record) = reader.next_place()? {
        records.push(record);
    }
    report.parse_skips += reader.parse_skips();
    records.sort_by_key(|r| (r.country_code != priority_country, r.external_id));
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    progress.begin_stage("places", Some(records.len() as u64));
    let resolver = AdminResolver::new(reference);

    for record in &records {
        report.places_read += 1;
        progress.advance(1);

        if !seen.insert(record.external_id) {
            report.duplicates_in_run += 1;
            continue;
        }

        let class = match filter::admit(record) {
            Ok(class) => class,
            Err(reason) => {
                debug!(id = record.external_id, ?reason, "filtered");
                report.filtered += 1;
                continue;
            }
        };

        let Some(processed) = resolver.resolve(RawNames {
            city: &record.name,
            county: &record.admin2_code,
            state: &record.admin1_code,
            country: &record.country_code,
        }) else {
            report.rejected_names += 1;
            continue;
        };

        let rank = rank::rank(record, class, pass);

        let (tz, origin) = timezone::resolve_timezone(
            &record.timezone,
            record.latitude,
            record.longitude,
            tz_index,
            store,
        )
        .await?;
        report.note_tz(origin);

        let place = build_place(record, &processed, rank, tz);

        let disposition = match classify::classify(&place, reference, store).await {
            Ok(d) => d,
            Err(err) => {
                error!(id = record.external_id, name = %record.name, %err, "classify failed");
                report.store_errors += 1;
                continue;
            }
        };

        let outcome = match disposition {
            Disposition::Duplicate(existing) => store
                .refresh_place(existing.id, &PlaceRefresh::from_place(&place))
                .await
                .map(|_| report.refreshed += 1),
            Disposition::AlternateOf {
                kind,
                owner_external_id,
                owner_key,
            } => {
                if place.key == owner_key {
                    debug!(
                        name = %place.display_name,
                        owner = owner_external_id,
                        "record repeats its owner's name, nothing to store"
                    );
                    Ok(())
                } else {
                    debug!(
                        name = %place.display_name,
                        tag = %kind.type_code(),
                        owner = owner_external_id,
                        "known name, storing as alternate"
                    );
                    let alternate = AlternateName {
                        name: place.display_name.clone(),
                        key: place.key.clone(),
                        language: String::new(),
                        owner_kind: kind,
                        owner_id: owner_external_id,
                        flags: Default::default(),
                    };
                    store
                        .upsert_alternate_name(&alternate)
                        .await
                        .map(|_| report.alternate_names += 1)
                }
            }
            Disposition::New => store
                .insert_place(&place)
                .await
                .map(|_| report.inserted += 1),
        };
        if let Err(err) = outcome {
            error!(id = record.external_id, name = %record.name, %err, "store write failed");
            report.store_errors += 1;
        }
    }

    progress.end_stage("places");
    Ok(())
}
