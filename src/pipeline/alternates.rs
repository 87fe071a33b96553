//! Alternate-name ingestion: attach name variants to known entities.

use anyhow::Result;
use tracing::{debug, error, info};

use super::{IngestReport, Progress};
use crate::feeds::AlternateReader;
use crate::models::{AlternateName, EntityKind, ReferenceData};
use crate::normalize;
use crate::store::PlaceStore;

/// Pseudo-language tags carrying links and codes, not names.
const PSEUDO_LANGUAGES: &[&str] = &["link", "wkdt", "post", "iata", "icao", "faac", "unlc"];

/// Owner of an alternate name, resolved most-specific-first: stored
/// places, then admin2/admin1/country reference tables. Returns the
/// owner's kind and its own canonical key.
async fn find_owner(
    owner_id: i64,
    reference: &ReferenceData,
    store: &dyn PlaceStore,
) -> crate::store::Result<Option<(EntityKind, String)>> {
    if let Some(stored) = store.place_by_external_id(owner_id).await? {
        return Ok(Some((EntityKind::Place, stored.place.key)));
    }
    Ok(reference
        .entity_by_external_id(owner_id)
        .map(|(kind, entity)| (kind, entity.key.clone())))
}

/// Stream the alternate-names feed, resolving each row's owner. Rows
/// whose owner is unknown in every table are counted and dropped, and a
/// row whose normalized form is the owner's own name stores nothing.
pub async fn ingest_alternate_names(
    reader: &mut AlternateReader,
    store: &dyn PlaceStore,
    reference: &ReferenceData,
    report: &mut IngestReport,
    progress: &dyn Progress,
) -> Result<()> {
    progress.begin_stage("alternate names", None);

    while let Some(row) = reader.next_name()? {
        progress.advance(1);

        if PSEUDO_LANGUAGES.contains(&row.language.as_str()) {
            continue;
        }

        let (kind, owner_key) = match find_owner(row.owner_id, reference, store).await {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                report.alternates_unowned += 1;
                continue;
            }
            Err(err) => {
                error!(owner = row.owner_id, %err, "owner lookup failed");
                report.store_errors += 1;
                continue;
            }
        };

        let alternate = AlternateName {
            key: normalize::canonical_key(&row.name),
            name: row.name,
            language: row.language,
            owner_kind: kind,
            owner_id: row.owner_id,
            flags: row.flags,
        };
        if alternate.key.is_empty() {
            debug!(owner = alternate.owner_id, "alternate name folds to nothing");
            continue;
        }
        if alternate.key == owner_key {
            debug!(
                owner = alternate.owner_id,
                name = %alternate.name,
                "alternate repeats the owner's own name"
            );
            continue;
        }
        if let Err(err) = store.upsert_alternate_name(&alternate).await {
            error!(owner = alternate.owner_id, name = %alternate.name, %err, "alternate upsert failed");
            report.store_errors += 1;
            continue;
        }
        report.alternate_names += 1;
    }
    report.parse_skips += reader.parse_skips();

    progress.end_stage("alternate names");
    info!(
        count = report.alternate_names,
        unowned = report.alternates_unowned,
        "alternate names ingested"
    );
    Ok(())
}
