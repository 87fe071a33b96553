//! Gazetteer feed ingest pipeline.
//!
//! Loads the reference feeds, streams the place files through the
//! pipeline, then attaches alternate names and postal codes.

mod config;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use hashbrown::HashSet;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use gazetteer::feeds::{self, AlternateReader, PlaceReader, PostalReader};
use gazetteer::models::ReferenceData;
use gazetteer::pipeline::{self, IngestReport, PlacePass, Progress};
use gazetteer::store::{MemoryStore, PlaceStore};
use gazetteer::tz;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Ingest gazetteer feeds into the place store")]
struct Args {
    /// TOML config naming the feed files
    #[arg(short, long)]
    config: PathBuf,

    /// Timezone polygon GeoJSON (overrides the config entry)
    #[arg(long)]
    timezones: Option<PathBuf>,

    /// Skip the alternate-names stage
    #[arg(long)]
    skip_alternates: bool,

    /// Skip the postal-code stage
    #[arg(long)]
    skip_postal: bool,

    /// Process at most this many place records per file
    #[arg(long)]
    limit: Option<usize>,

    /// Write the final place table to a JSON file
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// Adapts pipeline progress notifications to an indicatif bar.
#[derive(Default)]
struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl Progress for BarProgress {
    fn begin_stage(&self, stage: &str, total: Option<u64>) {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
                ) {
                    bar.set_style(style.progress_chars("#>-"));
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(stage.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn advance(&self, records: u64) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(records);
            }
        }
    }

    fn end_stage(&self, _stage: &str) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_from_file(&args.config)?;

    info!("Gazetteer Ingest Pipeline");
    info!("Config: {}", args.config.display());

    // One-time polygon load; later stages reuse the shared index.
    let tz_path = args.timezones.as_ref().or(config.feeds.timezones.as_ref());
    let tz_index = match tz_path {
        Some(path) => Some(tz::load_shared(path)?),
        None => {
            warn!("No timezone polygon file configured; relying on feed values and stored neighbors");
            None
        }
    };

    let store = MemoryStore::new();
    let mut reference = ReferenceData::new();
    let mut report = IngestReport::default();
    let progress = BarProgress::default();

    // Reference feeds, in dependency order
    let countries = feeds::load_countries(&config.feeds.countries)?;
    pipeline::ingest_countries(countries, &store, &mut reference, &mut report).await?;

    let admin1 = feeds::load_admin_codes(&config.feeds.admin1)?;
    pipeline::ingest_admin1(admin1, &store, &mut reference, &mut report).await?;

    let admin2 = feeds::load_admin_codes(&config.feeds.admin2)?;
    pipeline::ingest_admin2(admin2, &store, &mut reference, &mut report).await?;

    // City pass first, then the broader files. One id set spans all of
    // them so re-encounters keep their first-pass record.
    let mut seen: HashSet<i64> = HashSet::new();
    info!("Processing city file: {}", config.feeds.cities.display());
    let mut reader = PlaceReader::open(&config.feeds.cities)?;
    pipeline::ingest_places(
        &mut reader,
        PlacePass::Cities,
        &store,
        &reference,
        tz_index,
        &config.pipeline.priority_country,
        args.limit,
        &mut seen,
        &mut report,
        &progress,
    )
    .await?;

    for path in &config.feeds.places {
        info!("Processing place file: {}", path.display());
        let mut reader = PlaceReader::open(path)?;
        pipeline::ingest_places(
            &mut reader,
            PlacePass::Broad,
            &store,
            &reference,
            tz_index,
            &config.pipeline.priority_country,
            args.limit,
            &mut seen,
            &mut report,
            &progress,
        )
        .await?;
    }

    if !args.skip_alternates {
        if let Some(path) = &config.feeds.alternates {
            let mut reader = AlternateReader::open(path)?;
            pipeline::ingest_alternate_names(&mut reader, &store, &reference, &mut report, &progress)
                .await?;
        }
    }

    if !args.skip_postal {
        if let Some(path) = &config.feeds.postal {
            let mut reader = PostalReader::open(path)?;
            pipeline::ingest_postal(&mut reader, &store, &reference, tz_index, &mut report, &progress)
                .await?;
        }
    }

    report.log_summary();

    if let Some(path) = &args.snapshot {
        let places = store.places().await?;
        let file = File::create(path)
            .with_context(|| format!("creating snapshot {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &places)?;
        info!("Snapshot: {} places written to {}", places.len(), path.display());
    }

    Ok(())
}
