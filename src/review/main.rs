//! Close-neighbor review scan.
//!
//! Reads a legacy/manual places file and prints same-class pairs within
//! three kilometers of each other for human review. Nothing is merged.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gazetteer::feeds::PlaceReader;
use gazetteer::pipeline::neighbors::{find_close_neighbors, ScanPlace, CLOSE_NEIGHBOR_METERS};

#[derive(Parser, Debug)]
#[command(name = "review")]
#[command(about = "Flag close same-class place pairs for human review")]
struct Args {
    /// Places file to scan
    #[arg(short, long)]
    file: PathBuf,

    /// Restrict the scan to one 2-letter country code
    #[arg(long)]
    country: Option<String>,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Close-Neighbor Review Scan");
    info!("File: {}", args.file.display());

    let mut reader = PlaceReader::open(&args.file)?;
    let mut places = Vec::new();
    while let Some(record) = reader.next_place()? {
        if let Some(country) = &args.country {
            if !record.country_code.eq_ignore_ascii_case(country) {
                continue;
            }
        }
        places.push(ScanPlace::from(&record));
    }
    info!(
        "Loaded {} places ({} malformed rows skipped)",
        places.len(),
        reader.parse_skips()
    );

    let pairs = find_close_neighbors(&places);
    println!("{} pairs within {:.0} m:", pairs.len(), CLOSE_NEIGHBOR_METERS);
    for pair in &pairs {
        println!(
            "{:>7.0} m  {} ({})  |  {} ({})",
            pair.meters, pair.a_name, pair.a_id, pair.b_name, pair.b_id
        );
    }

    Ok(())
}
