//! Readers for the tab-separated gazetteer export files.
//!
//! All feeds share the same dialect: tab-delimited, no header row, no
//! quoting, `#` comment lines. Gzip input is handled transparently by
//! extension. The small reference feeds load fully; places, alternate
//! names, and postal codes stream row by row.
//!
//! Malformed rows are skipped and counted, never fatal; an unreadable or
//! undecodable file is.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::models::{NameFlags, RawPlaceRecord};

/// Row of the country reference feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryRow {
    pub iso2: String,
    pub iso3: String,
    pub name: String,
    pub external_id: i64,
}

/// Row of an admin1 or admin2 reference feed (same layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRow {
    pub code: String,
    pub name: String,
    pub ascii_name: String,
    pub external_id: i64,
}

/// Row of the alternate-names feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateRow {
    pub owner_id: i64,
    pub language: String,
    pub name: String,
    pub flags: NameFlags,
}

/// Row of the postal-code feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PostalRow {
    pub country: String,
    pub postal_code: String,
    pub place_name: String,
    pub admin1_name: String,
    pub admin1_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<i32>,
}

type TsvReader = csv::Reader<Box<dyn Read + Send>>;

fn open_tsv(path: &Path) -> Result<TsvReader> {
    let file =
        File::open(path).with_context(|| format!("opening feed {}", path.display()))?;
    let reader: Box<dyn Read + Send> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader))
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).map(str::trim).unwrap_or("")
}

fn int_field(record: &StringRecord, idx: usize) -> Option<i64> {
    field(record, idx).parse().ok()
}

fn float_field(record: &StringRecord, idx: usize) -> Option<f64> {
    field(record, idx).parse().ok()
}

/// Load the country reference feed: iso2(0), iso3(1), name(4), id(16).
pub fn load_countries(path: &Path) -> Result<Vec<CountryRow>> {
    let mut reader = open_tsv(path)?;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("reading country feed")?;
        let iso2 = field(&record, 0);
        let iso3 = field(&record, 1);
        let name = field(&record, 4);
        if iso2.len() != 2 || iso3.len() != 3 || name.is_empty() {
            debug!(row = ?record.position().map(|p| p.line()), "skipping malformed country row");
            continue;
        }
        let Some(external_id) = int_field(&record, 16) else {
            debug!(iso2, "country row without gazetteer id");
            continue;
        };
        rows.push(CountryRow {
            iso2: iso2.to_uppercase(),
            iso3: iso3.to_uppercase(),
            name: name.to_string(),
            external_id,
        });
    }
    info!(count = rows.len(), path = %path.display(), "loaded country feed");
    Ok(rows)
}

/// Load an admin1/admin2 reference feed: code(0), name(1), ascii(2), id(3).
pub fn load_admin_codes(path: &Path) -> Result<Vec<AdminRow>> {
    let mut reader = open_tsv(path)?;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("reading admin code feed")?;
        let code = field(&record, 0);
        let name = field(&record, 1);
        if !code.contains('.') || name.is_empty() {
            continue;
        }
        let Some(external_id) = int_field(&record, 3) else {
            continue;
        };
        rows.push(AdminRow {
            code: code.to_string(),
            name: name.to_string(),
            ascii_name: field(&record, 2).to_string(),
            external_id,
        });
    }
    info!(count = rows.len(), path = %path.display(), "loaded admin code feed");
    Ok(rows)
}

/// Streaming reader over the main places feed.
pub struct PlaceReader {
    reader: TsvReader,
    record: StringRecord,
    skipped: u64,
}

impl PlaceReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: open_tsv(path)?,
            record: StringRecord::new(),
            skipped: 0,
        })
    }

    /// Rows this reader dropped for missing id, name, or coordinates.
    pub fn parse_skips(&self) -> u64 {
        self.skipped
    }

    /// Next well-formed place row, skipping malformed ones.
    pub fn next_place(&mut self) -> Result<Option<RawPlaceRecord>> {
        loop {
            if !self
                .reader
                .read_record(&mut self.record)
                .context("reading places feed")?
            {
                return Ok(None);
            }
            let record = &self.record;

            let Some(external_id) = int_field(record, 0) else {
                self.skipped += 1;
                continue;
            };
            let name = field(record, 1);
            let (Some(latitude), Some(longitude)) =
                (float_field(record, 4), float_field(record, 5))
            else {
                self.skipped += 1;
                debug!(external_id, "place row without coordinates");
                continue;
            };
            if name.is_empty() {
                self.skipped += 1;
                continue;
            }

            let alternate_names = field(record, 3)
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();

            return Ok(Some(RawPlaceRecord {
                external_id,
                name: name.to_string(),
                ascii_name: field(record, 2).to_string(),
                alternate_names,
                latitude,
                longitude,
                feature_class: field(record, 6).to_string(),
                feature_code: field(record, 7).to_string(),
                country_code: field(record, 8).to_string(),
                admin1_code: field(record, 10).to_string(),
                admin2_code: field(record, 11).to_string(),
                population: int_field(record, 14).unwrap_or(0),
                elevation: field(record, 15).parse().ok(),
                timezone: field(record, 17).to_string(),
            }));
        }
    }
}

/// Streaming reader over the alternate-names feed: id(0), owner(1),
/// lang(2), name(3), then four 0/1 flag columns.
pub struct AlternateReader {
    reader: TsvReader,
    record: StringRecord,
    skipped: u64,
}

impl AlternateReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: open_tsv(path)?,
            record: StringRecord::new(),
            skipped: 0,
        })
    }

    pub fn parse_skips(&self) -> u64 {
        self.skipped
    }

    pub fn next_name(&mut self) -> Result<Option<AlternateRow>> {
        loop {
            if !self
                .reader
                .read_record(&mut self.record)
                .context("reading alternate names feed")?
            {
                return Ok(None);
            }
            let record = &self.record;

            let Some(owner_id) = int_field(record, 1) else {
                self.skipped += 1;
                continue;
            };
            let name = field(record, 3);
            if name.is_empty() {
                self.skipped += 1;
                continue;
            }

            let flag = |idx| field(record, idx) == "1";
            return Ok(Some(AlternateRow {
                owner_id,
                language: field(record, 2).to_string(),
                name: name.to_string(),
                flags: NameFlags {
                    preferred: flag(4),
                    short: flag(5),
                    colloquial: flag(6),
                    historic: flag(7),
                },
            }));
        }
    }
}

/// Streaming reader over the postal feed: country(0), code(1), name(2),
/// admin1 name(3), admin1 code(4), lat(9), lon(10), accuracy(11).
pub struct PostalReader {
    reader: TsvReader,
    record: StringRecord,
    skipped: u64,
}

impl PostalReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: open_tsv(path)?,
            record: StringRecord::new(),
            skipped: 0,
        })
    }

    pub fn parse_skips(&self) -> u64 {
        self.skipped
    }

    pub fn next_postal(&mut self) -> Result<Option<PostalRow>> {
        loop {
            if !self
                .reader
                .read_record(&mut self.record)
                .context("reading postal feed")?
            {
                return Ok(None);
            }
            let record = &self.record;

            let country = field(record, 0);
            let postal_code = field(record, 1);
            if country.is_empty() || postal_code.is_empty() {
                self.skipped += 1;
                continue;
            }
            let (Some(latitude), Some(longitude)) =
                (float_field(record, 9), float_field(record, 10))
            else {
                self.skipped += 1;
                debug!(country, postal_code, "postal row without coordinates");
                continue;
            };

            return Ok(Some(PostalRow {
                country: country.to_uppercase(),
                postal_code: postal_code.to_string(),
                place_name: field(record, 2).to_string(),
                admin1_name: field(record, 3).to_string(),
                admin1_code: field(record, 4).to_string(),
                latitude,
                longitude,
                accuracy: field(record, 11).parse().ok(),
            }));
        }
    }
}
