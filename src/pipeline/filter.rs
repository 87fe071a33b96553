//! Per-record admission rules applied before any resolution work.

use hashbrown::HashSet;
use once_cell::sync::Lazy;

use crate::models::{FeatureClass, RawPlaceRecord};

/// Admin1 code meaning "no data" in the export.
pub const NO_DATA_ADMIN1: &str = "00";

/// Peaks and mountains below this elevation (meters) are noise.
pub const MIN_PEAK_ELEVATION: i32 = 600;

/// Terrain feature codes worth keeping: island, atoll, cape, islet,
/// mountain, peak, point, volcano.
const TERRAIN_CODES: &[&str] = &["ISL", "ATOL", "CAPE", "ISLT", "MT", "PK", "PT", "VLC"];

/// Populated-place codes excluded even though the class is kept:
/// abandoned, destroyed, historical, section-of.
const EXCLUDED_POPULATED: &[&str] = &["PPLQ", "PPLW", "PPLH", "PPLX"];

/// Elevation-gated terrain codes.
const PEAK_CODES: &[&str] = &["MT", "PK"];

static CELESTIAL_BODIES: Lazy<HashSet<String>> = Lazy::new(|| {
    include_str!("../../data/celestial_bodies.txt")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
});

/// Why a record was dropped by the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// Comma in the raw name: an unparsed rearranged form.
    CommaName,
    NoDataAdmin1,
    UnsupportedClass,
    ExcludedCode,
    LowPeak,
}

/// A parenthetical qualifier naming a celestial body, e.g.
/// `"Olympus Mons (Mars)"`.
fn celestial_qualifier(name: &str) -> Option<&str> {
    let start = name.find('(')?;
    let end = name[start..].find(')')? + start;
    let body = name[start + 1..end].trim();
    CELESTIAL_BODIES
        .contains(&body.to_lowercase())
        .then_some(body)
}

/// Decide whether a raw record enters the pipeline, and under which
/// feature class. Extraterrestrial features bypass the terrain code
/// whitelist since their codes follow no consistent scheme.
pub fn admit(record: &RawPlaceRecord) -> Result<FeatureClass, FilterReason> {
    if record.name.contains(',') {
        return Err(FilterReason::CommaName);
    }
    if record.admin1_code == NO_DATA_ADMIN1 {
        return Err(FilterReason::NoDataAdmin1);
    }
    let Some(class) = FeatureClass::parse(&record.feature_class) else {
        return Err(FilterReason::UnsupportedClass);
    };

    match class {
        FeatureClass::Populated => {
            if !record.feature_code.starts_with("PPL")
                || EXCLUDED_POPULATED.contains(&record.feature_code.as_str())
            {
                return Err(FilterReason::ExcludedCode);
            }
        }
        FeatureClass::Terrain => {
            if celestial_qualifier(&record.name).is_some() {
                return Ok(class);
            }
            if !TERRAIN_CODES.contains(&record.feature_code.as_str()) {
                return Err(FilterReason::ExcludedCode);
            }
            if PEAK_CODES.contains(&record.feature_code.as_str())
                && record.elevation.unwrap_or(0) < MIN_PEAK_ELEVATION
            {
                return Err(FilterReason::LowPeak);
            }
        }
    }

    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, class: &str, code: &str, elevation: Option<i32>) -> RawPlaceRecord {
        RawPlaceRecord {
            external_id: 1,
            name: name.to_string(),
            ascii_name: name.to_string(),
            alternate_names: vec![],
            latitude: 0.0,
            longitude: 0.0,
            feature_class: class.to_string(),
            feature_code: code.to_string(),
            country_code: "US".to_string(),
            admin1_code: "IL".to_string(),
            admin2_code: String::new(),
            population: 0,
            elevation,
            timezone: String::new(),
        }
    }

    #[test]
    fn populated_places_pass_unless_excluded() {
        assert!(admit(&record("Chicago", "P", "PPL", None)).is_ok());
        assert_eq!(
            admit(&record("Old Town", "P", "PPLH", None)),
            Err(FilterReason::ExcludedCode)
        );
        assert_eq!(
            admit(&record("Ruins", "P", "PPLW", None)),
            Err(FilterReason::ExcludedCode)
        );
        assert_eq!(
            admit(&record("Outpost", "P", "STLMT", None)),
            Err(FilterReason::ExcludedCode)
        );
    }

    #[test]
    fn comma_names_and_sentinel_admin1_rejected() {
        assert_eq!(
            admit(&record("Springfield, The", "P", "PPL", None)),
            Err(FilterReason::CommaName)
        );
        let mut r = record("Springfield", "P", "PPL", None);
        r.admin1_code = NO_DATA_ADMIN1.to_string();
        assert_eq!(admit(&r), Err(FilterReason::NoDataAdmin1));
    }

    #[test]
    fn terrain_whitelist_and_peak_elevation() {
        assert!(admit(&record("Key West", "T", "ISL", None)).is_ok());
        assert!(admit(&record("Mauna Kea", "T", "PK", Some(4207))).is_ok());
        assert_eq!(
            admit(&record("Small Hill", "T", "PK", Some(120))),
            Err(FilterReason::LowPeak)
        );
        assert_eq!(
            admit(&record("No Data Peak", "T", "MT", None)),
            Err(FilterReason::LowPeak)
        );
        assert_eq!(
            admit(&record("Some Valley", "T", "VAL", None)),
            Err(FilterReason::ExcludedCode)
        );
    }

    #[test]
    fn celestial_features_bypass_terrain_codes() {
        assert!(admit(&record("Olympus Mons (Mars)", "T", "MTS", None)).is_ok());
        assert!(admit(&record("Tycho (Moon)", "T", "CRTR", None)).is_ok());
        assert_eq!(
            admit(&record("Crater Lake (Oregon)", "T", "CRTR", None)),
            Err(FilterReason::ExcludedCode)
        );
    }

    #[test]
    fn unknown_class_rejected() {
        assert_eq!(
            admit(&record("Some Stream", "H", "STM", None)),
            Err(FilterReason::UnsupportedClass)
        );
    }
}
