//! Integer rank scoring for search-result ordering.

use crate::models::{FeatureClass, RawPlaceRecord};

/// Which input file the record came from. The first-pass cities file
/// carries more trustworthy entries than the broader follow-up feed, so
/// its records start higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacePass {
    Cities,
    Broad,
}

/// National-capital code.
const CAPITAL_CODE: &str = "PPLC";
/// First-order admin seat codes.
const ADMIN_SEAT_CODES: &[&str] = &["PPLA", "PPLA2"];

/// Population bonus threshold for ordinary places.
const LARGE_CITY_POPULATION: i64 = 100_000;
/// Capitals already get a flat bonus; they only earn the population
/// bonus past this higher bar.
const LARGE_CAPITAL_POPULATION: i64 = 1_000_000;

/// Rank is a tie-break signal, not a correctness property.
pub fn rank(record: &RawPlaceRecord, class: FeatureClass, pass: PlacePass) -> i32 {
    let mut rank = match class {
        FeatureClass::Terrain => 0,
        FeatureClass::Populated => match pass {
            PlacePass::Cities => 2,
            PlacePass::Broad => 1,
        },
    };

    let code = record.feature_code.as_str();
    let is_capital = code == CAPITAL_CODE;
    if is_capital {
        rank += 2;
    } else if ADMIN_SEAT_CODES.contains(&code) {
        rank += 1;
    }

    if record.population == 0 {
        rank -= 1;
    }

    let threshold = if is_capital {
        LARGE_CAPITAL_POPULATION
    } else {
        LARGE_CITY_POPULATION
    };
    if record.population >= threshold {
        rank += 1;
    }

    rank
}
