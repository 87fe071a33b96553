//! Ordered substitution tables and allow-lists behind the resolver.
//!
//! Everything here is data: each rule can be unit-tested on its own, and
//! the tables are applied in a fixed sequence rather than woven into
//! control flow.

use hashbrown::{HashMap, HashSet};
use once_cell::sync::Lazy;
use regex::Regex;

/// City-name noise that rejects the whole record: embedded house/lot
/// numbers, housing-estate vocabulary, trailing district digits.
pub static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(apartments?|apts?|mobile home|trailer (?:park|court)|subdivisions?|condominiums?|housing (?:units?|estates?|projects?))\b",
        r"(?i)\b(?:lot|unit|bldg|building)\s*\d",
        r"^\d+\s",
        r"\d{3,}",
        r"\s\d{1,2}$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Administrative noise stripped from raw state/county strings, in order.
pub static ADMIN_NOISE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"(?i)\s+(province|region|county|district|prefecture|department|departamento|governorate|oblast|voivodeship|municipality|territory)\.?$",
            "",
        ),
        (
            r"(?i)^(county of|province of|provincia de|provincia di|r[ée]gion de|state of|estado de|distrito de|department of|d[ée]partement de)\s+",
            "",
        ),
        (r"\s{2,}", " "),
    ]
    .iter()
    .map(|(p, r)| (Regex::new(p).unwrap(), *r))
    .collect()
});

/// Known orthographic and historical irregularities in US county naming,
/// fixed in table order (earlier rules may feed later ones).
pub static COUNTY_FIXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)^saint\s+(.+)$", "St. ${1}"),
        (r"(?i)^sainte\s+(.+)$", "Ste. ${1}"),
        (r"(?i)^st\s+(.+)$", "St. ${1}"),
        (r"(?i)^ste\s+(.+)$", "Ste. ${1}"),
        (r"(?i)^st\.\s*marys$", "St. Mary's"),
        (r"(?i)^st\.\s*johns$", "St. Johns"),
        (r"(?i)^ste\.\s*genevieve$", "Ste. Genevieve"),
        (r"(?i)^de\s*kalb$", "DeKalb"),
        (r"(?i)^de\s*soto$", "DeSoto"),
        (r"(?i)^du\s*page$", "DuPage"),
        (r"(?i)^la\s*porte$", "LaPorte"),
        (r"(?i)^la\s*salle$", "LaSalle"),
        (r"(?i)^la\s*moure$", "LaMoure"),
        (r"(?i)^o+['\s]*brien$", "O'Brien"),
        (r"(?i)^prince\s+georges$", "Prince George's"),
        (r"(?i)^queen\s+annes$", "Queen Anne's"),
        (r"(?i)^dona\s+ana$", "Dona Ana"),
        (r"(?i)^fond\s+du\s+lac$", "Fond du Lac"),
        (r"(?i)^lewis\s+and\s+clark$", "Lewis and Clark"),
        (r"(?i)^district\s+of\s+columbia$", "Washington"),
    ]
    .iter()
    .map(|(p, r)| (Regex::new(p).unwrap(), *r))
    .collect()
});

/// Generic suffixes dropped from US county names before lookup.
pub static COUNTY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(county|parish|borough|census area|city and borough|municipality|municipio)$")
        .unwrap()
});

/// Independent-city decorations handled by the fallback heuristics.
pub static CITY_OF_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^city of\s+").unwrap());
pub static INDEPENDENT_CITY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\(?(independent city|city)\)?$").unwrap());

/// Lowercased "Mc" followed by a lowercase letter loses its capital in
/// several feeds ("Mcdonald"); restore it.
pub static MC_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bMc ?([a-z])").unwrap());

const US_STATES: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("American Samoa", "AS"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("District of Columbia", "DC"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Guam", "GU"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Northern Mariana Islands", "MP"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Puerto Rico", "PR"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("U.S. Virgin Islands", "VI"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

const CA_PROVINCES: &[(&str, &str)] = &[
    ("Alberta", "AB"),
    ("British Columbia", "BC"),
    ("Manitoba", "MB"),
    ("New Brunswick", "NB"),
    ("Newfoundland and Labrador", "NL"),
    ("Northwest Territories", "NT"),
    ("Nova Scotia", "NS"),
    ("Nunavut", "NU"),
    ("Ontario", "ON"),
    ("Prince Edward Island", "PE"),
    ("Quebec", "QC"),
    ("Saskatchewan", "SK"),
    ("Yukon", "YT"),
];

fn code_maps(table: &[(&'static str, &'static str)]) -> StateCodes {
    let mut exact = HashMap::new();
    let mut folded = HashMap::new();
    let mut codes = HashSet::new();
    for (name, code) in table {
        exact.insert(*name, *code);
        folded.insert(name.to_uppercase(), *code);
        codes.insert(*code);
    }
    StateCodes {
        exact,
        folded,
        codes,
    }
}

/// Exact and uppercase-normalized state lookups plus the valid code set.
pub struct StateCodes {
    exact: HashMap<&'static str, &'static str>,
    folded: HashMap<String, &'static str>,
    codes: HashSet<&'static str>,
}

impl StateCodes {
    /// Map a state/province name (or an already-canonical code) to its
    /// 2-letter code.
    pub fn lookup(&self, name: &str) -> Option<&'static str> {
        if let Some(code) = self.exact.get(name) {
            return Some(code);
        }
        let upper = name.to_uppercase();
        if let Some(code) = self.folded.get(upper.as_str()) {
            return Some(code);
        }
        if upper.len() == 2 {
            return self.codes.get(upper.as_str()).copied();
        }
        None
    }
}

pub static US_STATE_CODES: Lazy<StateCodes> = Lazy::new(|| code_maps(US_STATES));
pub static CA_PROVINCE_CODES: Lazy<StateCodes> = Lazy::new(|| code_maps(CA_PROVINCES));

/// Recognized `"<county>, <state>"` pairs. Everything outside this set goes
/// through the independent-city heuristics instead.
pub static US_COUNTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    include_str!("../../data/us_counties.txt")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect()
});
