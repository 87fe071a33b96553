//! Resolves raw feed name tuples into canonical administrative names.
//!
//! The steps run in a fixed order, each a pure function over the rule
//! tables in [`rules`] and the immutable [`ReferenceData`] handed to the
//! resolver. Every step either rejects the record, produces a canonical
//! value, or degrades to a best-effort pass-through with a diagnostic.

pub mod rules;

use tracing::debug;

use crate::models::ReferenceData;
use crate::normalize;

/// Raw name tuple as it appears in a feed row.
#[derive(Debug, Clone, Copy)]
pub struct RawNames<'a> {
    pub city: &'a str,
    pub county: &'a str,
    pub state: &'a str,
    pub country: &'a str,
}

/// Canonical output of a successful resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedNames {
    /// Display city name, un-inverted and trimmed.
    pub city: String,
    /// Leading article or generic word split off from the city, if any.
    pub variant: String,
    /// Canonical county name; `None` when the county collapsed onto the
    /// city (independent cities).
    pub county: Option<String>,
    /// 2-letter code for US/CA, cleaned name elsewhere.
    pub state: String,
    /// Full state/province name.
    pub long_state: String,
    /// ISO3 country code, or a `"XX?"` flagged code when unknown.
    pub country: String,
    /// Full country name, or the raw input when unknown.
    pub long_country: String,
}

/// Outcome of one resolution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Canonical value found.
    Resolved(T),
    /// No table entry; value passed through best-effort.
    Unresolved(T),
    /// The record should be dropped.
    Rejected,
}

impl<T> Step<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Step::Resolved(v) | Step::Unresolved(v) => Some(v),
            Step::Rejected => None,
        }
    }
}

/// Stateless resolver over a reference snapshot.
pub struct AdminResolver<'a> {
    reference: &'a ReferenceData,
}

impl<'a> AdminResolver<'a> {
    pub fn new(reference: &'a ReferenceData) -> Self {
        Self { reference }
    }

    /// Run every step over a raw tuple. `None` means the record was
    /// rejected outright; unresolved codes never fail, they pass through.
    pub fn resolve(&self, raw: RawNames<'_>) -> Option<ProcessedNames> {
        let city = raw.city.trim();
        if city.is_empty() || matches!(reject_noise(city), Step::Rejected) {
            debug!(city = raw.city, "rejected noise city name");
            return None;
        }

        let iso2 = raw.country.trim().to_uppercase();
        let (country, long_country) = self.resolve_country(&iso2, raw.country).into_value()?;

        let state_raw = self.resolve_admin1(&iso2, raw.state.trim());
        let county_raw = self.resolve_admin2(&iso2, raw.state.trim(), raw.county.trim());

        let (city, variant) = split_variant(city);

        let long_state = strip_admin_noise(&state_raw);
        let county_clean = strip_admin_noise(&county_raw);

        let state = match map_state_code(&country, &long_state) {
            Step::Resolved(code) => code,
            Step::Unresolved(name) => {
                if country == "USA" || country == "CAN" {
                    debug!(state = %name, %country, "state name not in code table");
                }
                name
            }
            Step::Rejected => return None,
        };

        let county = if country == "USA" {
            finalize_us_county(&city, &county_clean, &state)
        } else if county_clean.is_empty() {
            None
        } else {
            Some(county_clean)
        };

        Some(ProcessedNames {
            city,
            variant,
            county,
            state,
            long_state,
            country,
            long_country,
        })
    }

    /// 2-letter country to `(ISO3, long name)`. Unknown codes come back
    /// flagged with a trailing `?` so storage never sees an empty country.
    fn resolve_country(&self, iso2: &str, raw: &str) -> Step<(String, String)> {
        if let Some(entity) = self.reference.country(iso2) {
            return Step::Resolved((entity.code.clone(), entity.name.clone()));
        }
        let mut flagged: String = iso2.chars().take(2).collect();
        while flagged.len() < 2 {
            flagged.push('?');
        }
        flagged.push('?');
        Step::Unresolved((flagged, raw.trim().to_string()))
    }

    /// Swap a feed admin1 code for its reference name when the table has
    /// it; otherwise the raw value passes through unchanged.
    fn resolve_admin1(&self, iso2: &str, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        match self.reference.admin1(&format!("{iso2}.{raw}")) {
            Some(entity) => entity.name.clone(),
            None => raw.to_string(),
        }
    }

    /// Admin2 lookup tries the bare county against both dotted key shapes.
    /// A miss with a numeric `"<admin1>."` echo prefix keeps only the tail.
    fn resolve_admin2(&self, iso2: &str, state: &str, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        for key in [format!("{iso2}.{raw}"), format!("{iso2}.{state}.{raw}")] {
            if let Some(entity) = self.reference.admin2(&key) {
                return entity.name.clone();
            }
        }
        if let Some(idx) = raw.find('.') {
            let (head, tail) = raw.split_at(idx);
            if !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) {
                return tail[1..].trim().to_string();
            }
        }
        raw.to_string()
    }
}

/// Step 1: house numbers, lot numbers, and housing-estate vocabulary mean
/// the row is an address fragment, not a settlement.
fn reject_noise(city: &str) -> Step<()> {
    if rules::NOISE_PATTERNS.iter().any(|re| re.is_match(city)) {
        Step::Rejected
    } else {
        Step::Resolved(())
    }
}

/// Step 4: un-invert `"X, The"` forms, else split a leading generic word
/// (`Lake`, `Mount`, ...) off as the variant marker.
fn split_variant(city: &str) -> (String, String) {
    let (name, variant) = normalize::fix_rearranged_name(city);
    if !variant.is_empty() {
        return (name, variant);
    }
    let mut words = name.split_whitespace();
    if let Some(first) = words.next() {
        if words.next().is_some()
            && normalize::GENERIC_PREFIXES.contains(&first.to_uppercase().as_str())
        {
            return (name.clone(), first.to_string());
        }
    }
    (name, String::new())
}

/// Step 5: drop administrative suffixes/prefixes from a state or county
/// string, in table order.
fn strip_admin_noise(value: &str) -> String {
    let mut out = value.trim().to_string();
    for (re, repl) in rules::ADMIN_NOISE.iter() {
        out = re.replace_all(&out, *repl).into_owned();
    }
    out.trim().to_string()
}

/// Step 6: US/CA state names map to 2-letter codes; everything else
/// passes through.
fn map_state_code(country: &str, state: &str) -> Step<String> {
    if state.is_empty() {
        return Step::Resolved(String::new());
    }
    let table = match country {
        "USA" => &rules::US_STATE_CODES,
        "CAN" => &rules::CA_PROVINCE_CODES,
        _ => return Step::Unresolved(state.to_string()),
    };
    match table.lookup(state) {
        Some(code) => Step::Resolved(code.to_string()),
        None => Step::Unresolved(state.to_string()),
    }
}

/// Step 7: canonicalize a US county and decide whether it survives.
///
/// Recognized `"<county>, <state>"` pairs are kept verbatim. Anything
/// else goes through the independent-city heuristics: a county that is
/// really the city again is dropped, a decorated city-county keeps a
/// `City of` prefix, and the rest stay best-effort.
fn finalize_us_county(city: &str, county: &str, state: &str) -> Option<String> {
    if county.is_empty() {
        return None;
    }
    let standardized = standardize_us_county(county);
    if rules::US_COUNTIES.contains(format!("{standardized}, {state}").as_str()) {
        return Some(standardized);
    }

    let city_key = normalize::canonical_key(city);
    if normalize::canonical_key(&standardized) == city_key {
        debug!(%county, %city, "county collapses onto city, dropping");
        return None;
    }

    let had_city_marker = rules::CITY_OF_PREFIX.is_match(&standardized)
        || rules::INDEPENDENT_CITY_SUFFIX.is_match(&standardized);
    let bare = rules::CITY_OF_PREFIX.replace(&standardized, "");
    let bare = rules::INDEPENDENT_CITY_SUFFIX.replace(&bare, "");
    let bare = bare.trim();

    if normalize::canonical_key(bare) == city_key {
        debug!(%county, %city, "county collapses onto city, dropping");
        return None;
    }
    if had_city_marker {
        return Some(format!("City of {bare}"));
    }
    Some(standardized)
}

/// Suffix strip, ordered fixes, then the `Mc` capital restore.
fn standardize_us_county(county: &str) -> String {
    let mut out = rules::COUNTY_SUFFIX.replace(county.trim(), "").into_owned();
    for (re, repl) in rules::COUNTY_FIXES.iter() {
        out = re.replace(&out, *repl).into_owned();
    }
    rules::MC_PREFIX
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            format!("Mc{}", caps[1].to_uppercase())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaceSource, ReferenceEntity};

    fn entity(name: &str, key: &str, code: &str, id: i64) -> ReferenceEntity {
        ReferenceEntity {
            name: name.to_string(),
            key: key.to_string(),
            code: code.to_string(),
            external_id: id,
            source: PlaceSource::Gazetteer,
        }
    }

    fn reference() -> ReferenceData {
        let mut reference = ReferenceData::new();
        reference.add_country("US", entity("United States", "UNITEDSTATES", "USA", 6252001));
        reference.add_country("FR", entity("France", "FRANCE", "FRA", 3017382));
        reference.add_admin1(entity("Missouri", "MISSOURI", "US.29", 4398678));
        reference.add_admin2(entity("St. Louis", "STLOUIS", "US.29.189", 4407084));
        reference
    }

    #[test]
    fn resolves_numeric_codes_to_canonical_tuple() {
        let reference = reference();
        let resolver = AdminResolver::new(&reference);
        let processed = resolver
            .resolve(RawNames {
                city: "Saint Louis",
                county: "29.St. Louis",
                state: "29",
                country: "US",
            })
            .unwrap();
        assert_eq!(processed.country, "USA");
        assert_eq!(processed.long_country, "United States");
        assert_eq!(processed.state, "MO");
        assert_eq!(processed.long_state, "Missouri");
        assert_eq!(processed.county.as_deref(), Some("St. Louis"));
        assert_eq!(processed.city, "Saint Louis");
    }

    #[test]
    fn district_of_columbia_collapses_onto_washington() {
        let reference = reference();
        let resolver = AdminResolver::new(&reference);
        let processed = resolver
            .resolve(RawNames {
                city: "Washington",
                county: "District of Columbia",
                state: "District of Columbia",
                country: "US",
            })
            .unwrap();
        assert_eq!(processed.state, "DC");
        assert_eq!(processed.county, None);
    }

    #[test]
    fn unknown_country_is_flagged_not_dropped() {
        let reference = reference();
        let resolver = AdminResolver::new(&reference);
        let processed = resolver
            .resolve(RawNames {
                city: "Atlantis",
                county: "",
                state: "",
                country: "ZZ",
            })
            .unwrap();
        assert_eq!(processed.country, "ZZ?");
        assert_eq!(processed.long_country, "ZZ");
    }

    #[test]
    fn noise_city_names_reject_the_record() {
        let reference = reference();
        let resolver = AdminResolver::new(&reference);
        for city in ["Sunset Apartments", "4242 Elm", "Lot 3 Hillside"] {
            assert!(
                resolver
                    .resolve(RawNames {
                        city,
                        county: "",
                        state: "29",
                        country: "US",
                    })
                    .is_none(),
                "expected {city:?} to be rejected"
            );
        }
    }

    #[test]
    fn city_of_prefix_kept_when_county_differs() {
        let reference = reference();
        let resolver = AdminResolver::new(&reference);
        let processed = resolver
            .resolve(RawNames {
                city: "Oakton",
                county: "City of Fairfax",
                state: "Virginia",
                country: "US",
            })
            .unwrap();
        assert_eq!(processed.county.as_deref(), Some("City of Fairfax"));

        let processed = resolver
            .resolve(RawNames {
                city: "Fairfax",
                county: "City of Fairfax",
                state: "Virginia",
                country: "US",
            })
            .unwrap();
        assert_eq!(processed.county, None);
    }

    #[test]
    fn county_identical_to_city_is_dropped() {
        let reference = reference();
        let resolver = AdminResolver::new(&reference);
        let processed = resolver
            .resolve(RawNames {
                city: "Carson City",
                county: "Carson City",
                state: "Nevada",
                country: "US",
            })
            .unwrap();
        assert_eq!(processed.state, "NV");
        assert_eq!(processed.county, None);
    }

    #[test]
    fn mc_capitalization_restored() {
        assert_eq!(standardize_us_county("Mclean County"), "McLean");
        assert_eq!(standardize_us_county("Mc henry"), "McHenry");
    }

    #[test]
    fn variant_split_prefers_inversion_then_generic_word() {
        assert_eq!(
            split_variant("Springfield, The"),
            ("The Springfield".to_string(), "The".to_string())
        );
        assert_eq!(
            split_variant("Lake Placid"),
            ("Lake Placid".to_string(), "Lake".to_string())
        );
        assert_eq!(
            split_variant("Springfield"),
            ("Springfield".to_string(), String::new())
        );
    }

    #[test]
    fn admin_noise_stripped_in_order() {
        assert_eq!(strip_admin_noise("Hauts-de-Seine Department"), "Hauts-de-Seine");
        assert_eq!(strip_admin_noise("Province of Turin"), "Turin");
        assert_eq!(strip_admin_noise("  Bavaria  "), "Bavaria");
    }

    #[test]
    fn non_us_county_passes_through_cleaned() {
        let reference = reference();
        let resolver = AdminResolver::new(&reference);
        let processed = resolver
            .resolve(RawNames {
                city: "Lyon",
                county: "Rhône Department",
                state: "Auvergne-Rhône-Alpes",
                country: "FR",
            })
            .unwrap();
        assert_eq!(processed.country, "FRA");
        assert_eq!(processed.county.as_deref(), Some("Rhône"));
        assert_eq!(processed.state, "Auvergne-Rhône-Alpes");
    }
}
