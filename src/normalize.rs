//! Pure name transforms: match-key derivation, prefix simplification,
//! comma-inverted name repair, and phonetic keys.
//!
//! Everything here is deterministic and total; no reference data, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use rphonetic::{DoubleMetaphone, Encoder};

/// Maximum length of a derived match key.
pub const KEY_LEN: usize = 40;

/// Abbreviations folded only when the token opens the name.
const LEADING_FOLDS: &[(&str, &str)] = &[("FORT", "FT"), ("MOUNT", "MT"), ("POINT", "PT")];

/// Abbreviations folded wherever the token occurs.
const TOKEN_FOLDS: &[(&str, &str)] = &[("SAINT", "ST"), ("SAINTE", "STE")];

/// Generic/article words a bare-form key strips from the front of a name.
pub(crate) const GENERIC_PREFIXES: &[&str] = &[
    "THE", "LAKE", "MOUNT", "MT", "FORT", "FT", "POINT", "PT", "CAPE", "PORT", "LA", "LE", "LOS",
    "LAS", "EL",
];

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// `"Mount Pleasant, The"`: remainder is a bare article.
static INVERTED_ARTICLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<rest>.+?),\s*(?P<lead>[Tt]he|[Aa]n?|[Ll][ae]s?|[Ll]os|[Ee]l)$").unwrap()
});

/// `"Hole, Devil's"`: remainder ends in a possessive fragment.
static INVERTED_POSSESSIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<rest>.+?),\s*(?P<lead>\S+(?:'s|s'))$").unwrap());

/// ASCII-fold a name and break it into uppercase `[A-Z0-9]` tokens.
/// Hyphens and periods act as token separators; everything else outside
/// the token alphabet is dropped.
fn ascii_tokens(name: &str) -> Vec<String> {
    let stripped = PARENTHETICAL.replace_all(name, " ");
    let folded = deunicode::deunicode(&stripped).to_uppercase();

    let mut cleaned = String::with_capacity(folded.len());
    for ch in folded.chars() {
        match ch {
            'A'..='Z' | '0'..='9' | ' ' => cleaned.push(ch),
            '-' | '.' => cleaned.push(' '),
            _ => {}
        }
    }

    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Fold abbreviations and glue tokens into a key capped at [`KEY_LEN`].
fn fold_and_join(tokens: &[String], leading_folds: bool) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        let mut t = token.as_str();
        if i == 0 && leading_folds {
            if let Some((_, to)) = LEADING_FOLDS.iter().find(|(from, _)| *from == t) {
                t = to;
            }
        }
        if let Some((_, to)) = TOKEN_FOLDS.iter().find(|(from, _)| *from == t) {
            t = to;
        }
        out.push_str(t);
    }
    out.truncate(KEY_LEN);
    out
}

/// Derive the canonical match key for a display name.
///
/// Parenthetical suffixes are dropped, the rest is transliterated to
/// uppercase ASCII, punctuation is folded away, abbreviations are
/// canonicalized, and the result is the space-free first 40 characters.
pub fn canonical_key(name: &str) -> String {
    fold_and_join(&ascii_tokens(name), true)
}

/// Same derivation as [`canonical_key`], except that with `as_variant` set
/// a leading generic/article word is stripped instead of folded, producing
/// the bare form used for prefix matching. The strip consumes the
/// leading-token fold slot, so the newly exposed token is not re-folded.
pub fn simplify(name: &str, as_variant: bool) -> String {
    let mut tokens = ascii_tokens(name);
    if as_variant && tokens.len() > 1 && GENERIC_PREFIXES.contains(&tokens[0].as_str()) {
        tokens.remove(0);
        return fold_and_join(&tokens, false);
    }
    fold_and_join(&tokens, true)
}

/// One-directional prefix test on bare forms: does `candidate` extend
/// `target`? Holds for equal names; the reverse direction does not follow.
pub fn close_match(target: &str, candidate: &str) -> bool {
    let target = simplify(target, true);
    if target.is_empty() {
        return false;
    }
    simplify(candidate, true).starts_with(&target)
}

/// Un-invert comma-rearranged names (`"Mount Pleasant, The"`), returning
/// the restored name and the leading word as a separate variant. Names
/// matching neither sub-pattern come back unchanged with an empty variant.
pub fn fix_rearranged_name(name: &str) -> (String, String) {
    let trimmed = name.trim();
    for pattern in [&*INVERTED_ARTICLE, &*INVERTED_POSSESSIVE] {
        if let Some(caps) = pattern.captures(trimmed) {
            let rest = &caps["rest"];
            let lead = &caps["lead"];
            return (format!("{} {}", lead, rest), lead.to_string());
        }
    }
    (trimmed.to_string(), String::new())
}

/// Two-code phonetic key for sound-alike matching. Codes can be equal;
/// callers drop the second one in that case.
pub fn phonetic_keys(name: &str) -> (String, String) {
    let encoder = DoubleMetaphone::default();
    (encoder.encode(name), encoder.encode_alternate(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_folds_diacritics_and_punctuation() {
        assert_eq!(canonical_key("São Paulo"), "SAOPAULO");
        assert_eq!(canonical_key("Winston-Salem"), "WINSTONSALEM");
        assert_eq!(canonical_key("Côte d'Ivoire"), "COTEDIVOIRE");
    }

    #[test]
    fn key_drops_parenthetical_suffix() {
        assert_eq!(canonical_key("Mount Pleasant (historical)"), "MTPLEASANT");
    }

    #[test]
    fn key_folds_abbreviations() {
        assert_eq!(canonical_key("Fort Wayne"), "FTWAYNE");
        assert_eq!(canonical_key("Saint Louis"), "STLOUIS");
        // Dotted form lands on the same key as the spelled-out form.
        assert_eq!(canonical_key("St. Louis"), "STLOUIS");
        assert_eq!(canonical_key("Sault Sainte Marie"), "SAULTSTEMARIE");
        // MOUNT folds only at the front.
        assert_eq!(canonical_key("Rocky Mount"), "ROCKYMOUNT");
    }

    #[test]
    fn key_is_capped_and_ascii() {
        let key = canonical_key("Llanfairpwllgwyngyllgogerychwyrndrobwllllantysiliogogogoch");
        assert_eq!(key.len(), KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn key_is_deterministic() {
        let name = "Île-à-la-Crosse";
        assert_eq!(canonical_key(name), canonical_key(name));
    }

    #[test]
    fn simplify_strips_leading_generic_word() {
        assert_eq!(simplify("Lake Placid", true), "PLACID");
        assert_eq!(simplify("The Mount Pleasant", true), "MOUNTPLEASANT");
        // Without the variant flag the normal folds apply.
        assert_eq!(simplify("Lake Placid", false), "LAKEPLACID");
        // A bare generic word is never stripped to nothing.
        assert_eq!(simplify("Mount", true), "MT");
    }

    #[test]
    fn close_match_is_a_one_way_prefix_test() {
        assert!(close_match("Spring", "Springfield"));
        assert!(!close_match("Springfield", "Spring"));
        assert!(close_match("Lake Tahoe", "Tahoe City"));
        assert!(close_match("Springfield", "Springfield"));
        assert!(!close_match("", "Springfield"));
    }

    #[test]
    fn rearranged_article_is_uninverted() {
        let (name, variant) = fix_rearranged_name("Mount Pleasant, The");
        assert_eq!(name, "The Mount Pleasant");
        assert_eq!(variant, "The");
    }

    #[test]
    fn rearranged_possessive_is_uninverted() {
        let (name, variant) = fix_rearranged_name("Hole, Devil's");
        assert_eq!(name, "Devil's Hole");
        assert_eq!(variant, "Devil's");
    }

    #[test]
    fn unrearranged_names_pass_through() {
        let (name, variant) = fix_rearranged_name("Springfield");
        assert_eq!(name, "Springfield");
        assert_eq!(variant, "");
    }

    #[test]
    fn phonetic_keys_match_sound_alikes() {
        let (smith, _) = phonetic_keys("Smith");
        let (smyth, _) = phonetic_keys("Smyth");
        assert!(!smith.is_empty());
        assert_eq!(smith, smyth);
        assert_eq!(phonetic_keys("Chicago"), phonetic_keys("Chicago"));
    }
}
