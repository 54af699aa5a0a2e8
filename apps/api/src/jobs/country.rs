//! Country detection from free-text locations.
//!
//! The result picks the Adzuna country endpoint and decides whether the
//! regional (European) source is queried.

use std::sync::OnceLock;

use regex::Regex;

use crate::jobs::normalizer::split_location;

/// Returned when nothing in the location string matches.
pub const BASELINE_COUNTRY: &str = "us";

/// Countries for which the regional source is worth querying.
pub const REGIONAL_COUNTRIES: &[&str] = &["de", "at", "ch", "nl", "be", "fr", "it", "es", "pl", "gb"];

/// (lower-cased country name or alias, Adzuna country code)
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("netherlands", "nl"),
    ("the netherlands", "nl"),
    ("holland", "nl"),
    ("nederland", "nl"),
    ("united kingdom", "gb"),
    ("great britain", "gb"),
    ("england", "gb"),
    ("scotland", "gb"),
    ("wales", "gb"),
    ("uk", "gb"),
    ("germany", "de"),
    ("deutschland", "de"),
    ("austria", "at"),
    ("österreich", "at"),
    ("switzerland", "ch"),
    ("schweiz", "ch"),
    ("belgium", "be"),
    ("belgië", "be"),
    ("belgique", "be"),
    ("france", "fr"),
    ("italy", "it"),
    ("italia", "it"),
    ("spain", "es"),
    ("españa", "es"),
    ("poland", "pl"),
    ("polska", "pl"),
    ("united states", "us"),
    ("usa", "us"),
    ("canada", "ca"),
    ("australia", "au"),
    ("new zealand", "nz"),
    ("brazil", "br"),
    ("brasil", "br"),
    ("mexico", "mx"),
    ("méxico", "mx"),
    ("india", "in"),
    ("singapore", "sg"),
    ("south africa", "za"),
];

/// (lower-cased city name, Adzuna country code)
const CITY_NAMES: &[(&str, &str)] = &[
    ("amsterdam", "nl"),
    ("rotterdam", "nl"),
    ("utrecht", "nl"),
    ("eindhoven", "nl"),
    ("the hague", "nl"),
    ("den haag", "nl"),
    ("breda", "nl"),
    ("groningen", "nl"),
    ("tilburg", "nl"),
    ("london", "gb"),
    ("manchester", "gb"),
    ("edinburgh", "gb"),
    ("birmingham", "gb"),
    ("bristol", "gb"),
    ("berlin", "de"),
    ("munich", "de"),
    ("münchen", "de"),
    ("hamburg", "de"),
    ("frankfurt", "de"),
    ("cologne", "de"),
    ("köln", "de"),
    ("vienna", "at"),
    ("wien", "at"),
    ("zurich", "ch"),
    ("zürich", "ch"),
    ("geneva", "ch"),
    ("brussels", "be"),
    ("antwerp", "be"),
    ("ghent", "be"),
    ("paris", "fr"),
    ("lyon", "fr"),
    ("milan", "it"),
    ("rome", "it"),
    ("madrid", "es"),
    ("barcelona", "es"),
    ("warsaw", "pl"),
    ("krakow", "pl"),
    ("kraków", "pl"),
    ("toronto", "ca"),
    ("vancouver", "ca"),
    ("montreal", "ca"),
    ("sydney", "au"),
    ("melbourne", "au"),
    ("auckland", "nz"),
    ("são paulo", "br"),
    ("sao paulo", "br"),
    ("mexico city", "mx"),
    ("bangalore", "in"),
    ("bengaluru", "in"),
    ("mumbai", "in"),
    ("cape town", "za"),
    ("johannesburg", "za"),
];

fn us_state_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:^|,\s*)(AL|AK|AZ|AR|CA|CO|CT|DE|FL|GA|HI|ID|IL|IN|IA|KS|KY|LA|ME|MD|MA|MI|MN|MS|MO|MT|NE|NV|NH|NJ|NM|NY|NC|ND|OH|OK|OR|PA|RI|SC|SD|TN|TX|UT|VT|VA|WA|WV|WI|WY|DC)\b",
        )
        .expect("valid US state regex")
    })
}

/// Detects a two-letter Adzuna country code from a free-text location.
///
/// Order: a `City, ST` US state suffix, then country names, then city names,
/// then a US state abbreviation anywhere. Falls back to `BASELINE_COUNTRY`.
/// A suffix that is also the country code of the named city ("Berlin, DE",
/// "Toronto, CA") is read as that country.
pub fn detect_country(location: Option<&str>) -> &'static str {
    let Some(raw) = location.map(str::trim).filter(|l| !l.is_empty()) else {
        return BASELINE_COUNTRY;
    };
    let lower = raw.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| c == ',' || c == '/' || c == '(' || c == ')')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let lookup = |table: &[(&str, &'static str)]| {
        table
            .iter()
            .find(|(name, _)| tokens.iter().any(|t| t == name) || contains_word(&lower, name))
            .map(|(_, code)| *code)
    };

    let parts = split_location(raw);
    if let (Some(state), None) = (parts.state.as_deref(), parts.country.as_deref()) {
        let city_country = lookup(CITY_NAMES);
        if us_state_pattern().is_match(state)
            && city_country != Some(state.to_lowercase().as_str())
        {
            return "us";
        }
    }

    if let Some(code) = lookup(COUNTRY_NAMES) {
        return code;
    }
    if let Some(code) = lookup(CITY_NAMES) {
        return code;
    }
    if us_state_pattern().is_match(raw) {
        return "us";
    }
    BASELINE_COUNTRY
}

pub fn is_regional(country_code: &str) -> bool {
    REGIONAL_COUNTRIES.contains(&country_code)
}

/// Whole-word containment so "uk" does not match "ukraine".
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
