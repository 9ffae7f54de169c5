//! Searchable text for each indicator, and synonym expansion for queries.

use crate::text::squash_whitespace;
use crate::types::IndicatorRecord;

/// Code fragments that say something the indicator name often leaves out.
const CODE_HINTS: &[(&str, &str)] = &[
    (".FE", "female"),
    (".MA", "male"),
    (".ZG", "growth rate annual percentage"),
    (".ZS", "percentage share"),
    (".CD", "current US dollars"),
    (".KD", "constant US dollars"),
    (".PP", "PPP purchasing power parity"),
    (".PC", "per capita"),
    ("1524", "ages 15-24 youth"),
    ("65UP", "ages 65 and above elderly"),
];

/// Extra words appended to a query when it mentions the key.
const SYNONYMS: &[(&str, &str)] = &[
    ("female", "women girls"),
    ("male", "men boys"),
    ("population", "people inhabitants"),
    ("gdp", "gross domestic product economy"),
    ("unemployment", "jobless without work"),
    ("inflation", "cpi consumer price index"),
    ("cpi", "inflation consumer prices"),
    ("65+", "ages 65 and above elderly older senior"),
    ("15-24", "youth young ages 15 to 24"),
];

pub fn code_hints(code: &str) -> Vec<&'static str> {
    CODE_HINTS
        .iter()
        .filter(|(fragment, _)| code.contains(fragment))
        .map(|(_, hint)| *hint)
        .collect()
}

/// Name and unit first, then code hints, description and topic.
pub fn build_document(indicator: &IndicatorRecord) -> String {
    let title = squash_whitespace(&format!("{} {}", indicator.name, indicator.unit));
    let hints = code_hints(&indicator.code).join(" ");
    squash_whitespace(&format!(
        "{}. {}. {}. Topics: {}",
        title, hints, indicator.description, indicator.topic
    ))
}

/// Append synonyms for every key the query mentions. `male` does not fire on
/// `female`.
pub fn expand_query(query: &str) -> String {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    let mut expanded = query.to_string();
    for (key, extra) in SYNONYMS {
        if words.iter().any(|w| w == key) {
            expanded.push(' ');
            expanded.push_str(extra);
        }
    }
    expanded
}
