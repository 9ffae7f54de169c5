//! In-memory indicator and country tables.
//!
//! Both tables are read-only once built. Indicators keep their insertion
//! order, which the similarity index relies on for tie-breaking.

pub mod loader;

use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::types::{CountryRecord, IndicatorRecord};

/// Shortcut spellings added on top of whatever the country table provides.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("ksa", "SAU"),
    ("saudi", "SAU"),
    ("المملكة العربية السعودية", "SAU"),
    ("السعودية", "SAU"),
    ("usa", "USA"),
    ("united states", "USA"),
    ("us", "USA"),
    ("uk", "GBR"),
    ("united kingdom", "GBR"),
    ("egypt", "EGY"),
];

/// Long official forms rewritten before lookup.
const NAME_REWRITES: &[(&str, &str)] = &[
    ("kingdom of saudi arabia", "saudi arabia"),
    ("united states of america", "united states"),
];

#[derive(Debug, Clone)]
pub struct Catalog {
    indicators: Vec<Arc<IndicatorRecord>>,
    by_code: HashMap<String, usize>,
    countries: CountryCatalog,
}

impl Catalog {
    pub fn new(indicators: Vec<IndicatorRecord>, countries: Vec<CountryRecord>) -> Result<Self> {
        let mut by_code = HashMap::with_capacity(indicators.len());
        for (i, ind) in indicators.iter().enumerate() {
            if by_code.insert(ind.code.clone(), i).is_some() {
                bail!("duplicate indicator code '{}'", ind.code);
            }
        }

        Ok(Self {
            indicators: indicators.into_iter().map(Arc::new).collect(),
            by_code,
            countries: CountryCatalog::new(countries)?,
        })
    }

    pub fn indicators(&self) -> &[Arc<IndicatorRecord>] {
        &self.indicators
    }

    pub fn indicator(&self, code: &str) -> Option<&Arc<IndicatorRecord>> {
        self.by_code.get(code).map(|&i| &self.indicators[i])
    }

    pub fn countries(&self) -> &CountryCatalog {
        &self.countries
    }
}

#[derive(Debug, Clone)]
pub struct CountryCatalog {
    countries: Vec<Arc<CountryRecord>>,
    by_code: HashMap<String, usize>,
    /// Lower-cased spelling -> country position.
    by_spelling: HashMap<String, usize>,
}

impl CountryCatalog {
    pub fn new(countries: Vec<CountryRecord>) -> Result<Self> {
        let mut by_code = HashMap::with_capacity(countries.len());
        let mut by_spelling: HashMap<String, usize> = HashMap::new();

        for (i, country) in countries.iter().enumerate() {
            if by_code.insert(country.iso3_code.clone(), i).is_some() {
                bail!("duplicate country code '{}'", country.iso3_code);
            }
            for spelling in country.spellings() {
                if spelling.is_empty() {
                    continue;
                }
                if let Some(&owner) = by_spelling.get(&spelling) {
                    if owner != i {
                        tracing::warn!(
                            alias = %spelling,
                            kept = %countries[owner].iso3_code,
                            dropped = %country.iso3_code,
                            "Country alias claimed twice, keeping first owner"
                        );
                    }
                    continue;
                }
                by_spelling.insert(spelling, i);
            }
        }

        Ok(Self {
            countries: countries.into_iter().map(Arc::new).collect(),
            by_code,
            by_spelling,
        })
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CountryRecord>> {
        self.countries.iter()
    }

    pub fn by_code(&self, code: &str) -> Option<&Arc<CountryRecord>> {
        self.by_code.get(code).map(|&i| &self.countries[i])
    }

    /// Exact, case-insensitive match against canonical names and aliases.
    pub fn lookup(&self, phrase: &str) -> Option<&Arc<CountryRecord>> {
        let raw = phrase.trim().to_lowercase();
        let hit = self
            .by_spelling
            .get(&raw)
            .or_else(|| self.by_spelling.get(&normalize_country_phrase(phrase)));
        hit.map(|&i| &self.countries[i])
    }

    /// Every known spelling with its owner, in no particular order.
    pub fn spellings(&self) -> impl Iterator<Item = (&str, &Arc<CountryRecord>)> {
        self.by_spelling
            .iter()
            .map(|(s, &i)| (s.as_str(), &self.countries[i]))
    }
}

/// Lower-case, trim, and rewrite long official names to their short form.
pub fn normalize_country_phrase(phrase: &str) -> String {
    let mut key = phrase
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase();
    key = key.strip_prefix("the ").map(str::to_string).unwrap_or(key);
    for (long, short) in NAME_REWRITES {
        key = key.replace(long, short);
    }
    key
}

/// Add the built-in shortcut aliases to any country present in `countries`.
/// Shortcuts for absent countries are skipped silently.
pub fn apply_builtin_aliases(countries: &mut [CountryRecord]) {
    let pairs: Vec<(String, String)> = BUILTIN_ALIASES
        .iter()
        .map(|(a, c)| (a.to_string(), c.to_string()))
        .collect();
    attach_aliases(countries, &pairs);
}

/// Attach `(alias, code)` pairs to their countries. Returns how many were applied.
pub fn apply_aliases(countries: &mut [CountryRecord], pairs: &[(String, String)]) -> usize {
    let (applied, unknown) = attach_aliases(countries, pairs);
    if !unknown.is_empty() {
        tracing::warn!(codes = ?unknown, "Skipped aliases for unknown country codes");
    }
    applied
}

/// Applied count plus the sorted unknown codes.
fn attach_aliases(
    countries: &mut [CountryRecord],
    pairs: &[(String, String)],
) -> (usize, Vec<String>) {
    let positions: HashMap<String, usize> = countries
        .iter()
        .enumerate()
        .map(|(i, c)| (c.iso3_code.clone(), i))
        .collect();

    let mut applied = 0;
    let mut unknown: HashSet<&str> = HashSet::new();
    for (alias, code) in pairs {
        match positions.get(code) {
            Some(&i) => {
                countries[i].aliases.insert(alias.trim().to_lowercase());
                applied += 1;
            }
            None => {
                unknown.insert(code.as_str());
            }
        }
    }

    let mut codes: Vec<String> = unknown.into_iter().map(str::to_string).collect();
    codes.sort_unstable();
    (applied, codes)
}
