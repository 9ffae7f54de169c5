//! CSV / JSON catalog loading.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{apply_aliases, apply_builtin_aliases, Catalog};
use crate::types::{CountryRecord, IndicatorRecord};

#[derive(Debug, Deserialize)]
struct IndicatorRow {
    id: String,
    name: String,
    #[serde(default)]
    unit: String,
    #[serde(default, rename = "sourceNote")]
    source_note: String,
    #[serde(default)]
    topics: String,
    #[serde(default)]
    source: String,
}

#[derive(Debug, Deserialize)]
struct CountryRow {
    name: String,
    #[serde(default)]
    iso3: String,
    #[serde(default)]
    wb2_code: String,
    wb3_code: String,
}

impl From<IndicatorRow> for IndicatorRecord {
    fn from(row: IndicatorRow) -> Self {
        Self {
            code: row.id.trim().to_string(),
            name: row.name.trim().to_string(),
            topic: row.topics,
            description: row.source_note,
            unit: row.unit,
            source: row.source,
        }
    }
}

impl From<CountryRow> for CountryRecord {
    fn from(row: CountryRow) -> Self {
        let wb3 = row.wb3_code.trim().to_string();
        let mut record = CountryRecord::new(wb3.clone(), row.name.trim());
        for key in [row.iso3.as_str(), row.wb2_code.as_str(), wb3.as_str()] {
            if !key.trim().is_empty() {
                record.aliases.insert(key.trim().to_lowercase());
            }
        }
        record
    }
}

impl Catalog {
    /// Load an indicator table, a country table, and an optional alias map.
    pub fn from_csv(
        indicators_csv: &Path,
        countries_csv: &Path,
        aliases_json: Option<&Path>,
    ) -> Result<Self> {
        let indicators = read_indicators(indicators_csv)?;
        let mut countries = read_countries(countries_csv)?;

        if let Some(path) = aliases_json.filter(|p| p.exists()) {
            let pairs = read_aliases(path)?;
            let applied = apply_aliases(&mut countries, &pairs);
            tracing::info!(
                path = %path.display(),
                total = pairs.len(),
                applied = applied,
                "Loaded custom country aliases"
            );
        }
        apply_builtin_aliases(&mut countries);

        tracing::info!(
            indicators = indicators.len(),
            countries = countries.len(),
            "Catalog loaded"
        );
        Catalog::new(indicators, countries)
    }
}

pub fn read_indicators(path: &Path) -> Result<Vec<IndicatorRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open indicator table {}", path.display()))?;
    let mut out = Vec::new();
    for (line, row) in reader.deserialize::<IndicatorRow>().enumerate() {
        let row = row.with_context(|| {
            format!("Bad indicator row {} in {}", line + 2, path.display())
        })?;
        out.push(row.into());
    }
    Ok(out)
}

pub fn read_countries(path: &Path) -> Result<Vec<CountryRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open country table {}", path.display()))?;
    let mut out = Vec::new();
    for (line, row) in reader.deserialize::<CountryRow>().enumerate() {
        let row = row
            .with_context(|| format!("Bad country row {} in {}", line + 2, path.display()))?;
        out.push(row.into());
    }
    Ok(out)
}

/// `{"alias": "WB3"}` pairs, sorted by alias so loading is deterministic.
pub fn read_aliases(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read alias file {}", path.display()))?;
    let map: HashMap<String, String> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse alias file {}", path.display()))?;
    let mut pairs: Vec<(String, String)> = map.into_iter().collect();
    pairs.sort();
    Ok(pairs)
}
