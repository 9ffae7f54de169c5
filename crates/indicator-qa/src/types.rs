use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One statistical series in the indicator catalog. Identity is `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub source: String,
}

impl IndicatorRecord {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            topic: String::new(),
            description: String::new(),
            unit: String::new(),
            source: String::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

/// A country and every spelling it answers to. Aliases are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub iso3_code: String,
    pub canonical_name: String,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
}

impl CountryRecord {
    pub fn new(iso3_code: impl Into<String>, canonical_name: impl Into<String>) -> Self {
        Self {
            iso3_code: iso3_code.into(),
            canonical_name: canonical_name.into(),
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.insert(alias.trim().to_lowercase());
        self
    }

    /// Canonical name followed by aliases, all lower-cased.
    pub fn spellings(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.canonical_name.to_lowercase()).chain(self.aliases.iter().cloned())
    }
}

/// Which parser strategy produced an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    Llm,
    Rules,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Rules => "rules",
        }
    }
}

/// Structured reading of one question. Built once per query, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub concept_phrase: String,
    pub country_phrase: Option<String>,
    pub year: Option<i32>,
    pub comparison_qualifiers: Vec<String>,
    pub parser: ParserKind,
    /// Why the LLM strategy was skipped, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// One ranked match from the similarity index.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub indicator: Arc<IndicatorRecord>,
    /// Always within [0, 1].
    pub score: f32,
}

impl Candidate {
    pub fn new(indicator: Arc<IndicatorRecord>, score: f32) -> Self {
        Self {
            indicator,
            score: clamp_score(score),
        }
    }
}

pub(crate) fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Year the caller wants data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearRequest {
    Exact(i32),
    Latest,
}

impl YearRequest {
    pub fn requested(&self) -> Option<i32> {
        match self {
            Self::Exact(year) => Some(*year),
            Self::Latest => None,
        }
    }
}

/// Final answer of the resolver, before any data has been fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub country: Arc<CountryRecord>,
    pub indicator: Arc<IndicatorRecord>,
    pub year: YearRequest,
    pub score: f32,
    pub confidence_margin: Option<f32>,
    pub diagnostic_note: String,
}

/// What the data-fetch collaborator returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub value: f64,
    pub year_used: i32,
    pub source_url: String,
}

/// The externally visible answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question: String,
    pub country_code: String,
    pub indicator_code: String,
    pub indicator_name: String,
    pub unit: String,
    pub value: String,
    pub raw_value: f64,
    pub requested_year: Option<i32>,
    pub year_used: i32,
    pub confidence_margin: Option<f32>,
    pub low_confidence: bool,
    pub source_url: String,
    pub parser: ParserKind,
    pub diagnostic_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
