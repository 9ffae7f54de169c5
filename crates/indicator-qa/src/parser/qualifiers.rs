//! Measurement and demographic qualifiers ("per capita", "female", ...).
//!
//! Both parser strategies run the raw question through [`detect`]; the LLM
//! strategy also feeds in whatever qualifiers the model reported.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::text::{squash_whitespace, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    PerCapita,
    Ppp,
    ConstantUsd,
    CurrentUsd,
    Growth,
    Percent,
    Female,
    Male,
    Ages65Up,
    Ages15To24,
}

impl Qualifier {
    /// Canonical phrase stored in `ParsedIntent::comparison_qualifiers`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerCapita => "per capita",
            Self::Ppp => "ppp",
            Self::ConstantUsd => "constant usd",
            Self::CurrentUsd => "current usd",
            Self::Growth => "growth",
            Self::Percent => "percent",
            Self::Female => "female",
            Self::Male => "male",
            Self::Ages65Up => "ages 65+",
            Self::Ages15To24 => "ages 15-24",
        }
    }

    /// Words appended to the index query for this qualifier.
    fn search_term(&self) -> &'static str {
        match self {
            Self::PerCapita => "per capita",
            Self::Ppp => "ppp",
            Self::ConstantUsd => "constant",
            Self::CurrentUsd => "current",
            Self::Growth => "growth",
            Self::Percent => "percent",
            Self::Female => "female",
            Self::Male => "male",
            Self::Ages65Up => "65+",
            Self::Ages15To24 => "15-24",
        }
    }

    /// Accepts canonical phrases and the looser spellings models tend to emit.
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        let key = squash_whitespace(&phrase.trim().to_lowercase().replace('_', " "));
        let q = match key.as_str() {
            "per capita" | "per-capita" => Self::PerCapita,
            "ppp" | "purchasing power parity" => Self::Ppp,
            "constant usd" | "constant" | "constant us$" | "real" => Self::ConstantUsd,
            "current usd" | "current" | "current us$" | "nominal" | "usd" => Self::CurrentUsd,
            "growth" | "growth rate" | "yoy" | "annual growth" => Self::Growth,
            "percent" | "percentage" | "percent share" | "%" | "share" => Self::Percent,
            "female" | "women" | "woman" => Self::Female,
            "male" | "men" | "man" => Self::Male,
            "ages 65+" | "65+" | "65up" | "ages 65 and above" | "elderly" => Self::Ages65Up,
            "ages 15-24" | "15-24" | "1524" | "youth" => Self::Ages15To24,
            _ => return None,
        };
        Some(q)
    }
}

static PER_CAPITA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bper[\s-]+capita\b").expect("per capita regex is valid"));
static PPP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bppp\b").expect("ppp regex is valid"));
static GROWTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(growth|yoy)\b").expect("growth regex is valid"));
static CONSTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(constant|real)\b").expect("constant regex is valid"));
static CURRENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(current|nominal|usd)\b").expect("current regex is valid"));
static PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%|\b(percent|percentage|share)\b").expect("percent regex is valid")
});
static RATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\srate\b").expect("rate regex is valid"));
static RATE_CONCEPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(unemployment|inflation|cpi)\b").expect("rate concept regex is valid")
});
static FEMALE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(female|females|women|woman|girls)\b").expect("female regex is valid")
});
static MALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(male|males|men|man|boys)\b").expect("male regex is valid"));
static AGE_65: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b65\s*(\+|plus\b|and\s+(over|above|older)\b|or\s+(over|older)\b)|\belderly\b")
        .expect("age 65 regex is valid")
});
static AGE_15_24: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b15\s*(-|–|to)\s*24\b|\byouth\b").expect("age 15-24 regex is valid")
});
static LATEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(latest|most\s+recent)\b").expect("latest regex is valid"));

/// Fragments stripped from concept phrases before they reach the index;
/// the matching qualifiers are appended back as normalised terms.
/// Consumer price index wording is the inflation concept.
static PRICE_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:cpi|consumer\s+price\s+index)\b").expect("price index regex is valid")
});

static DEMOGRAPHIC_FRAGMENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\(\s*ages?\s+[^)]*\)",
        r"\bages?\s+\d+\s*(\+|plus\b|(-|–|to)\s*\d+\b|and\s+(above|over|older)\b)?",
        r"\b65\s*\+",
        r"\b15\s*(-|–)\s*24\b",
        r"\b(females?|males?|women|woman|men|man|girls|boys|elderly|youth)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("demographic fragment regex is valid"))
    .collect()
});

pub fn wants_latest(question: &str) -> bool {
    LATEST.is_match(&question.to_lowercase())
}

/// Qualifiers implied by the wording of `question`, in a fixed order.
pub fn detect(question: &str) -> Vec<Qualifier> {
    let q = question.to_lowercase();
    let mut found = Vec::new();

    let growth = GROWTH.is_match(&q);
    if PER_CAPITA.is_match(&q) {
        found.push(Qualifier::PerCapita);
    }
    if PPP.is_match(&q) {
        found.push(Qualifier::Ppp);
    }
    if !growth {
        if CONSTANT.is_match(&q) {
            found.push(Qualifier::ConstantUsd);
        }
        if CURRENT.is_match(&q) {
            found.push(Qualifier::CurrentUsd);
        }
    }

    if growth {
        found.push(Qualifier::Growth);
    } else if PERCENT.is_match(&q) || (RATE.is_match(&q) && !RATE_CONCEPT.is_match(&q)) {
        found.push(Qualifier::Percent);
    }

    if FEMALE.is_match(&q) {
        found.push(Qualifier::Female);
    } else if MALE.is_match(&q) {
        found.push(Qualifier::Male);
    }

    if AGE_65.is_match(&q) {
        found.push(Qualifier::Ages65Up);
    }
    if AGE_15_24.is_match(&q) {
        found.push(Qualifier::Ages15To24);
    }
    found
}

/// Merge model-reported qualifiers with detected ones, keeping first-seen
/// order. A growth request drops the USD qualifiers, as in [`detect`].
pub fn merge(reported: &[String], detected: &[Qualifier]) -> Vec<String> {
    let parsed: Vec<Qualifier> = reported
        .iter()
        .filter_map(|r| Qualifier::from_phrase(r))
        .chain(detected.iter().copied())
        .collect();
    let growth = parsed.contains(&Qualifier::Growth);

    let mut seen = HashSet::new();
    parsed
        .into_iter()
        .filter(|q| !(growth && matches!(q, Qualifier::ConstantUsd | Qualifier::CurrentUsd)))
        .filter(|q| seen.insert(*q))
        .map(|q| q.as_str().to_string())
        .collect()
}

/// Text handed to the similarity index: the concept without demographic
/// fragments, followed by the qualifier terms it does not already contain.
pub fn build_search_text(concept: &str, qualifiers: &[String]) -> String {
    let lowered = concept.to_lowercase().replace('_', " ");
    let mut cleaned = PRICE_INDEX
        .replace_all(&lowered, "inflation consumer prices")
        .into_owned();
    for re in DEMOGRAPHIC_FRAGMENTS.iter() {
        cleaned = re.replace_all(&cleaned, " ").into_owned();
    }
    let mut cleaned = squash_whitespace(cleaned.trim_matches(|c: char| c == ',' || c.is_whitespace()));
    if cleaned == "unknown" || cleaned == "none" {
        cleaned.clear();
    }

    let mut present: HashSet<String> = tokenize(&cleaned).into_iter().collect();
    let mut parts = vec![cleaned];
    for q in qualifiers.iter().filter_map(|q| Qualifier::from_phrase(q)) {
        let term = q.search_term();
        let tokens = tokenize(term);
        if tokens.iter().all(|t| present.contains(t)) {
            continue;
        }
        present.extend(tokens);
        parts.push(term.to_string());
    }
    squash_whitespace(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases(qs: &[Qualifier]) -> Vec<&'static str> {
        qs.iter().map(|q| q.as_str()).collect()
    }

    #[test]
    fn test_detect_per_capita_ppp() {
        assert_eq!(
            phrases(&detect("GDP per capita, PPP for India in 2021")),
            vec!["per capita", "ppp"]
        );
    }

    #[test]
    fn test_growth_suppresses_usd_and_percent() {
        assert_eq!(
            phrases(&detect("real GDP growth rate in current USD")),
            vec!["growth"]
        );
    }

    #[test]
    fn test_rate_concepts_are_not_percent() {
        assert!(detect("unemployment rate in Lebanon").is_empty());
        assert_eq!(phrases(&detect("literacy rate in Lebanon")), vec!["percent"]);
        assert_eq!(phrases(&detect("share of renewables (%)")), vec!["percent"]);
    }

    #[test]
    fn test_demographics() {
        assert_eq!(
            phrases(&detect("female population ages 65 and above")),
            vec!["female", "ages 65+"]
        );
        assert_eq!(
            phrases(&detect("unemployment for men aged 15 to 24")),
            vec!["male", "ages 15-24"]
        );
        assert!(detect("GDP of Oman").is_empty());
    }

    #[test]
    fn test_wants_latest() {
        assert!(wants_latest("latest GDP of Lebanon"));
        assert!(wants_latest("the most recent population of Chad"));
        assert!(!wants_latest("GDP of Lebanon in 2022"));
    }

    #[test]
    fn test_merge_dedups_and_normalises() {
        let reported = vec!["per_capita".to_string(), "Current USD".to_string(), "bogus".to_string()];
        let merged = merge(&reported, &[Qualifier::PerCapita, Qualifier::Female]);
        assert_eq!(merged, vec!["per capita", "current usd", "female"]);

        let merged = merge(&["current usd".to_string()], &[Qualifier::Growth]);
        assert_eq!(merged, vec!["growth"]);
    }

    #[test]
    fn test_search_text_strips_and_reappends_demographics() {
        let qs = vec!["female".to_string(), "ages 65+".to_string()];
        assert_eq!(
            build_search_text("female population ages 65+", &qs),
            "population female 65+"
        );
    }

    #[test]
    fn test_search_text_skips_redundant_terms() {
        let qs = vec!["per capita".to_string()];
        assert_eq!(build_search_text("gdp per capita", &qs), "gdp per capita");
        assert_eq!(build_search_text("gdp", &[]), "gdp");
        assert_eq!(build_search_text("unknown", &["growth".to_string()]), "growth");
    }

    #[test]
    fn test_price_index_wording_means_inflation() {
        assert_eq!(build_search_text("cpi", &[]), "inflation consumer prices");
        assert_eq!(
            build_search_text("Consumer Price Index", &[]),
            "inflation consumer prices"
        );
        assert_eq!(build_search_text("inflation", &[]), "inflation");
    }
}
