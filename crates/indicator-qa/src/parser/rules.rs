//! Deterministic intent extraction. Always succeeds.

use chrono::Datelike;
use regex::Regex;
use std::sync::LazyLock;

use super::qualifiers;
use crate::catalog::CountryCatalog;
use crate::text::content_tokens;
use crate::types::{ParsedIntent, ParserKind};

pub const MIN_YEAR: i32 = 1960;

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("year regex is valid"));

/// A preposition that may introduce a place name.
static PLACE_LEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(of|in|for)\s+").expect("place lead regex is valid"));

/// The phrase after a lead, up to the next preposition, digit or punctuation.
static PLACE_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:the\s+)?([^\W\d_][^\d?!.,;:]*?)\s*(?:\b(?:in|for|during|from|since|between)\b|\d|[?!.,;:]|$)",
    )
    .expect("place phrase regex is valid")
});

/// Words about time rather than about the indicator.
const TIME_WORDS: &[&str] = &["latest", "most", "recent"];

/// Aliases this short that are also English words must appear upper-cased
/// ("US", "IN") to count.
const SHORT_ALIAS_CHARS: usize = 3;

const COMMON_SHORT_WORDS: &[&str] = &[
    "am", "an", "and", "are", "arm", "as", "at", "be", "by", "can", "col", "do", "for", "gin",
    "go", "he", "if", "in", "is", "it", "mar", "me", "my", "no", "nor", "of", "on", "or", "per",
    "so", "the", "to", "up", "us", "we",
];

/// Where a country spelling was found in the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryMatch {
    pub spelling: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct RuleBasedParser {
    min_year: i32,
    max_year: i32,
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedParser {
    /// Accepts years from 1960 through next year.
    pub fn new() -> Self {
        Self {
            min_year: MIN_YEAR,
            max_year: chrono::Utc::now().year() + 1,
        }
    }

    pub fn with_year_range(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }

    pub fn max_year(&self) -> i32 {
        self.max_year
    }

    pub fn year_in_range(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }

    /// First standalone 4-digit token inside the accepted range.
    pub fn extract_year(&self, text: &str) -> Option<i32> {
        YEAR_TOKEN
            .captures_iter(text)
            .filter_map(|c| c[1].parse::<i32>().ok())
            .find(|y| self.year_in_range(*y))
    }

    fn is_year_token(&self, token: &str) -> bool {
        token.len() == 4
            && token.bytes().all(|b| b.is_ascii_digit())
            && token.parse::<i32>().is_ok_and(|y| self.year_in_range(y))
    }

    pub fn parse(&self, question: &str, countries: &CountryCatalog) -> ParsedIntent {
        let year = if qualifiers::wants_latest(question) {
            None
        } else {
            self.extract_year(question)
        };

        let mut remainder = question.to_lowercase();
        let country = find_country(question, countries);
        let country_phrase = match &country {
            Some(m) => {
                if remainder.len() == question.len() {
                    remainder.replace_range(m.start..m.end, " ");
                } else {
                    remainder = remainder.replacen(&m.spelling, " ", 1);
                }
                Some(m.spelling.clone())
            }
            // Unknown place names are kept so resolution can report them.
            None => guess_place(&remainder).map(|guess| {
                remainder.replace_range(guess.start..guess.end, " ");
                guess.spelling
            }),
        };

        let concept = content_tokens(&remainder)
            .into_iter()
            .filter(|t| !self.is_year_token(t))
            .filter(|t| !TIME_WORDS.contains(&t.as_str()))
            .collect::<Vec<_>>()
            .join(" ");

        let comparison_qualifiers = qualifiers::merge(&[], &qualifiers::detect(question));

        tracing::debug!(
            concept = %concept,
            country = ?country_phrase,
            known_country = country.is_some(),
            year = ?year,
            qualifiers = ?comparison_qualifiers,
            "Rule-based parse"
        );

        ParsedIntent {
            concept_phrase: concept,
            country_phrase,
            year,
            comparison_qualifiers,
            parser: ParserKind::Rules,
            fallback_reason: None,
        }
    }
}

/// Longest known spelling occurring in `question` on word boundaries.
/// Ties go to the earlier position, then to the alphabetically first spelling.
pub fn find_country(question: &str, countries: &CountryCatalog) -> Option<CountryMatch> {
    let lower = question.to_lowercase();
    let same_offsets = lower.len() == question.len();

    let mut best: Option<CountryMatch> = None;
    for (spelling, _) in countries.spellings() {
        let short = spelling.chars().count() <= SHORT_ALIAS_CHARS
            && COMMON_SHORT_WORDS.contains(&spelling);
        for (start, _) in lower.match_indices(spelling) {
            let end = start + spelling.len();
            if !on_word_boundaries(&lower, start, end) {
                continue;
            }
            if short && (!same_offsets || question.get(start..end) != Some(spelling.to_uppercase().as_str())) {
                continue;
            }
            let candidate = CountryMatch {
                spelling: spelling.to_string(),
                start,
                end,
            };
            if better(&candidate, best.as_ref()) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// The last "in"/"for" phrase that reads like a place name, else the last
/// such "of" phrase. Concepts tend to come first ("rate of unemployment in X").
fn guess_place(lower: &str) -> Option<CountryMatch> {
    let mut by_lead: Option<CountryMatch> = None;
    let mut by_of: Option<CountryMatch> = None;
    for lead in PLACE_LEAD.captures_iter(lower) {
        let (Some(whole), Some(word)) = (lead.get(0), lead.get(1)) else {
            continue;
        };
        let Some(phrase) = PLACE_PHRASE
            .captures(&lower[whole.end()..])
            .and_then(|c| c.get(1))
        else {
            continue;
        };
        let text = phrase.as_str().trim_end();
        let tokens = content_tokens(text);
        if tokens.is_empty() || tokens.iter().all(|t| TIME_WORDS.contains(&t.as_str())) {
            continue;
        }
        let start = whole.end() + phrase.start();
        let found = CountryMatch {
            spelling: text.to_string(),
            start,
            end: start + text.len(),
        };
        if word.as_str() == "of" {
            by_of = Some(found);
        } else {
            by_lead = Some(found);
        }
    }
    by_lead.or(by_of)
}

fn on_word_boundaries(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

fn better(candidate: &CountryMatch, current: Option<&CountryMatch>) -> bool {
    let Some(current) = current else {
        return true;
    };
    let (len_a, len_b) = (
        candidate.spelling.chars().count(),
        current.spelling.chars().count(),
    );
    len_a > len_b
        || (len_a == len_b && candidate.start < current.start)
        || (len_a == len_b && candidate.start == current.start && candidate.spelling < current.spelling)
}
