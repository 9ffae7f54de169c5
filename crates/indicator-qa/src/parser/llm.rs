//! LLM-backed intent extraction.
//!
//! One bounded call per question, no retries. Every failure is reported as a
//! [`ParserUnavailable`] so the caller can fall back to rule-based parsing.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::ParserUnavailable;
use crate::config::LlmConfig;
use crate::llm::{GenerationConfig, LLMProvider};
use crate::text::squash_whitespace;

const EXTRACTION_PROMPT: &str = r#"You extract query parameters from questions about World Bank statistics.

Return ONLY a JSON object with these fields:
{"country": "<country name only, or null>",
 "concept": "<main indicator only: gdp, population, unemployment, inflation, ... NO age or gender>",
 "year": <four-digit year as a number, or null>,
 "qualifiers": [<zero or more of: "per capita", "ppp", "growth", "constant usd", "current usd", "percent", "female", "male", "ages 65+", "ages 15-24">]}

Rules:
- Put age ranges and gender ONLY in qualifiers, never in concept.
- Use null for anything the question does not state.

Output ONLY the JSON object, nothing else."#;

/// Fields decoded from the model's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmExtraction {
    pub country: Option<String>,
    pub concept: String,
    pub year: Option<i32>,
    pub qualifiers: Vec<String>,
}

#[derive(Deserialize)]
struct RawReply {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    concept: Option<String>,
    #[serde(default)]
    year: Option<serde_json::Value>,
    #[serde(default)]
    qualifiers: Option<serde_json::Value>,
}

pub struct LlmExtractor {
    provider: Arc<dyn LLMProvider>,
    generation: GenerationConfig,
    timeout: Duration,
}

impl LlmExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            generation: GenerationConfig::from(config),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub async fn extract(&self, question: &str) -> Result<LlmExtraction, ParserUnavailable> {
        let prompt = build_prompt(question);
        tracing::debug!(prompt_len = prompt.len(), "Sending extraction prompt");

        let start = std::time::Instant::now();
        let raw = match tokio::time::timeout(self.timeout, self.provider.generate(&prompt, &self.generation)).await
        {
            Err(_) => return Err(ParserUnavailable::Timeout),
            Ok(Err(e)) => return Err(ParserUnavailable::Unreachable(e.to_string())),
            Ok(Ok(raw)) => raw,
        };

        let extraction = parse_reply(&raw).map_err(ParserUnavailable::Malformed)?;
        tracing::info!(
            country = ?extraction.country,
            concept = %extraction.concept,
            year = ?extraction.year,
            qualifiers = ?extraction.qualifiers,
            latency_ms = start.elapsed().as_millis() as u64,
            "LLM extraction"
        );
        Ok(extraction)
    }
}

fn build_prompt(question: &str) -> String {
    format!("{}\n\nQuestion: \"{}\"\nJSON:", EXTRACTION_PROMPT, question.trim())
}

/// Decode the model reply. Tolerates markdown fences and surrounding prose,
/// then falls back to scanning for individual fields.
pub(crate) fn parse_reply(raw: &str) -> Result<LlmExtraction, String> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json_str = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned,
    };

    let (country, concept, year, qualifiers) = match serde_json::from_str::<RawReply>(json_str) {
        Ok(reply) => (
            reply.country,
            reply.concept,
            reply.year.as_ref().and_then(year_from_value),
            reply.qualifiers.as_ref().map(qualifiers_from_value).unwrap_or_default(),
        ),
        Err(_) => (
            extract_json_string(json_str, "country"),
            extract_json_string(json_str, "concept"),
            extract_json_year(json_str),
            extract_json_array(json_str, "qualifiers").unwrap_or_default(),
        ),
    };

    let concept = concept
        .map(|c| squash_whitespace(&c.to_lowercase()))
        .filter(|c| !is_placeholder(c))
        .ok_or_else(|| {
            let preview: String = raw.chars().take(120).collect();
            format!("no usable concept in reply: {}", preview)
        })?;

    Ok(LlmExtraction {
        country: country
            .map(|c| c.trim().to_string())
            .filter(|c| !is_placeholder(&c.to_lowercase())),
        concept,
        year,
        qualifiers,
    })
}

fn is_placeholder(value: &str) -> bool {
    matches!(value.trim(), "" | "none" | "null" | "unknown" | "n/a")
}

fn year_from_value(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn qualifiers_from_value(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        serde_json::Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && !is_placeholder(&s.to_lowercase()))
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract a JSON string field value by scanning for `"field":"value"`.
fn extract_json_string(json: &str, field: &str) -> Option<String> {
    let pattern = format!("\"{}\"", field);
    let pos = json.find(&pattern)?;
    let after_colon = json[pos + pattern.len()..].trim_start().strip_prefix(':')?;
    let content = after_colon.trim_start().strip_prefix('"')?;

    let mut escaped = false;
    for (i, ch) in content.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => return Some(content[..i].to_string()),
            _ => {}
        }
    }
    None
}

/// `"year": 2022` or `"year": "2022"`.
fn extract_json_year(json: &str) -> Option<i32> {
    let pos = json.find("\"year\"")?;
    let after_colon = json[pos + 6..].trim_start().strip_prefix(':')?;
    let digits: String = after_colon
        .trim_start()
        .trim_start_matches('"')
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Extract a JSON string array field by scanning for `"field":["v1","v2"]`.
fn extract_json_array(json: &str, field: &str) -> Option<Vec<String>> {
    let pattern = format!("\"{}\"", field);
    let pos = json.find(&pattern)?;
    let after_colon = json[pos + pattern.len()..]
        .trim_start()
        .strip_prefix(':')?
        .trim_start();
    let body = after_colon.strip_prefix('[')?;
    let end = body.find(']')?;

    Some(
        body[..end]
            .split(',')
            .map(|s| s.trim().trim_matches('"'))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let e = parse_reply(r#"{"country":"Lebanon","concept":"GDP","year":2022,"qualifiers":[]}"#).unwrap();
        assert_eq!(e.country.as_deref(), Some("Lebanon"));
        assert_eq!(e.concept, "gdp");
        assert_eq!(e.year, Some(2022));
        assert!(e.qualifiers.is_empty());
    }

    #[test]
    fn test_parse_json_with_fences_and_prose() {
        let raw = "Sure! Here it is:\n```json\n{\"country\": \"India\", \"concept\": \"gdp\", \"year\": \"2021\", \"qualifiers\": [\"per capita\"]}\n```";
        let e = parse_reply(raw).unwrap();
        assert_eq!(e.year, Some(2021));
        assert_eq!(e.qualifiers, vec!["per capita"]);
    }

    #[test]
    fn test_parse_null_fields() {
        let e = parse_reply(r#"{"country": null, "concept": "population", "year": null, "qualifiers": "female, none"}"#).unwrap();
        assert_eq!(e.country, None);
        assert_eq!(e.year, None);
        assert_eq!(e.qualifiers, vec!["female"]);
    }

    #[test]
    fn test_parse_partial_json() {
        let raw = r#"{"country": "Chad", "concept": "forest area", "year": 2019, "qualifiers": ["percent"#;
        let e = parse_reply(raw).unwrap();
        assert_eq!(e.country.as_deref(), Some("Chad"));
        assert_eq!(e.concept, "forest area");
        assert_eq!(e.year, Some(2019));
    }

    #[test]
    fn test_missing_concept_is_malformed() {
        assert!(parse_reply("I cannot help with that.").is_err());
        assert!(parse_reply(r#"{"country": "Chad", "concept": "none"}"#).is_err());
    }

    #[test]
    fn test_prompt_carries_question() {
        let prompt = build_prompt("  GDP of Lebanon? ");
        assert!(prompt.ends_with("Question: \"GDP of Lebanon?\"\nJSON:"));
        assert!(prompt.contains("qualifiers"));
    }
}
