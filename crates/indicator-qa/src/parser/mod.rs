//! Intent parsing: question text to [`ParsedIntent`].
//!
//! The LLM strategy is an optional capability decided once at construction.
//! When it is absent or fails, the rule-based strategy answers instead, so
//! [`IntentParser::parse`] never fails.

pub mod llm;
pub mod qualifiers;
pub mod rules;

use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::CountryCatalog;
use crate::config::LlmConfig;
use crate::llm::{LLMProvider, OpenAICompatibleProvider};
use crate::types::{ParsedIntent, ParserKind};

pub use llm::{LlmExtraction, LlmExtractor};
pub use qualifiers::{build_search_text, Qualifier};
pub use rules::RuleBasedParser;

/// Why the LLM strategy did not produce the intent. Recorded on the intent,
/// never returned to callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserUnavailable {
    #[error("llm disabled")]
    Disabled,
    #[error("llm unreachable: {0}")]
    Unreachable(String),
    #[error("llm timed out")]
    Timeout,
    #[error("llm reply malformed: {0}")]
    Malformed(String),
}

pub struct IntentParser {
    llm: Option<LlmExtractor>,
    rules: RuleBasedParser,
}

impl IntentParser {
    pub fn rules_only() -> Self {
        Self {
            llm: None,
            rules: RuleBasedParser::new(),
        }
    }

    pub fn with_llm(provider: Arc<dyn LLMProvider>, config: &LlmConfig) -> Self {
        Self {
            llm: Some(LlmExtractor::new(provider, config)),
            rules: RuleBasedParser::new(),
        }
    }

    /// Builds the OpenAI-compatible provider when `config.enabled`.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if !config.enabled {
            tracing::info!("LLM parsing disabled, using rule-based parser only");
            return Ok(Self::rules_only());
        }
        let provider = OpenAICompatibleProvider::new(config)?;
        Ok(Self::with_llm(Arc::new(provider), config))
    }

    pub fn with_rules(mut self, rules: RuleBasedParser) -> Self {
        self.rules = rules;
        self
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn parse(&self, question: &str, countries: &CountryCatalog) -> ParsedIntent {
        let Some(llm) = &self.llm else {
            let mut intent = self.rules.parse(question, countries);
            intent.fallback_reason = Some(ParserUnavailable::Disabled.to_string());
            return intent;
        };

        match llm.extract(question).await {
            Ok(extraction) => self.finish_llm(question, extraction, countries),
            Err(reason) => {
                tracing::warn!(reason = %reason, "LLM parser unavailable, falling back to rules");
                let mut intent = self.rules.parse(question, countries);
                intent.fallback_reason = Some(reason.to_string());
                intent
            }
        }
    }

    /// Apply the shared post-processing to an LLM extraction: qualifier
    /// detection on the raw question, year range and "latest" checks, and a
    /// rule-based country when the model named none.
    fn finish_llm(
        &self,
        question: &str,
        extraction: LlmExtraction,
        countries: &CountryCatalog,
    ) -> ParsedIntent {
        let year = if qualifiers::wants_latest(question) {
            None
        } else {
            extraction.year.filter(|y| self.rules.year_in_range(*y))
        };

        let country_phrase = extraction
            .country
            .or_else(|| rules::find_country(question, countries).map(|m| m.spelling));

        ParsedIntent {
            concept_phrase: extraction.concept,
            country_phrase,
            year,
            comparison_qualifiers: qualifiers::merge(
                &extraction.qualifiers,
                &qualifiers::detect(question),
            ),
            parser: ParserKind::Llm,
            fallback_reason: None,
        }
    }
}

/// Index query for an intent.
pub fn search_text(intent: &ParsedIntent) -> String {
    build_search_text(&intent.concept_phrase, &intent.comparison_qualifiers)
}
