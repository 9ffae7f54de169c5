use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::index::IndexStrategy;
use crate::llm::ApiProvider;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub resolver: ResolverConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// When false the parser never attempts the LLM strategy.
    pub enabled: bool,
    pub provider: ApiProvider,
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub strategy: IndexStrategy,
    pub top_k: usize,
    /// Query vectors kept by the embedding cache. 0 disables caching.
    pub embedding_cache_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum Jaro-Winkler similarity for a fuzzy country match.
    pub country_fuzzy_threshold: f64,
    /// Candidates scoring below this are never selected.
    pub min_indicator_score: f32,
    /// How far below the top score a qualifier-matching candidate may sit
    /// and still replace it.
    pub rerank_tolerance: f32,
    /// Margins below this set `low_confidence` on the response.
    pub low_margin_warning: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub per_page: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let host = std::env::var("OLLAMA_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("http://{}", host)
        };

        Self {
            enabled: true,
            provider: ApiProvider::Ollama,
            endpoint: format!("{}/v1/chat/completions", host.trim_end_matches('/')),
            model: "llama3.2".to_string(),
            api_key: String::new(),
            timeout_ms: 8_000,
            max_tokens: 200,
            temperature: 0.0,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            strategy: IndexStrategy::Tfidf,
            top_k: 30,
            embedding_cache_size: 1000,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            country_fuzzy_threshold: 0.9,
            min_indicator_score: 0.1,
            rerank_tolerance: 0.15,
            low_margin_warning: 0.02,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.worldbank.org/v2".to_string(),
            timeout_ms: 10_000,
            per_page: 2000,
        }
    }
}

impl QaConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.llm.enabled && self.llm.endpoint.trim().is_empty() {
            return Err("llm.endpoint must be set when llm.enabled".into());
        }
        if self.llm.timeout_ms == 0 {
            return Err("llm.timeout_ms must be > 0".into());
        }
        if self.index.top_k == 0 {
            return Err("index.top_k must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.resolver.country_fuzzy_threshold) {
            return Err("resolver.country_fuzzy_threshold must be in [0.0, 1.0]".into());
        }
        if !(0.0..=1.0).contains(&self.resolver.min_indicator_score) {
            return Err("resolver.min_indicator_score must be in [0.0, 1.0]".into());
        }
        if !(0.0..=1.0).contains(&self.resolver.rerank_tolerance) {
            return Err("resolver.rerank_tolerance must be in [0.0, 1.0]".into());
        }
        if self.resolver.low_margin_warning < 0.0 {
            return Err("resolver.low_margin_warning must be >= 0.0".into());
        }
        if self.fetch.base_url.trim().is_empty() {
            return Err("fetch.base_url must be set".into());
        }
        if self.fetch.timeout_ms == 0 {
            return Err("fetch.timeout_ms must be > 0".into());
        }
        if self.fetch.per_page == 0 {
            return Err("fetch.per_page must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}
