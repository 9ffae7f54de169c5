//! LLM Module - external chat-completion providers used for intent extraction.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod openai_compatible;

pub use openai_compatible::OpenAICompatibleProvider;

use crate::config::LlmConfig;

/// External API providers speaking the OpenAI chat-completions dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    OpenAI,
    Ollama,
    Custom,
}

/// Per-call generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub stop_sequences: Vec<String>,
}

impl From<&LlmConfig> for GenerationConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: 1.0,
            stop_sequences: vec![],
        }
    }
}

/// Provider information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    pub endpoint: String,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    fn info(&self) -> ProviderInfo;
}
