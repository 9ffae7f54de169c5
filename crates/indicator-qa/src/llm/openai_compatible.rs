//! OpenAI-compatible chat completions (OpenAI, Ollama's `/v1` endpoint, or any
//! self-hosted server speaking the same dialect).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ApiProvider, GenerationConfig, LLMProvider, ProviderInfo};
use crate::config::LlmConfig;

pub struct OpenAICompatibleProvider {
    provider: ApiProvider,
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: String,
}

impl OpenAICompatibleProvider {
    /// The client-level timeout mirrors `timeout_ms`; callers still wrap
    /// requests in their own bound.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .tcp_nodelay(true)
            .build()?;

        tracing::info!(
            provider = ?config.provider,
            model = %config.model,
            endpoint = %config.endpoint,
            timeout_ms = config.timeout_ms,
            "Creating OpenAI-compatible provider"
        );

        Ok(Self {
            provider: config.provider.clone(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
        })
    }

    /// Parse a response body as JSON, returning a clear error if the server returned HTML
    /// (e.g. a gateway error page) instead of valid JSON.
    fn parse_json_body(body: &str, status: reqwest::StatusCode, endpoint: &str) -> Result<OpenAIResponse> {
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(anyhow!(
                "Endpoint {} returned HTML instead of JSON (HTTP {}): {}",
                endpoint,
                status,
                preview
            ));
        }

        serde_json::from_str::<OpenAIResponse>(body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            anyhow!(
                "Failed to parse JSON from {} (HTTP {}): {}. Response body: {}",
                endpoint,
                status,
                e,
                preview
            )
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            max_tokens = config.max_tokens,
            prompt_len = prompt.len(),
            "Sending OpenAI-compatible request"
        );

        let mut request = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "stream": false
        });
        if !config.stop_sequences.is_empty() {
            request["stop"] = json!(config.stop_sequences);
        }

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow!("Request to {} timed out", self.endpoint)
            } else if e.is_connect() {
                anyhow!("Failed to connect to {}: {}", self.endpoint, e)
            } else {
                anyhow!("Request to {} failed: {}", self.endpoint, e)
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", self.endpoint, e))?;
        if !status.is_success() {
            return Err(anyhow!("API error ({}): {}", status, body));
        }

        let result = Self::parse_json_body(&body, status, &self.endpoint)?;
        let first = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No choices returned from API"))?;

        tracing::debug!("API response received, {} chars", first.message.content.len());
        Ok(first.message.content)
    }

    fn info(&self) -> ProviderInfo {
        let name = match self.provider {
            ApiProvider::OpenAI => "OpenAI",
            ApiProvider::Ollama => "Ollama",
            ApiProvider::Custom => "Custom",
        };
        ProviderInfo {
            name: name.to_string(),
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}
