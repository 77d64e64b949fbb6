//! OpenAI-compatible chat completions client.
//!
//! Sends a single user message to `{base_url}/v1/chat/completions` with
//! `stream: false` and returns the first choice's content. Works with any
//! endpoint speaking the same protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CompletionOptions, LanguageModel};
use crate::config::LlmConfig;
use crate::error::{ResearchError, Result};

/// Connection settings for [`OpenAiCompatibleClient`].
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token. Empty sends no auth header.
    pub api_key: String,
    /// Base URL without `/v1`, e.g. `https://api.openai.com`.
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com".into(),
            model: model.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from the `[llm]` config section, resolving the API key.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Config`] if the key cannot be resolved.
    pub fn from_llm_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.resolve()?.unwrap_or_default();
        Ok(Self::new(api_key, config.model.clone())
            .with_base_url(config.api_url.clone())
            .with_timeout(Duration::from_secs(config.timeout_seconds)))
    }
}

/// Non-streaming chat completions client.
pub struct OpenAiCompatibleClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    /// # Errors
    ///
    /// Returns [`ResearchError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ResearchError::Llm(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_body(&self, prompt: &str, options: &CompletionOptions) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(max_tokens) = options.max_tokens {
                obj.insert("max_tokens".into(), serde_json::json!(max_tokens));
            }
            if let Some(temp) = options.temperature {
                obj.insert("temperature".into(), serde_json::json!(temp));
            }
        }
        body
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> ResearchError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 => ResearchError::Llm(format!("authentication failed: {message}")),
            429 => ResearchError::Llm(format!("rate limited: {message}")),
            code => ResearchError::Llm(format!("HTTP {code}: {message}")),
        }
    }
}

/// Error message from an OpenAI-style error body, or the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
        let body = self.build_body(prompt, options);

        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if !self.config.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| ResearchError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Llm(format!("invalid completion response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ResearchError::Llm("completion has no content".into()))?;

        tracing::debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}
