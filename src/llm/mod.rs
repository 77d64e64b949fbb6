//! Language model access.
//!
//! Every model-backed step (planning, fact extraction, synthesis, report
//! writing) talks to a [`LanguageModel`]. The bundled implementation is
//! [`OpenAiCompatibleClient`]; tests substitute in-memory models.

pub mod decode;
pub mod openai;

use async_trait::async_trait;

pub use decode::{Decoded, decode};
pub use openai::{OpenAiCompatibleClient, OpenAiConfig};

use crate::error::Result;

/// Per-request generation settings. `None` leaves the provider default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs and report metadata.
    fn name(&self) -> &str;

    /// Complete a single-turn prompt and return the full response text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ResearchError::Llm`] on transport or
    /// provider failure.
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;
}
