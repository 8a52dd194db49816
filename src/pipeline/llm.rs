//! XML generation: send invoice text to the chat model and clean the reply.
//!
//! All prompt text lives in [`crate::prompts`]; this module only assembles
//! the two-message exchange, calls the provider once, and hands the reply to
//! [`crate::pipeline::postprocess::strip_xml_fence`].
//!
//! There is no retry and no timeout override. A failed call surfaces as
//! [`Pdf2PohodaError::LlmApiError`] and the batch driver records it against
//! the file.

use crate::config::ConversionConfig;
use crate::error::Pdf2PohodaError;
use crate::pipeline::postprocess::strip_xml_fence;
use crate::prompts::{invoice_prompt, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, OpenAIProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Anything that can turn invoice text into Pohoda XML.
#[async_trait]
pub trait XmlGenerator: Send + Sync {
    /// Produce XML for one invoice. The result is not checked for
    /// well-formedness.
    async fn generate(&self, text: &str) -> Result<String, Pdf2PohodaError>;
}

/// [`XmlGenerator`] backed by an `edgequake-llm` chat provider.
pub struct LlmXmlGenerator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
}

impl LlmXmlGenerator {
    /// Wrap a pre-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
        }
    }

    /// OpenAI-backed generator for `config.model`, authenticated with
    /// `api_key`.
    pub fn openai(api_key: &str, config: &ConversionConfig) -> Self {
        let provider = OpenAIProvider::new(api_key).with_model(&config.model);
        Self::new(Arc::new(provider), config)
    }

    fn messages(&self, text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(&invoice_prompt(text)),
        ]
    }
}

#[async_trait]
impl XmlGenerator for LlmXmlGenerator {
    async fn generate(&self, text: &str) -> Result<String, Pdf2PohodaError> {
        let start = Instant::now();
        let messages = self.messages(text);

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| Pdf2PohodaError::LlmApiError {
                message: format!("{e}"),
            })?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(strip_xml_fence(&response.content))
    }
}

/// Build `CompletionOptions` from the conversion config.
fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: config.max_tokens,
        ..Default::default()
    }
}
