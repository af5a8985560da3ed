//! Gemini-backed extractor.

use ai_client::GeminiClient;
use async_trait::async_trait;
use tracing::debug;

use super::extraction_request;
use crate::error::ExtractResult;
use crate::traits::StructuredExtractor;

/// Extractor using Gemini `generateContent`, with `countTokens` as the cost
/// side-channel.
pub struct GeminiExtractor {
    client: GeminiClient,
    model: String,
}

impl GeminiExtractor {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl StructuredExtractor for GeminiExtractor {
    async fn generate(&self, instruction: &str, input: &str) -> ExtractResult<String> {
        let request = extraction_request(&self.model, instruction, input);
        let response = self.client.generate(&request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Gemini usage"
            );
        }
        Ok(response.text)
    }

    async fn count_tokens(&self, text: &str) -> ExtractResult<u64> {
        Ok(self.client.count_tokens(&self.model, text).await? as u64)
    }

    async fn probe(&self) -> ExtractResult<()> {
        Ok(self.client.get_model(&self.model).await?)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
