//! OpenAI-compatible extractor.

use ai_client::OpenAIClient;
use async_trait::async_trait;
use tracing::debug;

use super::extraction_request;
use crate::error::ExtractResult;
use crate::traits::StructuredExtractor;

/// Extractor using chat completions. There is no counting endpoint, so cost
/// falls back to the length estimate.
pub struct OpenAIExtractor {
    client: OpenAIClient,
    model: String,
}

impl OpenAIExtractor {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl StructuredExtractor for OpenAIExtractor {
    async fn generate(&self, instruction: &str, input: &str) -> ExtractResult<String> {
        let request = extraction_request(&self.model, instruction, input);
        let response = self.client.generate(&request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                model = %self.model,
                total_tokens = usage.total_tokens,
                "OpenAI usage"
            );
        }
        Ok(response.text)
    }

    async fn probe(&self) -> ExtractResult<()> {
        Ok(self.client.get_model(&self.model).await?)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
