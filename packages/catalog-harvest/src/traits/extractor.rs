//! Structured-extraction service trait.
//!
//! Implementations wrap a specific LLM provider and hand back the raw
//! response text; fence stripping, parsing and retries live in
//! [`crate::extract`] so every provider gets the same defensive handling.

use async_trait::async_trait;

use crate::error::{ExtractError, ExtractResult};

#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Apply `instruction` to `input` and return the raw response text.
    async fn generate(&self, instruction: &str, input: &str) -> ExtractResult<String>;

    /// Cheap pre-call cost estimate for `text`, in tokens.
    ///
    /// Providers without a counting endpoint return `Unsupported`; callers
    /// then fall back to [`crate::extract::estimate_tokens`].
    async fn count_tokens(&self, _text: &str) -> ExtractResult<u64> {
        Err(ExtractError::Unsupported("token counting"))
    }

    /// Verify the service is reachable with the configured credentials.
    async fn probe(&self) -> ExtractResult<()> {
        Ok(())
    }

    /// Provider name for logging.
    fn name(&self) -> &str;
}
