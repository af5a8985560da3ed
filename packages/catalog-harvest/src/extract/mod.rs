//! Structured extraction with bounded retries.
//!
//! One [`Extractor`] is built per run. Each call to [`Extractor::extract`]
//! gets a fresh attempt counter; nothing is shared across items.
//!
//! ```text
//! attempt 0 ── fail ──► sleep 1s ──► attempt 1 ── fail ──► sleep 2s ──► attempt 2 ── fail ──► None
//!     │                                  │                                  │
//!     └── ok ──► Some(records)           └── ok ──► Some(records)           └── ok ──► Some(records)
//! ```

pub mod parse;
pub mod prompts;

pub use parse::{parse_records, ResponseShape};
pub use prompts::{
    degree_requirements_instruction, COURSE_CATALOG_INSTRUCTION, DEGREE_REQUIREMENTS_INSTRUCTION,
    PREREQUISITES_INSTRUCTION,
};

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::traits::StructuredExtractor;
use crate::types::Record;

/// Deterministic cost estimate used when the service cannot count tokens.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}

/// Ask the service for the token cost of `text`, falling back to
/// [`estimate_tokens`] on any failure.
pub async fn measure_cost(service: &dyn StructuredExtractor, text: &str) -> u64 {
    match service.count_tokens(text).await {
        Ok(tokens) => tokens,
        Err(ExtractError::Unsupported(_)) => estimate_tokens(text),
        Err(e) => {
            warn!(
                provider = service.name(),
                error = %e,
                "Token count failed, using length estimate"
            );
            estimate_tokens(text)
        }
    }
}

/// Wraps one extraction call with fence stripping, shape validation and
/// exponential backoff between attempts.
#[derive(Clone)]
pub struct Extractor {
    service: Arc<dyn StructuredExtractor>,
    instruction: String,
    shape: ResponseShape,
    retry: RetryConfig,
}

impl Extractor {
    pub fn new(service: Arc<dyn StructuredExtractor>, instruction: impl Into<String>) -> Self {
        Self {
            service,
            instruction: instruction.into(),
            shape: ResponseShape::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Expected response shape.
    pub fn with_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }

    /// Attempt ceiling and backoff base.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn service(&self) -> &dyn StructuredExtractor {
        self.service.as_ref()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Run one attempt: call the service and parse the response.
    pub async fn attempt(&self, raw_text: &str) -> ExtractResult<Vec<Record>> {
        let response = self.service.generate(&self.instruction, raw_text).await?;
        parse_records(&response, self.shape)
    }

    /// Extract records from `raw_text`.
    ///
    /// Returns `None` without calling the service when the text is blank, and
    /// `None` after the last attempt fails. Exhaustion is not an error: the
    /// caller logs the input and moves on.
    pub async fn extract(&self, raw_text: &str) -> Option<Vec<Record>> {
        if raw_text.trim().is_empty() {
            return None;
        }

        let max_attempts = self.retry.max_attempts.max(1);
        for attempt in 0..max_attempts {
            match self.attempt(raw_text).await {
                Ok(records) => {
                    debug!(attempt, records = records.len(), "Extraction succeeded");
                    return Some(records);
                }
                Err(e) => {
                    let last = attempt + 1 == max_attempts;
                    warn!(
                        provider = self.service.name(),
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "Extraction attempt failed"
                    );
                    if !last {
                        let delay = self.retry.backoff_base * 2u32.saturating_pow(attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        None
    }
}
