//! Google Gemini REST client (`generateContent`, `countTokens`).

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AiError, Result};
use crate::types::{
    Content, CountTokensRequest, CountTokensResponse, GenerateContentRequest,
    GenerateContentResponse, GenerateRequest, GenerateResponse,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AiError::Config("GEMINI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a request timeout on the underlying HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn model_url(&self, model: &str, method: Option<&str>) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        match method {
            Some(method) => format!("{}/models/{}:{}", self.base_url, model, method),
            None => format!("{}/models/{}", self.base_url, model),
        }
    }

    async fn post_json<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> Result<R> {
        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Gemini request failed");
                AiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Gemini API error");
            return Err(AiError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))
    }

    /// Generate content for a single-turn request.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let start = std::time::Instant::now();
        let body = GenerateContentRequest::from(request);

        let raw: GenerateContentResponse = self
            .post_json(self.model_url(&request.model, Some("generateContent")), &body)
            .await?;

        if let Some(reason) = raw.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
            return Err(AiError::EmptyResponse(format!("prompt blocked: {}", reason)));
        }

        let candidate = raw
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AiError::EmptyResponse("no candidates returned".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(AiError::EmptyResponse(format!(
                "candidate has no text (finish reason: {})",
                reason
            )));
        }

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "Gemini generateContent"
        );

        Ok(GenerateResponse {
            text,
            usage: raw.usage_metadata.map(Into::into),
        })
    }

    /// Count prompt tokens for `text` with the given model.
    pub async fn count_tokens(&self, model: &str, text: &str) -> Result<u32> {
        let body = CountTokensRequest {
            contents: vec![Content::user(text)],
        };
        let raw: CountTokensResponse = self
            .post_json(self.model_url(model, Some("countTokens")), &body)
            .await?;
        Ok(raw.total_tokens)
    }

    /// Look up a model. Used as a cheap reachability and credential check.
    pub async fn get_model(&self, model: &str) -> Result<()> {
        let response = self
            .http_client
            .get(self.model_url(model, None))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(())
    }
}
