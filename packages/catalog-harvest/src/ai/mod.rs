//! [`StructuredExtractor`] implementations over `ai-client`.
//!
//! Both providers are driven with a low temperature and JSON response mode;
//! the prompt carries the schema.

mod gemini;
mod openai;

pub use gemini::GeminiExtractor;
pub use openai::OpenAIExtractor;

use ai_client::{AiError, GenerateRequest, Provider};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{ConfigError, ExtractError};
use crate::traits::StructuredExtractor;

/// Sampling temperature for extraction calls.
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Output token ceiling for extraction calls.
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Per-call HTTP timeout; long pages take a while to generate.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn extraction_request(model: &str, instruction: &str, input: &str) -> GenerateRequest {
    GenerateRequest::new(model, instruction, input)
        .temperature(EXTRACTION_TEMPERATURE)
        .max_output_tokens(MAX_OUTPUT_TOKENS)
        .json()
}

impl From<AiError> for ExtractError {
    fn from(e: AiError) -> Self {
        ExtractError::Service(Box::new(e))
    }
}

/// Build the configured provider's extractor.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn StructuredExtractor>, ConfigError> {
    let api_key = settings.require_api_key()?.to_string();
    let invalid = |e: AiError| ConfigError::Invalid {
        key: "LLM_PROVIDER".into(),
        value: settings.provider.to_string(),
        reason: e.to_string(),
    };

    let extractor: Arc<dyn StructuredExtractor> = match settings.provider {
        Provider::Gemini => {
            let mut client = ai_client::GeminiClient::new(api_key)
                .with_timeout(REQUEST_TIMEOUT)
                .map_err(invalid)?;
            if let Some(base_url) = &settings.base_url {
                client = client.with_base_url(base_url);
            }
            Arc::new(GeminiExtractor::new(client, &settings.model))
        }
        Provider::OpenAI => {
            let mut client = ai_client::OpenAIClient::new(api_key)
                .with_timeout(REQUEST_TIMEOUT)
                .map_err(invalid)?;
            if let Some(base_url) = &settings.base_url {
                client = client.with_base_url(base_url);
            }
            Arc::new(OpenAIExtractor::new(client, &settings.model))
        }
    };

    Ok(extractor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_request_settings() {
        let request = extraction_request("m", "instr", "text");
        assert_eq!(request.temperature, Some(EXTRACTION_TEMPERATURE));
        assert_eq!(request.max_output_tokens, Some(MAX_OUTPUT_TOKENS));
        assert!(request.json_mode);
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = Settings::from_map(&HashMap::new()).unwrap();
        assert!(matches!(from_settings(&settings), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_from_settings_picks_provider() {
        let vars: HashMap<String, String> = [("LLM_PROVIDER", "openai"), ("API_KEY", "sk-test")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = Settings::from_map(&vars).unwrap();

        let extractor = from_settings(&settings).unwrap();
        assert_eq!(extractor.name(), "openai");
    }
}
