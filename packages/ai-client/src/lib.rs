//! Provider-agnostic LLM REST client
//!
//! A small client for single-turn "instruction + input → text" generation with no
//! domain-specific logic. Two providers are supported:
//!
//! - [`GeminiClient`] - Google Gemini (`generateContent`, `countTokens`)
//! - [`OpenAIClient`] - OpenAI chat completions and compatible gateways
//!
//! # Example
//!
//! ```rust,ignore
//! use ai_client::{GeminiClient, GenerateRequest};
//!
//! let client = GeminiClient::from_env()?;
//! let request = GenerateRequest::new("gemini-2.5-flash", "Return JSON", "text").json();
//! let response = client.generate(&request).await?;
//! let tokens = client.count_tokens("gemini-2.5-flash", "text").await?;
//! ```

pub mod error;
pub mod gemini;
pub mod openai;
pub mod types;

pub use error::{AiError, Result};
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use types::{strip_code_fence, GenerateRequest, GenerateResponse, Message, Usage};

use std::fmt;
use std::str::FromStr;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Gemini,
    OpenAI,
}

impl Provider {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::OpenAI => "gpt-4o-mini",
        }
    }

    /// Provider-specific API key variable, checked after the generic `API_KEY`.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAI => write!(f, "openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            other => Err(AiError::Config(format!("unknown LLM provider: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!(" OpenAI ".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert!("claude".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_display_roundtrips() {
        for p in [Provider::Gemini, Provider::OpenAI] {
            assert_eq!(p.to_string().parse::<Provider>().unwrap(), p);
        }
    }
}
