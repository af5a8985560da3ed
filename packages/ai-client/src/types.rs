//! Request and response types shared by the providers.

use serde::{Deserialize, Serialize};

// =============================================================================
// Provider-neutral request
// =============================================================================

/// A single-turn generation request: one fixed instruction plus one input text.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Model identifier (e.g., "gemini-2.5-flash", "gpt-4o-mini")
    pub model: String,

    /// System instruction describing the task
    pub instruction: String,

    /// User input the instruction is applied to
    pub input: String,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    pub max_output_tokens: Option<u32>,

    /// Ask the provider for a JSON body instead of free text
    pub json_mode: bool,
}

impl GenerateRequest {
    /// Create a new request for the given model.
    pub fn new(
        model: impl Into<String>,
        instruction: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            instruction: instruction.into(),
            input: input.into(),
            temperature: None,
            max_output_tokens: None,
            json_mode: false,
        }
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token ceiling.
    pub fn max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    /// Request a JSON response body.
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Generated text plus usage, independent of provider.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// Raw response text (may still be fence-wrapped)
    pub text: String,

    /// Token usage statistics, when the provider reports them
    pub usage: Option<Usage>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

// =============================================================================
// OpenAI-compatible chat completions
// =============================================================================

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl From<&GenerateRequest> for ChatRequest {
    fn from(req: &GenerateRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: vec![
                Message::system(req.instruction.clone()),
                Message::user(req.input.clone()),
            ],
            temperature: req.temperature,
            max_tokens: req.max_output_tokens,
            response_format: req.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

/// Raw chat response from API (for internal parsing).
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageResponse {
    pub content: Option<String>,
}

// =============================================================================
// Gemini generateContent / countTokens
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl From<&GenerateRequest> for GenerateContentRequest {
    fn from(req: &GenerateRequest) -> Self {
        let system_instruction = if req.instruction.trim().is_empty() {
            None
        } else {
            Some(Content::instruction(req.instruction.clone()))
        };

        Self {
            system_instruction,
            contents: vec![Content::user(req.input.clone())],
            generation_config: GenerationConfig {
                temperature: req.temperature,
                max_output_tokens: req.max_output_tokens,
                response_mime_type: req.json_mode.then(|| "application/json".to_string()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

impl From<UsageMetadata> for Usage {
    fn from(meta: UsageMetadata) -> Self {
        Self {
            prompt_tokens: meta.prompt_token_count,
            completion_tokens: meta.candidates_token_count,
            total_tokens: meta.total_token_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CountTokensRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CountTokensResponse {
    pub total_tokens: u32,
}

// =============================================================================
// Utilities
// =============================================================================

/// Strip a surrounding markdown code fence from a model response.
///
/// Handles an optional language tag after the opening fence (```` ```json ````,
/// ```` ```JSON ````, ```` ```javascript ````) and a missing closing fence.
/// Text without a leading fence is returned trimmed and otherwise untouched.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Language tag runs up to the first whitespace
    let tag_len = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    let tag = &rest[..tag_len];
    let body = if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        &rest[tag_len..]
    } else {
        rest
    };

    body.trim()
        .strip_suffix("```")
        .unwrap_or(body.trim())
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_builder() {
        let req = GenerateRequest::new("gemini-2.5-flash", "Extract", "text")
            .temperature(0.1)
            .max_output_tokens(8192)
            .json();

        assert_eq!(req.model, "gemini-2.5-flash");
        assert_eq!(req.temperature, Some(0.1));
        assert_eq!(req.max_output_tokens, Some(8192));
        assert!(req.json_mode);
    }

    #[test]
    fn test_chat_request_from_generate() {
        let req = GenerateRequest::new("gpt-4o-mini", "Be terse", "hello").json();
        let chat = ChatRequest::from(&req);

        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, "hello");

        let body = serde_json::to_value(&chat).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_gemini_request_shape() {
        let req = GenerateRequest::new("gemini-2.5-flash", "Extract", "course text")
            .temperature(0.1)
            .json();
        let body = serde_json::to_value(GenerateContentRequest::from(&req)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Extract");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "course text");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_gemini_request_without_instruction() {
        let req = GenerateRequest::new("gemini-2.5-flash", "  ", "x");
        let body = serde_json::to_value(GenerateContentRequest::from(&req)).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_gemini_response_parse() {
        let raw = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"a\":1}"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let usage: Usage = parsed.usage_metadata.unwrap().into();

        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```JSON {\"a\": 1} ```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(strip_code_fence("```json\n[1, 2]"), "[1, 2]");
    }

    #[test]
    fn test_strip_code_fence_keeps_inline_backticks() {
        let body = r#"{"note": "use `x`"}"#;
        assert_eq!(strip_code_fence(body), body);
    }
}
