//! Testing utilities including mock implementations.
//!
//! These let the pipeline be exercised without network access or a real
//! LLM provider.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::error::{ExtractError, ExtractResult, FetchError, FetchResult};
use crate::traits::{PageFetcher, StructuredExtractor};

/// Scripted reply for one `generate` call.
#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Error(String),
}

/// Record of a call made to the mock extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct MockExtractorCall {
    pub instruction: String,
    pub input: String,
}

/// A mock extraction service.
///
/// Replies are served from a FIFO script, then per-input overrides, then the
/// fallback reply. Clones share state so a test can keep a handle after
/// moving the mock into an `Arc<dyn StructuredExtractor>`.
#[derive(Default)]
pub struct MockExtractor {
    /// Replies consumed in call order
    script: Arc<RwLock<VecDeque<Scripted>>>,

    /// Replies keyed by the exact input text
    by_input: Arc<RwLock<HashMap<String, String>>>,

    /// Reply when nothing else matches
    fallback: Arc<RwLock<Option<String>>>,

    /// Fixed token count; `None` means counting is unsupported
    token_count: Arc<RwLock<Option<u64>>>,

    /// Error returned by `probe`
    probe_error: Arc<RwLock<Option<String>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockExtractorCall>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response text.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.script
            .write()
            .unwrap()
            .push_back(Scripted::Text(text.into()));
        self
    }

    /// Queue a service error.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.script
            .write()
            .unwrap()
            .push_back(Scripted::Error(message.into()));
        self
    }

    /// Reply with `text` whenever the input equals `input`.
    pub fn with_response_for(self, input: impl Into<String>, text: impl Into<String>) -> Self {
        self.by_input
            .write()
            .unwrap()
            .insert(input.into(), text.into());
        self
    }

    /// Reply with `text` when the script is empty and no input matches.
    pub fn with_fallback(self, text: impl Into<String>) -> Self {
        *self.fallback.write().unwrap() = Some(text.into());
        self
    }

    /// Report this token count for every input.
    pub fn with_token_count(self, tokens: u64) -> Self {
        *self.token_count.write().unwrap() = Some(tokens);
        self
    }

    /// Make `probe` fail.
    pub fn with_probe_error(self, message: impl Into<String>) -> Self {
        *self.probe_error.write().unwrap() = Some(message.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockExtractorCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Inputs in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .map(|c| c.input.clone())
            .collect()
    }
}

impl Clone for MockExtractor {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
            by_input: Arc::clone(&self.by_input),
            fallback: Arc::clone(&self.fallback),
            token_count: Arc::clone(&self.token_count),
            probe_error: Arc::clone(&self.probe_error),
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl StructuredExtractor for MockExtractor {
    async fn generate(&self, instruction: &str, input: &str) -> ExtractResult<String> {
        self.calls.write().unwrap().push(MockExtractorCall {
            instruction: instruction.to_string(),
            input: input.to_string(),
        });

        if let Some(next) = self.script.write().unwrap().pop_front() {
            return match next {
                Scripted::Text(text) => Ok(text),
                Scripted::Error(message) => Err(ExtractError::Service(message.into())),
            };
        }

        if let Some(text) = self.by_input.read().unwrap().get(input) {
            return Ok(text.clone());
        }

        self.fallback
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| ExtractError::Service("no scripted response".into()))
    }

    async fn count_tokens(&self, _text: &str) -> ExtractResult<u64> {
        (*self.token_count.read().unwrap()).ok_or(ExtractError::Unsupported("token counting"))
    }

    async fn probe(&self) -> ExtractResult<()> {
        match self.probe_error.read().unwrap().clone() {
            Some(message) => Err(ExtractError::Service(message.into())),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock page source with canned bodies and failures by URL.
#[derive(Default)]
pub struct MockFetcher {
    /// Canned bodies indexed by URL
    pages: Arc<RwLock<HashMap<String, String>>>,

    /// URLs answered with this status
    failures: Arc<RwLock<HashMap<String, u16>>>,

    /// URLs requested, in order
    fetch_calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), body.into());
        self
    }

    /// Answer `url` with a non-success status.
    pub fn with_failure(self, url: impl Into<String>, status: u16) -> Self {
        self.failures.write().unwrap().insert(url.into(), status);
        self
    }

    /// Get the URLs that were requested.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.read().unwrap().clone()
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.read().unwrap().len()
    }
}

impl Clone for MockFetcher {
    fn clone(&self) -> Self {
        Self {
            pages: Arc::clone(&self.pages),
            failures: Arc::clone(&self.failures),
            fetch_calls: Arc::clone(&self.fetch_calls),
        }
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.fetch_calls.write().unwrap().push(url.to_string());

        if let Some(&status) = self.failures.read().unwrap().get(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
