//! Page source trait.

use async_trait::async_trait;

use crate::error::FetchResult;

/// Fetches raw HTML for a URL.
///
/// A non-success response is an error; callers decide whether that error is
/// fatal (first index page) or a per-item skip.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body of `url`.
    async fn fetch(&self, url: &str) -> FetchResult<String>;

    /// Fetcher name for logging.
    fn name(&self) -> &str {
        "http"
    }
}
