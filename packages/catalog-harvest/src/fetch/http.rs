//! HTTP page fetcher (reqwest).

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::error::{ConfigError, FetchError, FetchResult};
use crate::traits::PageFetcher;

/// Fetches pages over HTTP with a browser-like User-Agent and a fixed timeout.
///
/// Politeness delays are applied by the callers (worklist builder, batch
/// driver), not here.
///
/// # Example
///
/// ```rust,ignore
/// use catalog_harvest::{HttpFetcher, ScrapeConfig, PageFetcher};
///
/// let fetcher = HttpFetcher::new(&ScrapeConfig::default())?;
/// let html = fetcher.fetch("https://catalog.example.edu/content.php?catoid=1").await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from the scrape settings.
    pub fn new(config: &ScrapeConfig) -> Result<Self, ConfigError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "http_client".into(),
                value: config.user_agent.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(parsed).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            classify(url, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true);
        if !is_html {
            warn!(url = %url, "Response is not HTML, parsing anyway");
        }

        let body = response.text().await.map_err(|e| classify(url, e))?;
        debug!(url = %url, bytes = body.len(), "HTTP fetch complete");
        Ok(body)
    }
}

fn classify(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: Box::new(error),
        }
    }
}
