//! Configuration loaded from the environment (and `.env`), overridable from the CLI.

use ai_client::Provider;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

/// Default requests-per-minute ceiling.
pub const DEFAULT_RPM: u32 = 60;
/// Default tokens-per-minute ceiling.
pub const DEFAULT_TPM: u64 = 1_000_000;
/// Default requests-per-day ceiling.
pub const DEFAULT_RPD: u32 = 1_500;
/// Default delay between page fetches, in seconds.
pub const DEFAULT_SCRAPE_DELAY_SECS: f64 = 1.0;

/// Browser-like agent; the catalog host serves reduced markup to unknown bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Limits enforced by [`crate::throttle::Throttle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    /// Requests per trailing minute
    pub rpm: u32,

    /// Cost units (tokens) per trailing minute
    pub tpm: u64,

    /// Requests per trailing day; reaching it ends the run
    pub rpd: u32,

    /// Added to every computed wait so the boundary entry has surely aged out
    pub safety_margin: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            rpm: DEFAULT_RPM,
            tpm: DEFAULT_TPM,
            rpd: DEFAULT_RPD,
            safety_margin: Duration::from_millis(100),
        }
    }
}

impl ThrottleConfig {
    /// Create a config with the given limits and the default margin.
    pub fn new(rpm: u32, tpm: u64, rpd: u32) -> Self {
        Self {
            rpm,
            tpm,
            rpd,
            ..Default::default()
        }
    }

    /// Reject zero limits; a zero ceiling could never admit a call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("rpm", self.rpm as u64),
            ("tpm", self.tpm),
            ("rpd", self.rpd as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

/// HTTP scraping behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    /// Politeness delay after every page fetch
    pub delay: Duration,

    /// Per-request timeout
    pub timeout: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs_f64(DEFAULT_SCRAPE_DELAY_SECS),
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Retry behaviour of one extraction call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Attempts per item (not shared across items)
    pub max_attempts: u32,

    /// Backoff before retry `n` is `base * 2^n`
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Resume / slice / persistence options for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after this many items, counted from the slice start
    pub limit: Option<usize>,

    /// 1-based position of the first item to process
    pub start_at: Option<usize>,

    /// Append to the ledger instead of overwriting it
    pub append: bool,
}

/// Everything read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub throttle: ThrottleConfig,
    pub scrape: ScrapeConfig,
    pub catalog_url: Option<String>,
    pub degree_reqs_url: Option<String>,
}

impl Settings {
    /// Load settings from process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from a fixed map (tests, embedding).
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse::<Provider>().map_err(|e| ConfigError::Invalid {
                key: "LLM_PROVIDER".into(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => Provider::default(),
        };

        let api_key = get("API_KEY").or_else(|| get(provider.api_key_var()));
        let model = get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let throttle = ThrottleConfig {
            rpm: parse_or(&get, "RPM_LIMIT", DEFAULT_RPM)?,
            tpm: parse_or(&get, "TPM_LIMIT", DEFAULT_TPM)?,
            rpd: parse_or(&get, "RPD_LIMIT", DEFAULT_RPD)?,
            ..Default::default()
        };
        throttle.validate()?;

        let delay_secs: f64 = parse_or(&get, "WEBSITE_SCRAPE_DELAY", DEFAULT_SCRAPE_DELAY_SECS)?;
        let scrape = ScrapeConfig {
            delay: secs_to_duration("WEBSITE_SCRAPE_DELAY", delay_secs)?,
            ..Default::default()
        };

        Ok(Self {
            provider,
            api_key,
            model,
            base_url: get("LLM_BASE_URL"),
            throttle,
            scrape,
            catalog_url: get("CATALOG_URL"),
            degree_reqs_url: get("DEGREE_REQS_URL"),
        })
    }

    /// API key, or a config error naming the variables that were checked.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or_else(|| {
            ConfigError::Missing(format!("API_KEY or {}", self.provider.api_key_var()))
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Convert a seconds value from config into a duration, rejecting negatives and NaN.
pub fn secs_to_duration(key: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        value: secs.to_string(),
        reason: e.to_string(),
    })
}
