//! Rate-limited course catalog harvesting
//!
//! Walks a bounded worklist of catalog pages, turns each page's text into
//! structured records with an LLM, and persists the records to a JSON or CSV
//! ledger. Everything runs sequentially on one task:
//!
//! ```text
//! WorklistBuilder ─► BatchDriver ─► (Throttle ─► Extractor)* ─► Ledger
//! ```
//!
//! - [`throttle`] - sliding-window RPM / TPM / RPD limiter
//! - [`extract`] - fence stripping, JSON parsing, bounded retries
//! - [`worklist`] - index + pagination discovery, single pages, ledger rows
//! - [`pipeline`] - the batch driver with resume / limit / append
//! - [`ledger`] - JSON-array and CSV output
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_harvest::*;
//! use std::sync::Arc;
//!
//! let settings = Settings::from_env()?;
//! let fetcher = Arc::new(HttpFetcher::new(&settings.scrape)?);
//! let extractor = Extractor::new(ai::from_settings(&settings)?, COURSE_CATALOG_INSTRUCTION);
//!
//! let builder = WorklistBuilder::new(fetcher.clone(), catalog_url, LinkRule::acalog_course()?)
//!     .with_pager(PagerRule::acalog()?)
//!     .with_delay(settings.scrape.delay);
//!
//! let report = BatchDriver::new(fetcher, extractor, settings.throttle, Ledger::new("courses.csv")?)
//!     .with_content(ContentTarget::selector("div#acalog-course-preview")?)
//!     .run(WorklistSource::Discover(builder))
//!     .await?;
//! ```

pub mod ai;
pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ledger;
pub mod pipeline;
pub mod testing;
pub mod throttle;
pub mod traits;
pub mod types;
pub mod worklist;

pub use config::{RetryConfig, RunOptions, ScrapeConfig, Settings, ThrottleConfig};
pub use content::{extract_text, ContentTarget};
pub use error::{
    ConfigError, ExtractError, FetchError, HarvestError, LedgerError, Result, ThrottleError,
};
pub use extract::{
    degree_requirements_instruction, estimate_tokens, measure_cost, parse_records, Extractor,
    ResponseShape, COURSE_CATALOG_INSTRUCTION, PREREQUISITES_INSTRUCTION,
};
pub use fetch::HttpFetcher;
pub use ledger::{Ledger, LedgerFormat};
pub use pipeline::{BatchDriver, MergeMode, Phase, RunReport, SkipReason, WorklistSource};
pub use throttle::{SlidingWindow, Throttle, ThrottleDecision};
pub use traits::{PageFetcher, StructuredExtractor};
pub use types::{Record, WorkItem};
pub use worklist::{LinkRule, PagerRule, WorklistBuilder};
