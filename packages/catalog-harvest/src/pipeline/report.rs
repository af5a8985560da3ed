//! Outcome of one run.

use std::fmt;
use std::time::Duration;

/// Why an item produced no extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The detail page could not be fetched
    FetchFailed(String),

    /// The page (or ledger field) had no text to extract from
    EmptyPayload,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed(e) => write!(f, "fetch failed: {}", e),
            SkipReason::EmptyPayload => write!(f, "empty payload"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub url: String,
    pub reason: SkipReason,
}

/// Counters and item lists collected by the batch driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Items in the full worklist
    pub discovered: usize,

    /// Items visited after slicing
    pub considered: usize,

    /// Items with a successful extraction
    pub processed: usize,

    /// Records persisted to the ledger by this run
    pub records_written: usize,

    /// Items skipped before extraction
    pub skipped: Vec<SkippedItem>,

    /// Items whose extraction failed after every attempt
    pub failed: Vec<String>,

    /// The run ended early on the daily request limit
    pub stopped_on_quota: bool,

    /// Total time spent waiting on the throttle
    pub throttle_wait: Duration,
}

impl RunReport {
    pub(crate) fn skip(&mut self, url: &str, reason: SkipReason) {
        self.skipped.push(SkippedItem {
            url: url.to_string(),
            reason,
        });
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} items processed ({} discovered), {} records written, {} skipped, {} failed, {:.1}s throttled",
            self.processed,
            self.considered,
            self.discovered,
            self.records_written,
            self.skipped.len(),
            self.failed.len(),
            self.throttle_wait.as_secs_f64()
        )?;
        if self.stopped_on_quota {
            write!(f, "; stopped on daily quota")?;
        }
        Ok(())
    }
}
