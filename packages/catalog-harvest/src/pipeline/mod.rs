//! Batch driver: the sequential, throttled walk over a worklist.
//!
//! ```text
//! Init ─► FetchingWorklist ─► Slicing ─► Processing* ─► Flushing ─► Done
//!   │            │               │            │             │
//!   └────────────┴───────────────┴─── Fatal ◄─┴─────────────┘
//! ```
//!
//! The ledger is checked in `Init`, before the probe and any paid call, so a
//! target that cannot take the results fails the run while nothing is lost.
//!
//! Per item: fetch → text → (skip if empty) → cost → admit → record →
//! extract. A daily-quota stop jumps straight to `Flushing` so partial
//! progress is kept; every other per-item failure is a logged skip.

pub mod report;
pub mod slice;

pub use report::{RunReport, SkipReason, SkippedItem};
pub use slice::slice;

use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{RunOptions, ThrottleConfig};
use crate::content::{extract_text, ContentTarget};
use crate::error::{HarvestError, Result};
use crate::extract::{measure_cost, Extractor};
use crate::ledger::{self, Ledger};
use crate::throttle::Throttle;
use crate::traits::PageFetcher;
use crate::types::{flatten_into, Record, WorkItem};
use crate::worklist::WorklistBuilder;

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    FetchingWorklist,
    Slicing,
    Processing,
    Flushing,
    Done,
    Fatal,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::FetchingWorklist => "fetching_worklist",
            Phase::Slicing => "slicing",
            Phase::Processing => "processing",
            Phase::Flushing => "flushing",
            Phase::Done => "done",
            Phase::Fatal => "fatal",
        };
        write!(f, "{}", name)
    }
}

/// Where the worklist comes from.
pub enum WorklistSource {
    /// Index + pagination discovery
    Discover(WorklistBuilder),

    /// A worklist that is already known (single page, ledger rows)
    Items(Vec<WorkItem>),
}

impl WorklistSource {
    async fn load(self) -> Result<Vec<WorkItem>> {
        match self {
            WorklistSource::Discover(builder) => builder.build().await,
            WorklistSource::Items(items) => Ok(items),
        }
    }
}

/// How extraction output becomes ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Each extracted record is written as-is
    #[default]
    Records,

    /// Output is flattened into the item's base record; items without
    /// usable output pass their base record through unchanged
    Enrich,
}

/// Runs one batch. Owns the throttle and the result buffer for the run.
pub struct BatchDriver {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Extractor,
    throttle: Throttle,
    ledger: Ledger,
    options: RunOptions,
    content: ContentTarget,
    merge: MergeMode,
    scrape_delay: Duration,
    failed_log: Option<PathBuf>,
    probe: bool,
    phase: Phase,
}

impl BatchDriver {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Extractor,
        throttle: ThrottleConfig,
        ledger: Ledger,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            throttle: Throttle::new(throttle),
            ledger,
            options: RunOptions::default(),
            content: ContentTarget::default(),
            merge: MergeMode::default(),
            scrape_delay: Duration::ZERO,
            failed_log: None,
            probe: true,
            phase: Phase::Init,
        }
    }

    /// Slice and persistence options.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Which part of fetched pages becomes the payload.
    pub fn with_content(mut self, content: ContentTarget) -> Self {
        self.content = content;
        self
    }

    pub fn with_merge(mut self, merge: MergeMode) -> Self {
        self.merge = merge;
        self
    }

    /// Politeness delay after every page fetch.
    pub fn with_scrape_delay(mut self, delay: Duration) -> Self {
        self.scrape_delay = delay;
        self
    }

    /// Append the input of every failed extraction to this file.
    pub fn with_failed_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.failed_log = Some(path.into());
        self
    }

    /// Probe the extraction service before doing any work (default on).
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "Batch phase");
        self.phase = phase;
    }

    fn fatal(&mut self, error: HarvestError) -> HarvestError {
        warn!(phase = %self.phase, error = %error, "Run aborted");
        self.enter(Phase::Fatal);
        error
    }

    /// Run the batch to completion.
    pub async fn run(mut self, source: WorklistSource) -> Result<RunReport> {
        let mut report = RunReport::default();

        if let Err(e) = self.ledger.preflight(self.options.append) {
            return Err(self.fatal(e.into()));
        }

        if self.probe {
            if let Err(e) = self.extractor.service().probe().await {
                return Err(self.fatal(HarvestError::ServiceUnavailable(e)));
            }
            info!(provider = self.extractor.service().name(), "Extraction service reachable");
        }

        self.enter(Phase::FetchingWorklist);
        let items = match source.load().await {
            Ok(items) => items,
            Err(e) => return Err(self.fatal(e)),
        };
        report.discovered = items.len();

        self.enter(Phase::Slicing);
        let range = match slice(items.len(), self.options.start_at, self.options.limit) {
            Ok(range) => range,
            Err(e) => return Err(self.fatal(e)),
        };
        info!(
            total = items.len(),
            first = range.start + 1,
            count = range.len(),
            "Processing slice"
        );

        self.enter(Phase::Processing);
        let mut results: Vec<Record> = Vec::new();
        let total = range.len();
        for (n, item) in items[range.clone()].iter().enumerate() {
            let position = range.start + n + 1;
            info!(item = n + 1, total, position, url = %item.url, "Processing item");
            report.considered += 1;

            if !self.process_item(item, &mut results, &mut report).await {
                break;
            }
        }

        self.enter(Phase::Flushing);
        if results.is_empty() {
            info!("Nothing to save");
        } else {
            match self.ledger.write(&results, self.options.append) {
                Ok(written) => report.records_written = written,
                Err(e) => {
                    match self.ledger.save_unsaved(&results) {
                        Ok(path) => warn!(
                            path = %path.display(),
                            records = results.len(),
                            "Ledger write failed, results saved to fallback file"
                        ),
                        Err(dump) => warn!(
                            error = %dump,
                            records = results.len(),
                            "Ledger write failed and results could not be saved elsewhere"
                        ),
                    }
                    return Err(self.fatal(e.into()));
                }
            }
        }

        self.enter(Phase::Done);
        info!(summary = %report, "Run complete");
        Ok(report)
    }

    /// Handle one item. Returns `false` when the run must stop.
    async fn process_item(
        &mut self,
        item: &WorkItem,
        results: &mut Vec<Record>,
        report: &mut RunReport,
    ) -> bool {
        let payload = match &item.payload {
            Some(payload) => payload.clone(),
            None => {
                let fetched = self.fetcher.fetch(&item.url).await;
                tokio::time::sleep(self.scrape_delay).await;
                match fetched {
                    Ok(html) => extract_text(&html, &self.content),
                    Err(e) => {
                        warn!(url = %item.url, error = %e, "Fetch failed, skipping item");
                        report.skip(&item.url, SkipReason::FetchFailed(e.to_string()));
                        return true;
                    }
                }
            }
        };

        if payload.trim().is_empty() {
            warn!(url = %item.url, "Empty payload, skipping item");
            report.skip(&item.url, SkipReason::EmptyPayload);
            self.pass_through(item, results);
            return true;
        }

        let cost = measure_cost(self.extractor.service(), &payload).await;
        debug!(url = %item.url, cost, "Payload cost");

        match self.throttle.admit(cost).await {
            Ok(waited) => report.throttle_wait += waited,
            Err(e) => {
                warn!(url = %item.url, error = %e, "Quota reached, flushing partial results");
                report.stopped_on_quota = true;
                return false;
            }
        }
        self.throttle.record(cost);

        match self.extractor.extract(&payload).await {
            Some(records) => {
                report.processed += 1;
                self.collect(item, records, results);
            }
            None => {
                warn!(url = %item.url, input = %payload, "Extraction failed, input kept for manual review");
                report.failed.push(item.url.clone());
                self.log_failure(item, &payload);
                self.pass_through(item, results);
            }
        }

        true
    }

    fn collect(&self, item: &WorkItem, records: Vec<Record>, results: &mut Vec<Record>) {
        match (self.merge, &item.base) {
            (MergeMode::Enrich, Some(base)) => {
                let mut merged = base.clone();
                let parsed = match records.len() {
                    1 => records.into_iter().next().map(Value::Object),
                    _ => Some(Value::Array(records.into_iter().map(Value::Object).collect())),
                };
                if let Some(parsed) = parsed {
                    flatten_into("", &parsed, &mut merged);
                }
                results.push(merged);
            }
            _ => results.extend(records),
        }
    }

    fn pass_through(&self, item: &WorkItem, results: &mut Vec<Record>) {
        if let (MergeMode::Enrich, Some(base)) = (self.merge, &item.base) {
            results.push(base.clone());
        }
    }

    fn log_failure(&self, item: &WorkItem, payload: &str) {
        let Some(path) = &self.failed_log else {
            return;
        };
        let entry = format!("=== {}\n{}\n\n", item.url, payload);
        if let Err(e) = ledger::append_text(path, &entry) {
            warn!(path = %path.display(), error = %e, "Could not write failed-input log");
        }
    }
}
