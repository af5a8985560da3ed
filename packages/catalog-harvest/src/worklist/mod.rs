//! Worklist discovery.
//!
//! Three sources, one output type (`Vec<WorkItem>`):
//!
//! | Source | Order | Duplicates |
//! |---|---|---|
//! | [`WorklistBuilder`] (index + pagination) | lexicographic by URL | removed |
//! | [`single_page`] | one item | n/a |
//! | [`from_ledger`] | ledger row order | kept |
//!
//! Sorting the discovered set is what makes `--start-at` mean the same item
//! across runs.

pub mod rules;

pub use rules::{LinkRule, PagerRule};

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::error::{FetchError, HarvestError, Result};
use crate::ledger;
use crate::traits::PageFetcher;
use crate::types::{cell_text, WorkItem};

/// Discovers leaf-item URLs from an index page and its pagination pages.
pub struct WorklistBuilder {
    fetcher: Arc<dyn PageFetcher>,
    index_url: String,
    items: LinkRule,
    pager: Option<PagerRule>,
    delay: Duration,
}

impl WorklistBuilder {
    pub fn new(fetcher: Arc<dyn PageFetcher>, index_url: impl Into<String>, items: LinkRule) -> Self {
        Self {
            fetcher,
            index_url: index_url.into(),
            items,
            pager: None,
            delay: Duration::ZERO,
        }
    }

    /// Follow pagination links found on the index page.
    pub fn with_pager(mut self, pager: PagerRule) -> Self {
        self.pager = Some(pager);
        self
    }

    /// Politeness delay after each pagination fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fetch the index and every pagination page, returning the sorted,
    /// deduplicated set of item URLs.
    ///
    /// The index page must load; a failing pagination page only loses its
    /// own items. Discovering nothing at all is an error.
    pub async fn build(&self) -> Result<Vec<WorkItem>> {
        let base = Url::parse(&self.index_url).map_err(|_| FetchError::InvalidUrl {
            url: self.index_url.clone(),
        })?;

        info!(url = %self.index_url, fetcher = self.fetcher.name(), "Fetching index page");
        let index_html = self.fetcher.fetch(&self.index_url).await?;

        let mut found: BTreeSet<String> = BTreeSet::new();
        found.extend(self.items.extract(&index_html, &base));

        let pages: Vec<String> = match &self.pager {
            Some(pager) => pager
                .extract(&index_html, &base)
                .into_iter()
                .filter(|url| *url != self.index_url)
                .collect(),
            None => Vec::new(),
        };
        info!(pages = pages.len() + 1, "Index pages to scan");

        for (i, page_url) in pages.iter().enumerate() {
            info!(page = i + 2, total = pages.len() + 1, url = %page_url, "Fetching index page");
            match self.fetcher.fetch(page_url).await {
                Ok(html) => {
                    let before = found.len();
                    found.extend(self.items.extract(&html, &base));
                    info!(new_items = found.len() - before, "Index page scanned");
                }
                Err(e) => {
                    warn!(url = %page_url, error = %e, "Index page failed, continuing without it");
                }
            }
            tokio::time::sleep(self.delay).await;
        }

        if found.is_empty() {
            return Err(HarvestError::EmptyWorklist {
                reason: format!("no item links found from {}", self.index_url),
            });
        }

        info!(items = found.len(), "Worklist discovered");
        Ok(found.into_iter().map(WorkItem::new).collect())
    }
}

/// A worklist of exactly one page.
pub fn single_page(url: impl Into<String>) -> Result<Vec<WorkItem>> {
    let url = url.into();
    Url::parse(&url).map_err(|_| FetchError::InvalidUrl { url: url.clone() })?;
    Ok(vec![WorkItem::new(url)])
}

/// Payload values that mean "nothing to extract".
fn is_blank_payload(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a")
}

/// Build a worklist from an existing ledger (CSV or JSON).
///
/// Each row becomes an item whose payload is the text of `payload_field`
/// (blank or `N/A` become an empty payload, which the driver passes through
/// unchanged). Items are identified by `id_field` when given, else by row
/// number.
pub fn from_ledger(
    path: &Path,
    payload_field: &str,
    id_field: Option<&str>,
) -> Result<Vec<WorkItem>> {
    let records = ledger::read_records(path)?;
    if records.is_empty() {
        return Err(HarvestError::EmptyWorklist {
            reason: format!("{} has no records", path.display()),
        });
    }

    let mut missing_field = 0usize;
    let items: Vec<WorkItem> = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let payload = match record.get(payload_field) {
                Some(value) => cell_text(value),
                None => {
                    missing_field += 1;
                    String::new()
                }
            };
            let payload = if is_blank_payload(&payload) {
                String::new()
            } else {
                payload
            };
            let id = id_field
                .and_then(|field| record.get(field))
                .map(cell_text)
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("row {}", i + 1));
            WorkItem::from_record(id, payload, record)
        })
        .collect();

    if missing_field > 0 {
        warn!(
            field = payload_field,
            rows = missing_field,
            "Rows without the payload field will pass through unchanged"
        );
    }

    info!(items = items.len(), path = %path.display(), "Worklist loaded from ledger");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::io::Write;

    const INDEX_URL: &str = "https://catalog.example.edu/content.php?catoid=7&navoid=100";

    fn course_link(coid: u32) -> String {
        format!(r##"<a href="#" onclick="showCourse('7', '{}', this)">c</a>"##, coid)
    }

    fn index_page() -> String {
        format!(
            r#"<table class="table_default"><tr><td>{}{}</td></tr></table>
               <table><tr><td class="acalog-course-filter-pager">
                 <a href="content.php?catoid=7&navoid=100&cpage=2">2</a>
                 <a href="content.php?catoid=7&navoid=100&cpage=3">3</a>
               </td></tr></table>"#,
            course_link(30),
            course_link(10)
        )
    }

    fn builder(fetcher: &MockFetcher) -> WorklistBuilder {
        WorklistBuilder::new(
            Arc::new(fetcher.clone()),
            INDEX_URL,
            LinkRule::acalog_course().unwrap(),
        )
        .with_pager(PagerRule::acalog().unwrap())
        .with_delay(Duration::from_secs(1))
    }

    fn detail(coid: u32) -> String {
        format!(
            "https://catalog.example.edu/preview_course.php?catoid=7&coid={}",
            coid
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_dedupes_and_sorts_across_pages() {
        let fetcher = MockFetcher::new()
            .with_page(INDEX_URL, index_page())
            .with_page(
                format!("{}&cpage=2", INDEX_URL),
                format!("{}{}", course_link(20), course_link(10)),
            )
            .with_page(format!("{}&cpage=3", INDEX_URL), course_link(40));

        let items = builder(&fetcher).build().await.unwrap();
        let urls: Vec<_> = items.iter().map(|i| i.url.clone()).collect();

        assert_eq!(urls, vec![detail(10), detail(20), detail(30), detail(40)]);
        assert!(items.iter().all(|i| i.needs_fetch()));
        assert_eq!(fetcher.fetch_call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pagination_page_is_skipped() {
        let fetcher = MockFetcher::new()
            .with_page(INDEX_URL, index_page())
            .with_failure(format!("{}&cpage=2", INDEX_URL), 503)
            .with_page(format!("{}&cpage=3", INDEX_URL), course_link(40));

        let items = builder(&fetcher).build().await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_index_page_is_fatal() {
        let fetcher = MockFetcher::new().with_failure(INDEX_URL, 500);

        let err = builder(&fetcher).build().await.unwrap_err();
        assert!(matches!(err, HarvestError::Fetch(FetchError::Status { status: 500, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_links_is_empty_worklist() {
        let fetcher = MockFetcher::new().with_page(INDEX_URL, "<p>maintenance</p>");

        let err = builder(&fetcher).build().await.unwrap_err();
        assert!(matches!(err, HarvestError::EmptyWorklist { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_politeness_delay_between_pages() {
        let fetcher = MockFetcher::new()
            .with_page(INDEX_URL, index_page())
            .with_page(format!("{}&cpage=2", INDEX_URL), course_link(20))
            .with_page(format!("{}&cpage=3", INDEX_URL), course_link(40));

        let start = tokio::time::Instant::now();
        builder(&fetcher).build().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_single_page() {
        let items = single_page("https://www.example.edu/degrees/cs").unwrap();
        assert_eq!(items.len(), 1);
        assert!(single_page("degrees/cs").is_err());
    }

    #[test]
    fn test_from_ledger_payloads() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(
            file,
            "course_number,prerequisites\nACCT 2013,ACCT 1001\nACCT 2023,N/A\nACCT 3000,\n"
        )
        .unwrap();

        let items = from_ledger(file.path(), "prerequisites", Some("course_number")).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].url, "ACCT 2013");
        assert_eq!(items[0].payload.as_deref(), Some("ACCT 1001"));
        assert_eq!(items[1].payload.as_deref(), Some(""));
        assert_eq!(items[2].payload.as_deref(), Some(""));
        assert_eq!(items[2].base.as_ref().unwrap()["course_number"], "ACCT 3000");
    }

    #[test]
    fn test_from_ledger_row_ids() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"prerequisites": "CS 1103"}}]"#).unwrap();

        let items = from_ledger(file.path(), "prerequisites", None).unwrap();
        assert_eq!(items[0].url, "row 1");
    }
}
