//! End-to-end runs of the batch driver against mock page and LLM services.

use catalog_harvest::testing::{MockExtractor, MockFetcher};
use catalog_harvest::{
    BatchDriver, ContentTarget, Extractor, HarvestError, Ledger, LinkRule, PagerRule, RunOptions,
    ThrottleConfig, WorkItem, WorklistBuilder, WorklistSource,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const INDEX_URL: &str = "https://catalog.example.edu/content.php?catoid=7&navoid=100";

fn detail_url(coid: u32) -> String {
    format!("https://catalog.example.edu/preview_course.php?catoid=7&coid={}", coid)
}

fn detail_page(coid: u32) -> String {
    format!(
        r#"<html><body><nav>Menu</nav>
           <div id="acalog-course-preview"><h1>TEST {coid} - Course {coid}</h1><p>Credits: 3</p></div>
           </body></html>"#
    )
}

fn course_json(coid: u32) -> String {
    json!({
        "course_number": format!("TEST {}", coid),
        "title": format!("Course {}", coid),
        "credits": "3",
        "description": "N/A",
        "prerequisites": "N/A"
    })
    .to_string()
}

/// Ten courses split over an index page and one pagination page.
fn catalog_site() -> MockFetcher {
    let link = |coid: u32| {
        format!(
            r#"<a href="javascript:void(0)" onclick="showCourse('7', '{}', this)">x</a>"#,
            coid
        )
    };
    let index = format!(
        r#"<table class="table_default"><tr><td>{}</td></tr></table>
           <table class="table_default"><tr><td>Page: 1 <a href="content.php?catoid=7&navoid=100&cpage=2">2</a></td></tr></table>"#,
        (10..15).map(link).collect::<String>()
    );
    let page2 = (15..20).map(link).collect::<String>();

    (10..20).fold(
        MockFetcher::new()
            .with_page(INDEX_URL, index)
            .with_page(format!("{}&cpage=2", INDEX_URL), page2),
        |fetcher, coid| fetcher.with_page(detail_url(coid), detail_page(coid)),
    )
}

/// An extractor answering with one course record per call, in order.
fn scripted(coids: impl IntoIterator<Item = u32>) -> MockExtractor {
    coids
        .into_iter()
        .fold(MockExtractor::new(), |mock, coid| mock.with_response(course_json(coid)))
}

fn catalog_driver(
    fetcher: &MockFetcher,
    extractor: &MockExtractor,
    ledger: Ledger,
    options: RunOptions,
) -> (BatchDriver, WorklistSource) {
    let builder = WorklistBuilder::new(
        Arc::new(fetcher.clone()),
        INDEX_URL,
        LinkRule::acalog_course().unwrap(),
    )
    .with_pager(PagerRule::acalog().unwrap())
    .with_delay(Duration::from_secs(1));

    let driver = BatchDriver::new(
        Arc::new(fetcher.clone()),
        Extractor::new(Arc::new(extractor.clone()), "extract the course"),
        ThrottleConfig::default(),
        ledger,
    )
    .with_options(options)
    .with_content(ContentTarget::selector("div#acalog-course-preview").unwrap())
    .with_scrape_delay(Duration::from_secs(1));

    (driver, WorklistSource::Discover(builder))
}

#[tokio::test(start_paused = true)]
async fn test_start_at_and_limit_select_positions_five_to_seven() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(dir.path().join("courses.json")).unwrap();
    let fetcher = catalog_site();
    let extractor = scripted([14, 15, 16]);

    let options = RunOptions {
        start_at: Some(5),
        limit: Some(3),
        append: false,
    };
    let (driver, source) = catalog_driver(&fetcher, &extractor, ledger.clone(), options);
    let report = driver.run(source).await.unwrap();

    assert_eq!(report.discovered, 10);
    assert_eq!(report.considered, 3);
    let numbers: Vec<_> = ledger
        .read()
        .unwrap()
        .iter()
        .map(|r| r["course_number"].clone())
        .collect();
    assert_eq!(numbers, vec!["TEST 14", "TEST 15", "TEST 16"]);

    // Only the sliced detail pages are fetched, after the two index pages
    let fetched = fetcher.fetch_calls();
    assert_eq!(&fetched[2..], &[detail_url(14), detail_url(15), detail_url(16)]);
    assert!(extractor.inputs()[0].contains("TEST 14 - Course 14"));
    assert!(!extractor.inputs()[0].contains("Menu"));
}

#[tokio::test(start_paused = true)]
async fn test_append_preserves_existing_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courses.json");
    std::fs::write(
        &path,
        r#"[{"course_number": "OLD 1"}, {"course_number": "OLD 2"}, {"course_number": "OLD 3"}]"#,
    )
    .unwrap();
    let ledger = Ledger::new(&path).unwrap();
    let fetcher = catalog_site();
    let extractor = scripted([10, 11]);

    let options = RunOptions {
        start_at: Some(1),
        limit: Some(2),
        append: true,
    };
    let (driver, source) = catalog_driver(&fetcher, &extractor, ledger.clone(), options);
    let report = driver.run(source).await.unwrap();
    assert_eq!(report.records_written, 2);

    let numbers: Vec<_> = ledger
        .read()
        .unwrap()
        .iter()
        .map(|r| r["course_number"].clone())
        .collect();
    assert_eq!(numbers, vec!["OLD 1", "OLD 2", "OLD 3", "TEST 10", "TEST 11"]);
}

#[tokio::test(start_paused = true)]
async fn test_fenced_and_plain_responses_yield_same_records() {
    let dir = tempfile::tempdir().unwrap();
    let items = || {
        vec![WorkItem::from_record(
            "ACCT 2013",
            "ACCT 2013 Accounting Principles",
            Default::default(),
        )]
    };
    let body = course_json(1);

    let mut outputs = Vec::new();
    for (name, response) in [
        ("plain.json", body.clone()),
        ("fenced.json", format!("```json\n{}\n```", body)),
    ] {
        let ledger = Ledger::new(dir.path().join(name)).unwrap();
        BatchDriver::new(
            Arc::new(MockFetcher::new()),
            Extractor::new(Arc::new(MockExtractor::new().with_fallback(response)), "i"),
            ThrottleConfig::default(),
            ledger.clone(),
        )
        .run(WorklistSource::Items(items()))
        .await
        .unwrap();
        outputs.push(ledger.read().unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0][0]["title"], "Course 1");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_json_on_every_attempt_skips_item_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(dir.path().join("out.json")).unwrap();
    let extractor = MockExtractor::new()
        .with_response_for("first", "I could not find a course here.")
        .with_response_for("second", r#"{"course_number": "TEST 2"}"#);
    let items = vec![
        WorkItem::from_record("a", "first", Default::default()),
        WorkItem::from_record("b", "second", Default::default()),
    ];

    let report = BatchDriver::new(
        Arc::new(MockFetcher::new()),
        Extractor::new(Arc::new(extractor.clone()), "i"),
        ThrottleConfig::default(),
        ledger.clone(),
    )
    .run(WorklistSource::Items(items))
    .await
    .unwrap();

    assert_eq!(report.failed, vec!["a"]);
    assert_eq!(report.processed, 1);
    assert_eq!(extractor.inputs(), vec!["first", "first", "first", "second"]);
    assert_eq!(ledger.read().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_daily_quota_flushes_what_was_collected() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(dir.path().join("courses.csv")).unwrap();
    let fetcher = catalog_site();
    let extractor = scripted(10..20);

    let builder = WorklistBuilder::new(
        Arc::new(fetcher.clone()),
        INDEX_URL,
        LinkRule::acalog_course().unwrap(),
    )
    .with_pager(PagerRule::acalog().unwrap());
    let report = BatchDriver::new(
        Arc::new(fetcher.clone()),
        Extractor::new(Arc::new(extractor.clone()), "i"),
        ThrottleConfig::new(60, 1_000_000, 4),
        ledger.clone(),
    )
    .with_content(ContentTarget::selector("div#acalog-course-preview").unwrap())
    .run(WorklistSource::Discover(builder))
    .await
    .unwrap();

    assert!(report.stopped_on_quota);
    assert_eq!(report.records_written, 4);
    let csv = std::fs::read_to_string(ledger.path()).unwrap();
    assert!(csv.starts_with("course_number,title,credits,description,prerequisites\n"));
    assert_eq!(csv.lines().count(), 5);
    assert_eq!(extractor.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_index_aborts_without_touching_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courses.json");
    let fetcher = MockFetcher::new().with_failure(INDEX_URL, 503);
    let (driver, source) = catalog_driver(
        &fetcher,
        &MockExtractor::new(),
        Ledger::new(&path).unwrap(),
        RunOptions::default(),
    );

    let err = driver.run(source).await.unwrap_err();
    assert!(matches!(err, HarvestError::Fetch(_)));
    assert!(!path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_start_past_end_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = catalog_site();
    let extractor = MockExtractor::new();
    let options = RunOptions {
        start_at: Some(11),
        ..Default::default()
    };
    let (driver, source) = catalog_driver(
        &fetcher,
        &extractor,
        Ledger::new(dir.path().join("c.json")).unwrap(),
        options,
    );

    assert!(matches!(
        driver.run(source).await,
        Err(HarvestError::StartOutOfRange { start_at: 11, len: 10 })
    ));
}
