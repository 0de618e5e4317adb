//! End-to-end runs against the scripted site.
//!
//! Each test drives a full `Orchestrator` run (session, traversal, sink) and
//! checks the CSV on disk.

use job_scraper::{
    testing::{post, DriverAction, FakePage, FakeSite, TempDir},
    Credentials, Orchestrator, RetryPolicy, ScrapeError, ScraperConfig, Session, SessionStore,
    SettleDelay, StopReason, HEADER,
};
use serde_json::json;
use std::fs;

const START: &str = "https://jobs.test/jobs";
const PAGE_2: &str = "https://jobs.test/jobs?page=2";

fn config(dir: &TempDir) -> ScraperConfig {
    ScraperConfig::new()
        .with_start_url(START)
        .with_login_url("https://jobs.test/")
        .with_session_path(dir.join("login.json"))
        .with_output_path(dir.join("job_posts.csv"))
        .with_credentials(Credentials::new("me@example.org", "pw"))
        .with_settle_delay(SettleDelay::none())
}

/// Two listings and a next control, then one listing and no control.
fn two_page_site() -> FakeSite {
    FakeSite::new()
        .with_page(
            FakePage::new(START)
                .with_posts(vec![post("Food Shelf", "Driver"), post("Library", "Tutor")])
                .with_next(PAGE_2),
        )
        .with_page(FakePage::new(PAGE_2).with_posts(vec![post("Clinic", "Interpreter")]))
}

fn store_session(dir: &TempDir) {
    SessionStore::new(dir.join("login.json"))
        .save(&Session::new(json!({ "cookies": [{ "name": "sid", "value": "stored" }] })))
        .unwrap();
}

fn csv_lines(dir: &TempDir) -> Vec<String> {
    fs::read_to_string(dir.join("job_posts.csv"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_two_pages_written_in_fetch_order() {
    let dir = TempDir::new("e2e-two-pages");
    store_session(&dir);
    let site = two_page_site();

    let report = Orchestrator::new(site.clone(), config(&dir))
        .run()
        .await
        .unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.records, 3);
    assert_eq!(report.stop_reason, StopReason::NoNextPage);

    let lines = csv_lines(&dir);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], HEADER.join(","));
    assert!(lines[1].starts_with("Food Shelf,Driver,"));
    assert!(lines[2].starts_with("Library,Tutor,"));
    assert!(lines[3].starts_with("Clinic,Interpreter,"));

    // The initial goto and one followed link.
    assert_eq!(site.navigation_count(), 2);
    assert_eq!(site.login_attempts(), 0);
}

#[tokio::test]
async fn test_rows_use_normalised_columns() {
    let dir = TempDir::new("e2e-columns");
    store_session(&dir);
    let site = FakeSite::new().with_page(FakePage::new(START).with_posts(vec![json!({
        "org_name": "Parks Trust",
        "job_title": "Ranger",
        "contract_type": "contract",
        "location_type": "Hybrid"
    })]));

    Orchestrator::new(site, config(&dir)).run().await.unwrap();

    let mut reader = csv::Reader::from_path(dir.join("job_posts.csv")).unwrap();
    let row = reader.records().next().unwrap().unwrap();
    assert_eq!(row.len(), 7);
    assert_eq!(&row[0], "Parks Trust");
    assert_eq!(&row[2], "");
    assert_eq!(&row[4], "Contract");
    assert_eq!(&row[5], "hybrid");
    assert_eq!(&row[6], "");
}

#[tokio::test]
async fn test_header_written_once_across_runs() {
    let dir = TempDir::new("e2e-header");
    store_session(&dir);

    for _ in 0..3 {
        Orchestrator::new(two_page_site(), config(&dir))
            .run()
            .await
            .unwrap();
    }

    let lines = csv_lines(&dir);
    let headers = lines.iter().filter(|l| **l == HEADER.join(",")).count();
    assert_eq!(headers, 1);
    assert_eq!(lines.len(), 1 + 3 * 3);
}

#[tokio::test]
async fn test_rerun_appends_duplicate_rows() {
    let dir = TempDir::new("e2e-duplicates");
    store_session(&dir);

    Orchestrator::new(two_page_site(), config(&dir))
        .run()
        .await
        .unwrap();
    Orchestrator::new(two_page_site(), config(&dir))
        .run()
        .await
        .unwrap();

    let lines = csv_lines(&dir);
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[1..4], lines[4..7]);
}

#[tokio::test]
async fn test_failed_run_keeps_rows_and_rerun_starts_over() {
    let dir = TempDir::new("e2e-partial-rerun");
    store_session(&dir);

    let err = Orchestrator::new(
        two_page_site().fail_queries(PAGE_2, 5),
        config(&dir).with_retry(RetryPolicy::none()),
    )
    .run()
    .await
    .unwrap_err();

    match err {
        ScrapeError::FetchFailed { url, .. } => assert_eq!(url, PAGE_2),
        other => panic!("expected FetchFailed, got {other:?}"),
    }
    let lines = csv_lines(&dir);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER.join(","));

    Orchestrator::new(two_page_site(), config(&dir))
        .run()
        .await
        .unwrap();

    let lines = csv_lines(&dir);
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[1..3], lines[3..5]);
    assert!(lines[5].starts_with("Clinic,Interpreter"));
    assert_eq!(lines.iter().filter(|l| **l == HEADER.join(",")).count(), 1);
}

#[tokio::test]
async fn test_stored_session_skips_login() {
    let dir = TempDir::new("e2e-stored-session");
    store_session(&dir);
    let site = two_page_site();

    Orchestrator::new(site.clone(), config(&dir))
        .run()
        .await
        .unwrap();

    assert_eq!(site.login_attempts(), 0);
    assert_eq!(
        site.contexts(),
        vec![Session::new(json!({ "cookies": [{ "name": "sid", "value": "stored" }] }))]
    );
    assert!(!site
        .actions()
        .contains(&DriverAction::Goto("https://jobs.test/".to_string())));
}

#[tokio::test]
async fn test_first_run_logs_in_and_saves_session() {
    let dir = TempDir::new("e2e-first-run");
    let site = two_page_site();

    Orchestrator::new(site.clone(), config(&dir))
        .run()
        .await
        .unwrap();

    assert_eq!(site.login_attempts(), 1);
    let saved = SessionStore::new(dir.join("login.json")).load().unwrap();
    // The traversal context is built from the artifact that was just written.
    assert_eq!(site.contexts(), vec![saved]);
    assert_eq!(csv_lines(&dir).len(), 4);
}
