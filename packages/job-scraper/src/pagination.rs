//! Pagination traversal.
//!
//! A two-state machine. In FETCH the engine pulls the current page's records,
//! appends them to the sink, then looks for a next-page control. It moves to
//! DONE when there is no control, when the page it just wrote has the same URL
//! as the one before it, or when the optional page cap is reached.
//!
//! Repeats are detected one page late: a page whose URL matches its
//! predecessor is still fetched and written, and traversal stops before the
//! page after it.

use std::fmt;
use std::time::Duration;

use crate::error::{Result, ScrapeError};
use crate::query::shapes;
use crate::sink::RecordSink;
use crate::traits::driver::Page;
use crate::types::JobRecord;

/// Bounded exponential backoff for the record query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; it is never less than one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Why a traversal finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoNextPage,
    RepeatedPage,
    PageLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoNextPage => "no next page",
            Self::RepeatedPage => "repeated page",
            Self::PageLimit => "page limit reached",
        })
    }
}

/// Summary of a completed traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalReport {
    pub pages: usize,
    pub records: usize,
    pub stop_reason: StopReason,
}

enum State {
    Fetch {
        previous: Option<String>,
        current: String,
    },
    Done(StopReason),
}

/// Walks a paginated listing and feeds every page's records to a sink.
#[derive(Debug, Clone, Default)]
pub struct PaginationEngine {
    retry: RetryPolicy,
    max_pages: Option<usize>,
}

impl PaginationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Traverse from `start_url`.
    ///
    /// `page` must already be showing `start_url`; the engine only navigates
    /// by clicking next-page controls.
    pub async fn run(
        &self,
        page: &dyn Page,
        start_url: &str,
        sink: &mut RecordSink,
    ) -> Result<TraversalReport> {
        let mut state = State::Fetch {
            previous: None,
            current: start_url.to_string(),
        };
        let mut pages = 0;
        let mut records = 0;

        loop {
            match state {
                State::Fetch { previous, current } => {
                    let batch = self.fetch_records(page, &current).await?;
                    sink.append(&batch)?;
                    pages += 1;
                    records += batch.len();

                    tracing::info!(
                        page = pages,
                        url = %current,
                        records = batch.len(),
                        "Page written"
                    );

                    state = self.advance(page, previous, current, pages).await?;
                }
                State::Done(stop_reason) => {
                    let report = TraversalReport {
                        pages,
                        records,
                        stop_reason,
                    };
                    tracing::info!(
                        pages = report.pages,
                        records = report.records,
                        stop_reason = %report.stop_reason,
                        "Traversal finished"
                    );
                    return Ok(report);
                }
            }
        }
    }

    async fn fetch_records(&self, page: &dyn Page, url: &str) -> Result<Vec<JobRecord>> {
        let shape = shapes::job_posts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match page.query_data(&shape).await {
                Ok(data) => JobRecord::list_from_response(&data, shapes::JOB_POSTS),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(batch) => return Ok(batch),
                Err(reason) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_for(attempt);
                    tracing::warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Record query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(reason) => {
                    return Err(ScrapeError::FetchFailed {
                        url: url.to_string(),
                        reason: format!("{} (after {} attempts)", reason, attempt),
                    });
                }
            }
        }
    }

    async fn advance(
        &self,
        page: &dyn Page,
        previous: Option<String>,
        current: String,
        pages: usize,
    ) -> Result<State> {
        if self.max_pages.is_some_and(|max| pages >= max) {
            return Ok(State::Done(StopReason::PageLimit));
        }

        let controls = page
            .query_elements(&shapes::pagination())
            .await
            .map_err(|e| fetch_failed(&current, e))?;

        let Some(next) = controls.get(shapes::NEXT_PAGE_BUTTON) else {
            return Ok(State::Done(StopReason::NoNextPage));
        };

        if previous.as_deref() == Some(current.as_str()) {
            tracing::warn!(url = %current, "Next page repeats the previous URL, stopping");
            return Ok(State::Done(StopReason::RepeatedPage));
        }

        next.click().await.map_err(|e| fetch_failed(&current, e))?;
        if let Err(e) = page.wait_for_ready().await {
            let target = page.current_url().await.unwrap_or_default();
            return Err(fetch_failed(
                &current,
                format!("page {} at '{}' never became ready: {}", pages + 1, target, e),
            ));
        }
        let landed = page
            .current_url()
            .await
            .map_err(|e| fetch_failed(&current, e))?;

        tracing::debug!(from = %current, to = %landed, "Followed next page");

        Ok(State::Fetch {
            previous: Some(current),
            current: landed,
        })
    }
}

fn fetch_failed(url: &str, reason: impl ToString) -> ScrapeError {
    ScrapeError::FetchFailed {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{post, DriverAction, FakePage, FakeSite, TempDir};
    use crate::traits::driver::BrowserDriver;
    use serde_json::json;
    use std::fs;

    const P1: &str = "https://jobs.test/jobs?page=1";
    const P2: &str = "https://jobs.test/jobs?page=2";
    const P3: &str = "https://jobs.test/jobs?page=3";

    fn quick_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts).with_backoff(Duration::ZERO, Duration::ZERO)
    }

    async fn traverse(
        site: &FakeSite,
        engine: PaginationEngine,
        sink: &mut RecordSink,
    ) -> Result<TraversalReport> {
        let page = site.new_page().await.unwrap();
        page.goto(P1).await.unwrap();
        engine.run(page.as_ref(), P1, sink).await
    }

    fn data_rows(path: &std::path::Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(5), Duration::from_secs(8));
        assert_eq!(policy.backoff_for(40), Duration::from_secs(8));
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_stops_without_next_control() {
        let dir = TempDir::new("pagination-single");
        let site = FakeSite::new()
            .with_page(FakePage::new(P1).with_posts(vec![post("A", "One"), post("B", "Two")]));
        let mut sink = RecordSink::open(dir.join("jobs.csv"));

        let report = traverse(&site, PaginationEngine::new(), &mut sink)
            .await
            .unwrap();

        assert_eq!(
            report,
            TraversalReport {
                pages: 1,
                records: 2,
                stop_reason: StopReason::NoNextPage,
            }
        );
        // Only the initial goto.
        assert_eq!(site.navigation_count(), 1);
        assert!(!site
            .actions()
            .iter()
            .any(|a| matches!(a, DriverAction::Click(_))));
    }

    #[tokio::test]
    async fn test_follows_next_until_last_page() {
        let dir = TempDir::new("pagination-chain");
        let site = FakeSite::new()
            .with_page(FakePage::new(P1).with_posts(vec![post("A", "One")]).with_next(P2))
            .with_page(FakePage::new(P2).with_posts(vec![post("B", "Two")]).with_next(P3))
            .with_page(FakePage::new(P3).with_posts(vec![post("C", "Three")]));
        let mut sink = RecordSink::open(dir.join("jobs.csv"));

        let report = traverse(&site, PaginationEngine::new(), &mut sink)
            .await
            .unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.stop_reason, StopReason::NoNextPage);
        let rows = data_rows(sink.path());
        assert!(rows[0].starts_with("A,One"));
        assert!(rows[1].starts_with("B,Two"));
        assert!(rows[2].starts_with("C,Three"));
    }

    #[tokio::test]
    async fn test_repeated_url_detected_one_page_late() {
        let dir = TempDir::new("pagination-loop");
        let site = FakeSite::new()
            .with_page(FakePage::new(P1).with_posts(vec![post("A", "One")]).with_next(P2))
            .with_page(FakePage::new(P2).with_posts(vec![post("B", "Two")]).with_next(P2));
        let mut sink = RecordSink::open(dir.join("jobs.csv"));

        let report = traverse(&site, PaginationEngine::new(), &mut sink)
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::RepeatedPage);
        assert_eq!(report.pages, 3);
        assert_eq!(site.query_data_count(P1), 1);
        assert_eq!(site.query_data_count(P2), 2);
        assert_eq!(data_rows(sink.path()).len(), 3);

        // The repeat is recognised before clicking again.
        let clicks = site
            .actions()
            .iter()
            .filter(|a| matches!(a, DriverAction::Click(_)))
            .count();
        assert_eq!(clicks, 2);
    }

    #[tokio::test]
    async fn test_transient_query_failure_is_retried() {
        let clean_dir = TempDir::new("pagination-clean");
        let flaky_dir = TempDir::new("pagination-flaky");
        let script = |site: FakeSite| {
            site.with_page(FakePage::new(P1).with_posts(vec![post("A", "One")]).with_next(P2))
                .with_page(FakePage::new(P2).with_posts(vec![post("B", "Two")]))
        };

        let clean = script(FakeSite::new());
        let mut clean_sink = RecordSink::open(clean_dir.join("jobs.csv"));
        traverse(&clean, PaginationEngine::new(), &mut clean_sink)
            .await
            .unwrap();

        let flaky = script(FakeSite::new()).fail_queries(P2, 2);
        let mut flaky_sink = RecordSink::open(flaky_dir.join("jobs.csv"));
        let report = traverse(
            &flaky,
            PaginationEngine::new().with_retry(quick_retry(3)),
            &mut flaky_sink,
        )
        .await
        .unwrap();

        assert_eq!(report.records, 2);
        assert_eq!(flaky.query_data_count(P2), 3);
        assert_eq!(
            fs::read_to_string(flaky_sink.path()).unwrap(),
            fs::read_to_string(clean_sink.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_url() {
        let dir = TempDir::new("pagination-exhausted");
        let site = FakeSite::new()
            .with_page(FakePage::new(P1).with_posts(vec![post("A", "One")]))
            .fail_queries(P1, 5);
        let mut sink = RecordSink::open(dir.join("jobs.csv"));

        let err = traverse(
            &site,
            PaginationEngine::new().with_retry(quick_retry(3)),
            &mut sink,
        )
        .await
        .unwrap_err();

        match err {
            ScrapeError::FetchFailed { url, reason } => {
                assert_eq!(url, P1);
                assert!(reason.contains("after 3 attempts"));
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
        assert_eq!(site.query_data_count(P1), 3);
        assert!(!sink.path().exists());
    }

    #[tokio::test]
    async fn test_malformed_response_is_fetch_failure() {
        let dir = TempDir::new("pagination-malformed");
        let site = FakeSite::new()
            .with_page(FakePage::new(P1).with_response(json!({ "job_posts": "none" })));
        let mut sink = RecordSink::open(dir.join("jobs.csv"));

        let err = traverse(
            &site,
            PaginationEngine::new().with_retry(RetryPolicy::none()),
            &mut sink,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ScrapeError::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_ready_timeout_names_both_pages() {
        let dir = TempDir::new("pagination-ready");
        let site = FakeSite::new()
            .with_page(FakePage::new(P1).with_posts(vec![post("A", "One")]).with_next(P2))
            .with_page(FakePage::new(P2).with_posts(vec![post("B", "Two")]))
            .fail_ready(P2);
        let mut sink = RecordSink::open(dir.join("jobs.csv"));

        let err = traverse(&site, PaginationEngine::new(), &mut sink)
            .await
            .unwrap_err();

        match &err {
            ScrapeError::FetchFailed { url, reason } => {
                assert_eq!(url, P1);
                assert!(reason.contains("page 2"), "{reason}");
                assert!(reason.contains(P2), "{reason}");
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
        assert!(err.to_string().contains(P2));
        assert_eq!(data_rows(sink.path()).len(), 1);
        assert_eq!(site.query_data_count(P2), 0);
    }

    #[tokio::test]
    async fn test_page_limit() {
        let dir = TempDir::new("pagination-limit");
        let site = FakeSite::new()
            .with_page(FakePage::new(P1).with_posts(vec![post("A", "One")]).with_next(P2))
            .with_page(FakePage::new(P2).with_posts(vec![post("B", "Two")]).with_next(P3))
            .with_page(FakePage::new(P3).with_posts(vec![post("C", "Three")]));
        let mut sink = RecordSink::open(dir.join("jobs.csv"));

        let report = traverse(
            &site,
            PaginationEngine::new().with_max_pages(Some(2)),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(report.stop_reason, StopReason::PageLimit);
        assert_eq!(report.pages, 2);
        assert_eq!(site.query_data_count(P3), 0);
    }
}
