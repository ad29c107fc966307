//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to stand in for the listing service and run the
//! full pipeline end-to-end on a virtual clock, so backoff and delays cost
//! no wall-clock time.

use listing_harvest::config::Config;
use listing_harvest::crawler::{Clock, Harvester, RunMode, SleepFuture, VirtualClock};
use listing_harvest::{RecencyFilter, SearchDimension, SortOrder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DETAIL_HTML: &str = r#"<html><body>
    <div class="show-more-less-html__markup"><p>Build reliable services.</p></div>
    <ul class="description__job-criteria-list">
        <li>
            <h3 class="description__job-criteria-subheader">Seniority level</h3>
            <span class="description__job-criteria-text">Entry level</span>
        </li>
        <li>
            <h3 class="description__job-criteria-subheader">Employment type</h3>
            <span class="description__job-criteria-text">Full-time</span>
        </li>
    </ul>
    <span class="num-applicants__caption">Be among the first 25 applicants</span>
</body></html>"#;

/// Search-results page holding cards for the given identifiers
fn listing_page(ids: impl IntoIterator<Item = u32>) -> String {
    let cards: String = ids
        .into_iter()
        .map(|id| {
            format!(
                r#"<li><div class="base-card">
                    <a class="base-card__full-link" href="https://jobs.example.com/jobs/view/engineer-{id}?refId=r{id}"></a>
                    <h3 class="base-search-card__title">Engineer {id}</h3>
                    <h4 class="base-search-card__subtitle">Company {id}</h4>
                    <span class="job-search-card__location">Colombo</span>
                    <time datetime="2024-01-15">1 day ago</time>
                </div></li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", cards)
}

fn empty_page() -> String {
    "<html><body></body></html>".to_string()
}

/// Configuration pointing at the mock server and a temporary output directory
fn test_config(server: &MockServer, output: &Path, fallback: &Path) -> Config {
    let mut config = Config::default();
    config.http.listing_endpoint = format!("{}/search", server.uri());
    config.http.detail_endpoint = format!("{}/detail/", server.uri());
    config.http.https_only = false;
    config.output.directory = output.display().to_string();
    config.output.fallback_directory = Some(fallback.display().to_string());
    config
}

async fn mount_detail(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/detail/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
        .mount(server)
        .await;
}

/// Header and data rows of the single CSV file in `dir`
fn read_output(dir: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("output directory exists")
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    assert_eq!(files.len(), 1, "expected exactly one CSV file");

    let mut reader = csv::Reader::from_path(&files[0]).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

async fn search_requests(server: &MockServer) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/search")
        .collect()
}

#[tokio::test]
async fn test_recent_last_week_quota_30() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("sortBy", "DD"))
        .and(query_param("f_TPR", "1,2,3,4,5,6,7"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=25)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(26..=30)))
        .expect(0)
        .mount(&server)
        .await;

    mount_detail(&server).await;

    let config = test_config(&server, output.path(), fallback.path());
    let mode = RunMode::Dimensions {
        quota: 30,
        dimensions: vec![SearchDimension::new(
            SortOrder::Recency,
            RecencyFilter::LastWeek,
        )],
    };
    let clock = Arc::new(VirtualClock::new());

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(clock.clone())
        .with_seed(7)
        .run()
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.listings_extracted, 25);
    assert_eq!(report.records_persisted, 25);
    assert_eq!(report.dimensions_exhausted, 1);
    assert!(!report.cancelled);

    let (header, rows) = read_output(output.path());
    assert_eq!(header.len(), 18);
    assert_eq!(header[16], "sort_method");
    assert_eq!(header[17], "time_filter");
    assert_eq!(rows.len(), 25);

    let first = &rows[0];
    assert_eq!(first[0], "1");
    assert_eq!(first[1], "Engineer 1");
    assert_eq!(first[4], "Entry level");
    assert_eq!(first[5], "Full-time");
    assert_eq!(first[6], "2024-01-15");
    assert_eq!(first[11], "Build reliable services.");
    assert_eq!(first[14], "Be among the first 25 applicants");
    assert_eq!(first[15], "https://jobs.example.com/jobs/view/engineer-1");
    assert_eq!(first[16], "recent");
    assert_eq!(first[17], "week");
    assert!(rows.iter().all(|row| row[0] != "job_id"));
}

#[tokio::test]
async fn test_rate_limited_page_is_retried_after_backoff() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=4)))
        .mount(&server)
        .await;

    mount_detail(&server).await;

    let config = test_config(&server, output.path(), fallback.path());
    let mode = RunMode::Simple {
        keywords: None,
        quota: 25,
    };
    let clock = Arc::new(VirtualClock::new());

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(clock.clone())
        .with_seed(11)
        .run()
        .await
        .unwrap();

    assert_eq!(report.rate_limited, 1);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.records_persisted, 4);

    // Same cursor twice, and a backoff of at least the base wait in between
    let requests = search_requests(&server).await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, requests[1].url);
    assert!(clock.sleeps().iter().any(|d| *d >= Duration::from_secs(60)));

    let (header, rows) = read_output(output.path());
    assert_eq!(header.len(), 16);
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn test_exhaustive_stops_after_three_empty_pages() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=3)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .mount(&server)
        .await;

    let mut config = test_config(&server, output.path(), fallback.path());
    config.output.fetch_details = false;

    let report = Harvester::new(config, RunMode::Exhaustive)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .run()
        .await
        .unwrap();

    let starts: Vec<String> = search_requests(&server)
        .await
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "start")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(starts, vec!["0", "25", "50", "75"]);

    assert_eq!(report.pages_fetched, 4);
    assert_eq!(report.records_persisted, 3);
    assert_eq!(report.dimensions_exhausted, 1);

    let (_, rows) = read_output(output.path());
    assert_eq!(rows.len(), 3);
    // Detail fetching disabled: criteria cells stay empty
    assert_eq!(rows[0][4], "");
}

#[tokio::test]
async fn test_simple_mode_sends_keywords_without_dimension_params() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("keywords", "rust developer"))
        .and(query_param("location", "Sri Lanka"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=2)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server, output.path(), fallback.path());
    config.output.fetch_details = false;
    let mode = RunMode::Simple {
        keywords: Some("rust developer".to_string()),
        quota: 10,
    };

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .run()
        .await
        .unwrap();
    assert_eq!(report.records_persisted, 2);

    let requests = search_requests(&server).await;
    assert_eq!(requests.len(), 1);
    let keys: Vec<String> = requests[0]
        .url
        .query_pairs()
        .map(|(k, _)| k.into_owned())
        .collect();
    assert_eq!(keys, vec!["keywords", "location", "start"]);
}

#[tokio::test]
async fn test_failed_pages_are_skipped_then_dimension_aborts() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(&server, output.path(), fallback.path());
    let mode = RunMode::Simple {
        keywords: None,
        quota: 250,
    };

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .run()
        .await
        .unwrap();

    // Three consecutive failures at start=0, 25, 50
    assert_eq!(report.pages_failed, 3);
    assert_eq!(report.dimensions_aborted, 1);
    assert_eq!(report.rate_limited, 0);
    assert_eq!(search_requests(&server).await.len(), 3);

    // The file was created at start and holds only the header
    let (header, rows) = read_output(output.path());
    assert_eq!(header[0], "job_id");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_detail_failure_keeps_listing_fields() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(7..=7)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/detail/7"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server, output.path(), fallback.path());
    let mode = RunMode::Simple {
        keywords: None,
        quota: 1,
    };

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.details_failed, 1);
    assert_eq!(report.records_persisted, 1);

    let (_, rows) = read_output(output.path());
    assert_eq!(rows[0][0], "7");
    assert_eq!(rows[0][1], "Engineer 7");
    assert_eq!(rows[0][4], "");
    assert_eq!(rows[0][11], "");
}

#[tokio::test]
async fn test_rate_limited_detail_is_retried() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(3..=3)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/detail/3"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    mount_detail(&server).await;

    let config = test_config(&server, output.path(), fallback.path());
    let mode = RunMode::Simple {
        keywords: None,
        quota: 1,
    };
    let clock = Arc::new(VirtualClock::new());

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(clock.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.rate_limited, 1);
    assert_eq!(report.details_failed, 0);
    assert!(clock.total_slept() >= Duration::from_secs(60));

    let (_, rows) = read_output(output.path());
    assert_eq!(rows[0][5], "Full-time");
}

#[tokio::test]
async fn test_detail_worker_pool_shares_backoff_and_writer() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=8)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/detail/5"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    mount_detail(&server).await;

    let mut config = test_config(&server, output.path(), fallback.path());
    config.output.detail_workers = 4;
    let mode = RunMode::Simple {
        keywords: None,
        quota: 8,
    };
    let clock = Arc::new(VirtualClock::new());

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(clock.clone())
        .with_seed(3)
        .run()
        .await
        .unwrap();

    assert_eq!(report.listings_extracted, 8);
    assert_eq!(report.records_persisted, 8);
    assert_eq!(report.rate_limited, 1);
    assert_eq!(report.details_failed, 0);
    assert!(clock.sleeps().iter().any(|d| *d >= Duration::from_secs(60)));

    let detail_requests: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p.starts_with("/detail/"))
        .collect();
    assert_eq!(detail_requests.len(), 9);
    assert_eq!(detail_requests.iter().filter(|p| *p == "/detail/5").count(), 2);

    let (_, rows) = read_output(output.path());
    let mut ids: Vec<u32> = rows.iter().map(|row| row[0].parse().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    assert!(rows.iter().all(|row| row[5] == "Full-time"));
}

#[tokio::test]
async fn test_relevant_unbounded_dimension_sends_sort_code() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("sortBy", "R"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=2)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server, output.path(), fallback.path());
    config.output.fetch_details = false;
    let mode = RunMode::Dimensions {
        quota: 10,
        dimensions: vec![SearchDimension::new(
            SortOrder::Relevance,
            RecencyFilter::Unbounded,
        )],
    };

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .run()
        .await
        .unwrap();
    assert_eq!(report.records_persisted, 2);

    let requests = search_requests(&server).await;
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].url.query_pairs().any(|(k, _)| k == "f_TPR"));

    let (_, rows) = read_output(output.path());
    assert_eq!(rows[0][16], "relevant");
    assert_eq!(rows[0][17], "any");
}

/// Virtual clock that requests cancellation the first time anything sleeps
struct CancellingClock {
    inner: VirtualClock,
    token: CancellationToken,
}

impl Clock for CancellingClock {
    fn now(&self) -> Duration {
        self.inner.now()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        self.token.cancel();
        self.inner.sleep(duration)
    }
}

#[tokio::test]
async fn test_cancellation_flushes_buffered_records() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=5)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(6..=10)))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server, output.path(), fallback.path());
    config.output.fetch_details = false;
    let token = CancellationToken::new();
    let clock = Arc::new(CancellingClock {
        inner: VirtualClock::new(),
        token: token.clone(),
    });
    let mode = RunMode::Simple {
        keywords: None,
        quota: 75,
    };

    // The page delay before the second page triggers the cancellation
    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(clock)
        .with_cancellation(token)
        .run()
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.dimensions_aborted, 1);
    assert_eq!(report.records_persisted, 5);

    let (_, rows) = read_output(output.path());
    assert_eq!(rows.len(), 5);
}

#[tokio::test]
async fn test_cancelled_before_start_still_creates_file() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    let config = test_config(&server, output.path(), fallback.path());
    let token = CancellationToken::new();
    token.cancel();

    let report = Harvester::new(config, RunMode::Exhaustive)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .with_cancellation(token)
        .run()
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.records_persisted, 0);
    assert!(search_requests(&server).await.is_empty());

    let (header, rows) = read_output(output.path());
    assert_eq!(header.len(), 16);
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_unwritable_destinations_fail_the_run() {
    let server = MockServer::start().await;
    let scratch = TempDir::new().unwrap();

    // Regular files where directories are expected
    let output = scratch.path().join("output");
    let fallback = scratch.path().join("fallback");
    std::fs::write(&output, "").unwrap();
    std::fs::write(&fallback, "").unwrap();

    let config = test_config(&server, &output, &fallback);
    let result = Harvester::new(config, RunMode::Exhaustive)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .run()
        .await;

    assert!(result.is_err());
    assert!(search_requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_primary_failure_falls_back() {
    let server = MockServer::start().await;
    let scratch = TempDir::new().unwrap();
    let fallback = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1..=2)))
        .mount(&server)
        .await;

    let output = scratch.path().join("output");
    std::fs::write(&output, "").unwrap();

    let mut config = test_config(&server, &output, fallback.path());
    config.output.fetch_details = false;
    let mode = RunMode::Simple {
        keywords: None,
        quota: 1,
    };

    let report = Harvester::new(config, mode)
        .unwrap()
        .with_clock(Arc::new(VirtualClock::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.records_persisted, 2);
    let written = report.output_path.unwrap();
    assert!(written.starts_with(fallback.path()));

    let (_, rows) = read_output(fallback.path());
    assert_eq!(rows.len(), 2);
}
