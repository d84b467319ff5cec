//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small copy of the listing site and run
//! full search sessions against it with both sinks.

use profesia_crawler::config::Config;
use profesia_crawler::crawler::{crawl, run_continuous, SessionOutcome};
use profesia_crawler::state::HaltReason;
use profesia_crawler::storage::{DedupStore, SinkBackend};
use profesia_crawler::CrawlerError;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TITLE: &str = "Test Jobs | Práca";

/// Creates a test configuration pointing at the mock site
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}/", base_url);
    config.site.expected_title = TITLE.to_string();
    config.timing.settle_delay_ms = 0;
    config.timing.page_load_timeout_secs = 5;
    config.store.database_path = dir.join("listings.db").display().to_string();
    config.table.output_dir = dir.join("tables").display().to_string();
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0.0".to_string();
    config
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn listing(offer_id: &str, info: &str, salary: Option<&str>) -> String {
    let salary = salary
        .map(|s| format!(r#"<a data-dimension7="Salary label" href="/mzdy">{}</a>"#, s))
        .unwrap_or_default();
    format!(
        r#"<li class="list-row">
            <h2><a id="{id}" class="title" href="/praca/acme/{id}">Developer {id}</a></h2>
            <span class="employer">ACME {id}</span>
            <span class="job-location">Bratislava</span>
            <span class="label-group">{salary}</span>
            <span class="info">{info}</span>
        </li>"#,
        id = offer_id,
        salary = salary,
        info = info
    )
}

fn results_page(rows: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<li><a class="next" href="{}">Ďalej</a></li>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>Výsledky</title></head><body>
        <div class="row"><div class="col-xs-8"><h1>Ponuky práce <span>(42)</span></h1></div></div>
        <main class="col-sm-6"><ul class="list">{}</ul></main>
        <aside><ul><li class="list-row">Promoted, not a listing</li></ul></aside>
        <ul class="pagination">{}</ul>
        </body></html>"#,
        rows.join("\n"),
        next
    )
}

/// Mounts the landing page and the result pages for "rust"
///
/// Page 1 is the search result; page N > 1 lives at `/praca/N/`.
async fn mount_site(server: &MockServer, pages: Vec<Vec<String>>) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestBot/1.0.0"))
        .respond_with(html(format!(
            r#"<html><head><title>{}</title></head><body>
            <div id="CybotCookiebotDialog"><button id="CybotCookiebotDialogBodyButtonDecline">Odmietnuť</button></div>
            <form action="/praca/" method="get">
                <input type="hidden" name="search_anywhere_form" value="1">
                <input id="offerCriteriaSuggesterInputId" name="search_anywhere" type="text">
                <a id="offer-search-link" href="/praca/">Hľadať</a>
            </form>
            </body></html>"#,
            TITLE
        )))
        .mount(server)
        .await;

    let count = pages.len();
    for (index, rows) in pages.into_iter().enumerate() {
        let number = index + 1;
        let next = (number < count).then(|| format!("/praca/{}/?search_anywhere=rust", number + 1));
        let body = results_page(&rows, next.as_deref());

        let mock = if number == 1 {
            Mock::given(method("GET"))
                .and(path("/praca/"))
                .and(query_param("search_anywhere", "rust"))
                .and(query_param("search_anywhere_form", "1"))
        } else {
            Mock::given(method("GET")).and(path(format!("/praca/{}/", number)))
        };
        mock.respond_with(html(body)).mount(server).await;
    }
}

/// Number of requests the server received for `request_path`
async fn requests_for(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

fn completed(outcome: SessionOutcome) -> profesia_crawler::crawler::CrawlReport {
    match outcome {
        SessionOutcome::Completed(report) => report,
        SessionOutcome::NoResults => panic!("expected results"),
    }
}

#[tokio::test]
async fn test_dedup_store_indexes_then_stops_at_known_listings() {
    let server = MockServer::start().await;
    mount_site(
        &server,
        vec![
            vec![
                listing("O1", "Nová ponuka", Some("2 500 EUR/mesiac")),
                listing("O2", "Včera", None),
            ],
            vec![listing("O3", "Pred 2 dňami", None)],
        ],
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    // First run walks every page
    let report = completed(
        crawl(&config, "rust", SinkBackend::DedupStore)
            .await
            .unwrap(),
    );
    assert_eq!(report.persisted, 3);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.halt, Some(HaltReason::LastPage));
    assert_eq!(requests_for(&server, "/praca/2/").await, 1);

    // Second run over the same listings stops at the first row
    let report = completed(
        crawl(&config, "rust", SinkBackend::DedupStore)
            .await
            .unwrap(),
    );
    assert_eq!(report.persisted, 0);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(
        report.halt,
        Some(HaltReason::StaleDuplicate {
            offer_id: "O1".to_string()
        })
    );
    assert_eq!(requests_for(&server, "/praca/2/").await, 1);

    let store = DedupStore::open(Path::new(&config.store.database_path)).unwrap();
    assert_eq!(store.keywords().unwrap(), vec!["rust"]);
    assert_eq!(store.members("rust").unwrap(), vec!["O1", "O2", "O3"]);
    assert_eq!(store.count_records().unwrap(), 3);

    let record = store.load_record("O1").unwrap().unwrap();
    assert_eq!(record.offer_link, format!("{}/praca/acme/O1", server.uri()));
    assert_eq!(record.job_title, "Developer O1");
    assert_eq!(record.employer, "ACME O1");
    assert_eq!(record.job_location, "Bratislava");
    assert_eq!(record.salary.as_deref(), Some("2 500 EUR/mesiac"));
    assert_eq!(record.info, vec!["Nová", "ponuka"]);

    let record = store.load_record("O2").unwrap().unwrap();
    assert_eq!(record.salary, None);
}

#[tokio::test]
async fn test_updated_listing_does_not_stop_the_crawl() {
    let dir = TempDir::new().unwrap();

    // Yesterday's run
    let first = MockServer::start().await;
    mount_site(
        &first,
        vec![vec![listing("A", "Včera", None), listing("B", "Včera", None)]],
    )
    .await;
    let config = create_test_config(&first.uri(), dir.path());
    crawl(&config, "rust", SinkBackend::DedupStore)
        .await
        .unwrap();

    // Today A was updated and bumped to the top, C and D are new, B is known
    let second = MockServer::start().await;
    mount_site(
        &second,
        vec![
            vec![
                listing("A", "Aktualizované dnes", None),
                listing("C", "Nová ponuka", None),
            ],
            vec![
                listing("D", "Nová ponuka", None),
                listing("B", "Včera", None),
                listing("E", "Pred týždňom", None),
            ],
            vec![listing("F", "Pred mesiacom", None)],
        ],
    )
    .await;
    let config = create_test_config(&second.uri(), dir.path());

    let report = completed(
        crawl(&config, "rust", SinkBackend::DedupStore)
            .await
            .unwrap(),
    );

    assert_eq!(report.persisted, 2);
    assert_eq!(report.fresh_duplicates, 1);
    assert_eq!(
        report.halt,
        Some(HaltReason::StaleDuplicate {
            offer_id: "B".to_string()
        })
    );
    assert_eq!(requests_for(&second, "/praca/3/").await, 0);

    let store = DedupStore::open(Path::new(&config.store.database_path)).unwrap();
    assert_eq!(store.members("rust").unwrap(), vec!["A", "B", "C", "D"]);
    assert!(store.load_record("E").unwrap().is_none());
}

#[tokio::test]
async fn test_append_only_table_reindexes_every_run() {
    let server = MockServer::start().await;
    mount_site(
        &server,
        vec![
            vec![
                listing("O1", "Včera", Some("1 200 EUR")),
                r#"<li class="list-row"><h2><a href="/ad">Sponsored</a></h2></li>"#.to_string(),
            ],
            vec![listing("O2", "Včera", None)],
        ],
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    for _ in 0..2 {
        let report = completed(
            crawl(&config, "rust", SinkBackend::AppendOnlyTable)
                .await
                .unwrap(),
        );
        assert_eq!(report.persisted, 2);
        assert_eq!(report.malformed_rows, 1);
        assert_eq!(report.halt, Some(HaltReason::LastPage));
    }

    let tables: Vec<_> = std::fs::read_dir(&config.table.output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(tables.len(), 1);
    let file_name = tables[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.ends_with(" rust.csv"), "unexpected file {}", file_name);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(&tables[0])
        .unwrap();
    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();

    assert_eq!(rows.len(), 1 + 4);
    assert_eq!(
        rows[0],
        vec!["offer_id", "offer_link", "employer", "job_title", "job_location", "salary", "info"]
    );
    assert_eq!(rows[1][0], "O1");
    assert_eq!(rows[1][5], "1 200 EUR");
    assert_eq!(rows[1][6], "Včera");
    assert_eq!(rows[2][0], "O2");
    assert_eq!(rows[2][5], "");
    assert_eq!(rows[3], rows[1]);
}

#[tokio::test]
async fn test_no_results_ends_session_cleanly() {
    let server = MockServer::start().await;
    mount_site(&server, vec![]).await;

    Mock::given(method("GET"))
        .and(path("/praca/"))
        .respond_with(html(
            r#"<html><head><title>Výsledky</title></head><body>
            <p class="no-results">Nenašli sme žiadne ponuky</p></body></html>"#
                .to_string(),
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let outcome = crawl(&config, "rust", SinkBackend::DedupStore)
        .await
        .unwrap();
    assert_eq!(outcome, SessionOutcome::NoResults);

    let store = DedupStore::open(Path::new(&config.store.database_path)).unwrap();
    assert!(store.keywords().unwrap().is_empty());
}

#[tokio::test]
async fn test_unexpected_landing_title_aborts_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "<html><head><title>Údržba</title></head><body></body></html>".to_string(),
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let err = crawl(&config, "rust", SinkBackend::AppendOnlyTable)
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlerError::Environment(_)));
    assert_eq!(requests_for(&server, "/praca/").await, 0);
    assert!(!dir.path().join("tables").exists());
}

#[tokio::test]
async fn test_landing_page_http_error_is_driver_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let err = crawl(&config, "rust", SinkBackend::DedupStore)
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlerError::Driver(_)));
}

#[tokio::test]
async fn test_unreachable_store_aborts_before_browsing() {
    let server = MockServer::start().await;
    mount_site(&server, vec![vec![listing("O1", "Včera", None)]]).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path());
    config.store.database_path = dir
        .path()
        .join("missing")
        .join("listings.db")
        .display()
        .to_string();

    let err = crawl(&config, "rust", SinkBackend::DedupStore)
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlerError::Sink(_)));
    assert_eq!(requests_for(&server, "/").await, 0);
}

#[tokio::test]
async fn test_continuous_mode_retries_after_failed_session() {
    let server = MockServer::start().await;

    // The first landing request fails, later ones reach the site
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_site(
        &server,
        vec![vec![listing("O1", "Včera", None), listing("O2", "Včera", None)]],
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path());
    config.timing.continuous_delay_secs = 1;

    let started = Instant::now();
    let failed = run_continuous(&config, "rust", SinkBackend::DedupStore, Some(2)).await;

    assert_eq!(failed, 1);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(requests_for(&server, "/").await, 2);
    assert_eq!(requests_for(&server, "/praca/").await, 1);

    let store = DedupStore::open(Path::new(&config.store.database_path)).unwrap();
    assert_eq!(store.members("rust").unwrap(), vec!["O1", "O2"]);
}

#[tokio::test]
async fn test_next_page_cycle_ends_the_walk() {
    let server = MockServer::start().await;
    mount_site(&server, vec![]).await;

    // Page 2 links back to the first result page
    Mock::given(method("GET"))
        .and(path("/praca/"))
        .and(query_param("search_anywhere", "rust"))
        .respond_with(html(results_page(
            &[listing("O1", "Včera", None)],
            Some("/praca/2/?search_anywhere=rust"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/praca/2/"))
        .respond_with(html(results_page(
            &[listing("O2", "Včera", None)],
            Some("/praca/?search_anywhere_form=1&search_anywhere=rust"),
        )))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let report = completed(
        crawl(&config, "rust", SinkBackend::AppendOnlyTable)
            .await
            .unwrap(),
    );

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.persisted, 2);
    assert_eq!(report.halt, Some(HaltReason::LastPage));
    assert_eq!(requests_for(&server, "/praca/").await, 1);
}
