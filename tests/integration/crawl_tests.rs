//! Integration tests for the crawl loop
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use crate::common::{docs_page, mount_page, recording_coordinator, site_config};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use sumi_scroll::crawler::{link_priority, run_crawl, CrawlPhase, FetchedPage};
use sumi_scroll::RecoveryManager;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_docs_site_scenario() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());

    mount_page(
        &server,
        "/docs/",
        docs_page(
            "Docs",
            &[("/docs/intro", "Getting Started"), ("/docs/ref#anchor", "Reference")],
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/docs/intro",
        docs_page("Intro", &[("/docs/", "Home"), ("/docs/intro", "Getting Started")]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/ref"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // The intro link ranks ahead of a sibling without keywords
    let mut coordinator = recording_coordinator(&config);
    let root_page = FetchedPage {
        url: format!("{}/docs/", base),
        html: docs_page(
            "Docs",
            &[
                ("/docs/intro", "Getting Started"),
                ("/docs/ref#anchor", "Reference"),
                ("/docs/sibling", "Sibling"),
            ],
        ),
    };
    let links = coordinator.admissible_links(&root_page);
    let urls: Vec<&str> = links.iter().map(|(u, _)| u.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/docs/intro", base).as_str(),
            format!("{}/docs/sibling", base).as_str()
        ]
    );
    assert!(links[0].1 < links[1].1);

    // Crawl both pages
    let report = coordinator.run().await.unwrap();
    assert_eq!(coordinator.phase(), CrawlPhase::Drained);
    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.converted, 2);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(
        report.crawled,
        vec![format!("{}/docs/", base), format!("{}/docs/intro", base)]
    );

    // Save, reload and resume: nothing is fetched again
    let mut manager = RecoveryManager::new(&config);
    manager
        .save(&config.target.start_url, coordinator.state(), &[], true)
        .unwrap();
    let snapshot = manager.load().unwrap();
    assert_eq!(snapshot.processed_count, 2);

    let mut resumed = recording_coordinator(&config);
    resumed.restore(&snapshot);
    let report = resumed.run().await.unwrap();

    assert!(resumed.converter().seen.is_empty());
    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.failed, 0);
}

#[tokio::test]
async fn test_no_page_is_converted_twice() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.crawl.exclude_patterns.clear();

    mount_page(
        &server,
        "/docs/",
        docs_page(
            "Docs",
            &[
                ("/docs/a", "A"),
                ("/docs/a/", "A again"),
                ("/docs/a#top", "A top"),
                ("/docs/a?ref=nav", "A tracked"),
                ("/docs/b", "B"),
            ],
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/docs/a",
        docs_page("A", &[("/docs/", "Home"), ("/docs/b", "B"), ("/docs/a/", "Self")]),
        1,
    )
    .await;
    mount_page(
        &server,
        "/docs/b",
        docs_page("B", &[("/docs/a", "A"), ("/docs", "Home")]),
        1,
    )
    .await;

    let mut coordinator = recording_coordinator(&config);
    let report = coordinator.run().await.unwrap();

    let identities = coordinator.converter().seen_identities();
    let unique: HashSet<&String> = identities.iter().collect();
    assert_eq!(identities.len(), unique.len());
    assert_eq!(identities.len(), 3);
    assert_eq!(report.stats.fetched, 3);
    assert_eq!(coordinator.state().visited_count(), 3);
}

#[tokio::test]
async fn test_foreign_and_excluded_links_are_not_followed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.crawl.exclude_patterns = vec![
        ".*#.*".to_string(),
        r".*/search\.html".to_string(),
        "(broken".to_string(),
    ];

    mount_page(
        &server,
        "/docs/",
        docs_page(
            "Docs",
            &[
                ("https://elsewhere.test/docs/a", "Elsewhere"),
                ("/docs/search.html", "Search"),
                ("/docs/page#frag", "Fragment"),
                ("/docs/kept", "Kept"),
            ],
        ),
        1,
    )
    .await;
    mount_page(&server, "/docs/kept", docs_page("Kept", &[]), 1).await;
    Mock::given(method("GET"))
        .and(path("/docs/search.html"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = recording_coordinator(&config);
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stats.fetched, 2);
    assert_eq!(coordinator.converter().seen.len(), 2);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/docs/", docs_page("Docs", &[]), 1).await;

    let mut coordinator = recording_coordinator(&config);
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(
        coordinator.state().failure_count(&config.target.start_url),
        2
    );
}

#[tokio::test]
async fn test_terminal_status_is_not_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());

    mount_page(
        &server,
        "/docs/",
        docs_page("Docs", &[("/docs/missing", "Missing")]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = recording_coordinator(&config);
    let report = coordinator.run().await.unwrap();

    let missing = format!("{}/docs/missing", server.uri());
    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(coordinator.state().failure_count(&missing), 1);
    assert!(!coordinator.state().is_visited(&missing));
}

#[tokio::test]
async fn test_retries_stop_at_attempt_budget() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.retry.max_retries = 2;
    config.retry.skip_after_failures = 10;

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let mut coordinator = recording_coordinator(&config);
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.fetched, 0);
    assert!(report.auto_skipped.is_empty());
    assert_eq!(
        coordinator.state().failure_count(&config.target.start_url),
        3
    );
}

#[tokio::test]
async fn test_run_crawl_writes_markdown_and_cleans_up() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());

    mount_page(
        &server,
        "/docs/",
        docs_page("Docs", &[("/docs/guide/setup.html", "Setup")]),
        1,
    )
    .await;
    mount_page(&server, "/docs/guide/setup.html", docs_page("Setup", &[]), 1).await;

    let report = run_crawl(&config, None, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap();

    assert_eq!(report.stats.converted, 2);

    let output = dir.path().join("output");
    let root = fs::read_to_string(output.join("docs.md")).unwrap();
    assert!(root.contains("Content of Docs."));
    let setup = fs::read_to_string(output.join("docs/guide/setup.md")).unwrap();
    assert!(setup.contains("Content of Setup."));

    assert!(!RecoveryManager::new(&config).path().exists());
}

#[tokio::test]
async fn test_conversion_failure_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.extractor.content_selector = "article".to_string();

    mount_page(
        &server,
        "/docs/",
        docs_page("Docs", &[("/docs/next", "Next")]),
        1,
    )
    .await;
    mount_page(
        &server,
        "/docs/next",
        r#"<html><body><article><p>Only this one has an article.</p></article></body></html>"#
            .to_string(),
        1,
    )
    .await;

    let report = run_crawl(&config, None, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap();

    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.converted, 1);
    assert_eq!(report.stats.convert_failed, 1);
}

#[test]
fn test_keyword_priorities_on_real_paths() {
    let intro = Url::parse("http://127.0.0.1:8080/docs/intro").unwrap();
    let changelog = Url::parse("http://127.0.0.1:8080/docs/changelog").unwrap();

    assert!(link_priority(&intro, "Quickstart") < link_priority(&changelog, "Changelog"));
}
