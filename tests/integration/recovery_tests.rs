//! Integration tests for checkpointing and resume

use crate::common::{client, docs_page, mount_page, recording_coordinator, site_config, RecordingConverter};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sumi_scroll::crawler::{run_crawl, CrawlPhase, Coordinator, FetchFailure};
use sumi_scroll::output::format_summary;
use sumi_scroll::recovery::{PendingUrl, RecoveryError};
use sumi_scroll::{RecoveryManager, Resume, ScrollError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_interrupted_crawl_forces_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.recovery.save_interval = 100;

    mount_page(
        &server,
        "/docs/",
        docs_page("Docs", &[("/docs/a", "A"), ("/docs/b", "B")]),
        1,
    )
    .await;
    mount_page(&server, "/docs/a", docs_page("A", &[]), 0).await;
    mount_page(&server, "/docs/b", docs_page("B", &[]), 0).await;

    let cancel = Arc::new(AtomicBool::new(false));
    let converter = RecordingConverter::cancelling_after(1, Arc::clone(&cancel));
    let mut coordinator = Coordinator::new(&config, client(&config), converter)
        .unwrap()
        .with_recovery(RecoveryManager::new(&config))
        .with_cancel_flag(cancel);

    let result = coordinator.run().await;
    assert!(matches!(result, Err(ScrollError::Interrupted { processed: 1 })));
    assert_eq!(coordinator.phase(), CrawlPhase::Interrupted);

    // The interval was never reached, so only the forced save wrote this
    let manager = RecoveryManager::new(&config);
    let snapshot = manager.load().unwrap();
    assert_eq!(snapshot.processed_count, 1);
    assert_eq!(snapshot.visited_urls, vec![config.target.start_url.clone()]);
    assert_eq!(snapshot.crawled_urls, vec![config.target.start_url.clone()]);
    assert_eq!(
        snapshot.pending_urls,
        vec![
            PendingUrl {
                url: format!("{}/docs/a", server.uri()),
                priority: 12,
            },
            PendingUrl {
                url: format!("{}/docs/b", server.uri()),
                priority: 12,
            },
        ]
    );
}

#[tokio::test]
async fn test_resume_after_interrupt_finishes_remaining_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());

    mount_page(
        &server,
        "/docs/",
        docs_page("Docs", &[("/docs/a", "A"), ("/docs/b", "B")]),
        1,
    )
    .await;
    mount_page(&server, "/docs/a", docs_page("A", &[("/docs/", "Home")]), 1).await;
    mount_page(&server, "/docs/b", docs_page("B", &[("/docs/a", "A")]), 1).await;

    // First run stops after the start page
    let cancel = Arc::new(AtomicBool::new(false));
    let converter = RecordingConverter::cancelling_after(1, Arc::clone(&cancel));
    let mut first = Coordinator::new(&config, client(&config), converter)
        .unwrap()
        .with_recovery(RecoveryManager::new(&config))
        .with_cancel_flag(cancel);
    assert!(matches!(
        first.run().await,
        Err(ScrollError::Interrupted { processed: 1 })
    ));

    // Second run picks up the saved frontier
    let snapshot = RecoveryManager::new(&config).load().unwrap();
    let mut resumed =
        recording_coordinator(&config).with_recovery(RecoveryManager::new(&config));
    resumed.restore(&snapshot);
    let report = resumed.run().await.unwrap();

    let base = server.uri();
    assert_eq!(
        resumed.converter().seen,
        vec![format!("{}/docs/a", base), format!("{}/docs/b", base)]
    );
    assert_eq!(report.stats.fetched, 3);
    assert_eq!(report.stats.converted, 3);
    assert_eq!(
        report.crawled,
        vec![
            format!("{}/docs/", base),
            format!("{}/docs/a", base),
            format!("{}/docs/b", base)
        ]
    );
    assert!(!RecoveryManager::new(&config).path().exists());
}

#[tokio::test]
async fn test_cancel_during_backoff_requeues_url() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.retry.initial_delay = 30.0;
    config.retry.max_delay = 30.0;

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator =
        recording_coordinator(&config).with_recovery(RecoveryManager::new(&config));
    let flag = coordinator.cancel_flag();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        flag.store(true, Ordering::SeqCst);
    });

    let result = tokio::time::timeout(Duration::from_secs(10), coordinator.run())
        .await
        .expect("backoff wait ignored the cancel flag");
    assert!(matches!(result, Err(ScrollError::Interrupted { processed: 0 })));
    assert_eq!(coordinator.state().stats.failed, 0);
    assert_eq!(coordinator.queue_len(), 1);

    let snapshot = RecoveryManager::new(&config).load().unwrap();
    assert_eq!(
        snapshot.pending_urls,
        vec![PendingUrl {
            url: config.target.start_url.clone(),
            priority: 0,
        }]
    );
    assert_eq!(snapshot.failed_url_counts[&config.target.start_url], 1);
}

#[tokio::test]
async fn test_failed_checkpoint_writes_are_counted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());

    // The checkpoint's parent is a regular file, so every write and the final
    // delete fail
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    config.recovery.recovery_file = blocker
        .join("recovery_state.json")
        .to_string_lossy()
        .into_owned();

    mount_page(&server, "/docs/", docs_page("Docs", &[("/docs/a", "A")]), 1).await;
    mount_page(&server, "/docs/a", docs_page("A", &[]), 1).await;

    let mut coordinator =
        recording_coordinator(&config).with_recovery(RecoveryManager::new(&config));
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.persistence_errors, 3);
    assert!(format_summary(&report).contains("Checkpoint persistence: 3"));
}

#[tokio::test]
async fn test_image_download_failures_are_counted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());
    assert!(config.output.download_images);

    mount_page(
        &server,
        "/docs/",
        r#"<html><body><nav></nav><main><p>Diagram:</p>
            <img src="/static/missing.png"><img src="/static/gone.svg">
        </main></body></html>"#
            .to_string(),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/static/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/gone.svg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let report = run_crawl(&config, None, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap();

    assert_eq!(report.stats.converted, 1);
    assert_eq!(report.stats.image_failures, 2);
    assert!(format_summary(&report).contains("Image downloads: 2"));
}

#[tokio::test]
async fn test_disabled_recovery_writes_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.recovery.enable_recovery = false;

    mount_page(&server, "/docs/", docs_page("Docs", &[("/docs/a", "A")]), 1).await;
    mount_page(&server, "/docs/a", docs_page("A", &[]), 0).await;

    let cancel = Arc::new(AtomicBool::new(false));
    let converter = RecordingConverter::cancelling_after(1, Arc::clone(&cancel));
    let mut coordinator = Coordinator::new(&config, client(&config), converter)
        .unwrap()
        .with_recovery(RecoveryManager::new(&config))
        .with_cancel_flag(cancel);

    assert!(coordinator.run().await.is_err());

    let manager = RecoveryManager::new(&config);
    assert_eq!(manager.inspect(), Resume::Disabled);
    assert!(!manager.path().exists());
}

#[tokio::test]
async fn test_auto_skip_survives_resume() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = site_config(&server, dir.path());
    config.retry.max_retries = 5;
    config.retry.skip_after_failures = 3;

    mount_page(
        &server,
        "/docs/",
        docs_page("Docs", &[("/docs/flaky", "Flaky")]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let flaky = format!("{}/docs/flaky", server.uri());

    // First run: the threshold is reached mid-call and the call stops there
    let mut coordinator = recording_coordinator(&config);
    let report = coordinator.run().await.unwrap();
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.auto_skipped, vec![flaky.clone()]);

    let mut manager = RecoveryManager::new(&config);
    manager
        .save(&config.target.start_url, coordinator.state(), &[], true)
        .unwrap();

    // Second run: the restored counter keeps the URL out
    let mut resumed = recording_coordinator(&config);
    resumed.restore(&manager.load().unwrap());
    assert_eq!(
        resumed.fetch(&flaky).await.unwrap_err(),
        FetchFailure::AutoSkipped
    );

    resumed.enqueue(flaky.clone(), 1);
    let report = resumed.run().await.unwrap();
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.skipped, 2);
    assert_eq!(report.auto_skipped, vec![flaky.clone()]);
    assert_eq!(resumed.state().failure_count(&flaky), 3);
}

#[tokio::test]
async fn test_changed_crawl_config_rejects_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());

    mount_page(&server, "/docs/", docs_page("Docs", &[]), 1).await;

    let mut coordinator = recording_coordinator(&config);
    coordinator.run().await.unwrap();
    let mut manager = RecoveryManager::new(&config);
    manager
        .save(&config.target.start_url, coordinator.state(), &[], true)
        .unwrap();
    assert!(manager.can_resume());

    let mut other_domain = config.clone();
    other_domain.target.allowed_domain = "https://docs.other.test".to_string();
    let other = RecoveryManager::new(&other_domain);
    assert!(matches!(other.inspect(), Resume::ConfigMismatch { .. }));
    assert!(matches!(
        other.load(),
        Err(RecoveryError::ChecksumMismatch { .. })
    ));

    let mut other_patterns = config.clone();
    other_patterns.crawl.exclude_patterns.push("/private/".to_string());
    assert!(!RecoveryManager::new(&other_patterns).can_resume());

    let mut slower = config.clone();
    slower.execution.request_delay = 5.0;
    assert!(RecoveryManager::new(&slower).can_resume());
}

#[tokio::test]
async fn test_cancel_flag_set_externally_stops_between_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = site_config(&server, dir.path());

    mount_page(&server, "/docs/", docs_page("Docs", &[]), 0).await;

    let mut coordinator = recording_coordinator(&config).with_recovery(RecoveryManager::new(&config));
    coordinator.cancel_flag().store(true, Ordering::SeqCst);

    let result = coordinator.run().await;
    assert!(matches!(result, Err(ScrollError::Interrupted { processed: 0 })));

    let snapshot = RecoveryManager::new(&config).load().unwrap();
    assert_eq!(snapshot.processed_count, 0);
    assert!(snapshot.visited_urls.is_empty());
}
