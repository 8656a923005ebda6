//! Integration tests for the collector
//!
//! These tests use wiremock to create mock HTTP servers and run full
//! collection cycles end-to-end against a SQLite file store.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use endpoint_collector::config::{parse_config, Config};
use endpoint_collector::endpoint::{build_catalog, EndpointDescriptor};
use endpoint_collector::storage::{RawEvent, RequestOutcome, SqliteStorage, Storage};
use endpoint_collector::{run_collection, Coordinator};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with fast pacing and a tiny backoff
fn create_test_config(base_url: &str, db_path: &Path, endpoints: &[(&str, &str)]) -> Config {
    let mut toml = format!(
        r#"
[collector]
base-url = "{}"
user-agent = "TestCollector/1.0 (public-only)"
timeout-secs = 2.0
max-concurrency = 4
requests-per-second = 200.0
max-retries = 6

[backoff]
base-secs = 0.01
cap-secs = 0.05
jitter-ratio = 0.25

[storage]
database-path = "{}"
"#,
        base_url,
        db_path.display()
    );

    for (name, template) in endpoints {
        toml.push_str(&format!(
            "\n[[endpoint]]\nname = \"{}\"\npath-template = \"{}\"\n",
            name, template
        ));
    }

    parse_config(&toml).expect("test config should be valid")
}

fn temp_db() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("collector.sqlite");
    (dir, db_path)
}

fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Utc::now();
    (now - ChronoDuration::hours(1), now + ChronoDuration::hours(1))
}

fn all_rows(storage: &dyn Storage) -> (Vec<RequestOutcome>, Vec<RawEvent>) {
    let (from, to) = window();
    (
        storage.outcomes_between(from, to).expect("outcomes query"),
        storage.events_between(from, to).expect("events query"),
    )
}

#[tokio::test]
async fn test_retries_server_errors_until_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/public/trending"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/public/trending"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"posts":[1,2,3]}"#))
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(
        &mock_server.uri(),
        &db_path,
        &[("trending", "/api/public/trending")],
    );

    let summary = run_collection(config).await.expect("collection should succeed");
    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);

    // Reopen the file to check what was persisted
    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen store");
    let (outcomes, events) = all_rows(&storage);

    assert_eq!(outcomes.len(), 3);
    let statuses: Vec<_> = outcomes.iter().map(|o| o.status_code).collect();
    assert_eq!(statuses, vec![Some(500), Some(500), Some(200)]);
    assert_eq!(outcomes.iter().map(|o| o.attempt).max(), Some(3));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].endpoint_name, "trending");
    assert_eq!(events[0].url, format!("{}/api/public/trending", mock_server.uri()));
    assert_eq!(events[0].payload_json, r#"{"posts":[1,2,3]}"#);
}

#[tokio::test]
async fn test_forbidden_is_recorded_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/private"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&mock_server.uri(), &db_path, &[("private", "/api/private")]);
    let catalog = build_catalog(&config);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    let summary = coordinator.run(&catalog).await.expect("run should complete");
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);

    let (outcomes, events) = all_rows(coordinator.storage().as_ref());
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status_code, Some(403));
    assert_eq!(outcomes[0].error.as_deref(), Some("auth_status:403"));
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not-json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&mock_server.uri(), &db_path, &[("broken", "/api/broken")]);
    let catalog = build_catalog(&config);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    let summary = coordinator.run(&catalog).await.expect("run should complete");
    assert_eq!(summary.failed, 1);

    let (outcomes, events) = all_rows(coordinator.storage().as_ref());
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status_code, Some(200));
    assert!(outcomes[0]
        .error
        .as_deref()
        .map_or(false, |e| e.starts_with("parse_failure:")));
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_concurrency_cap_bounds_wall_time() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut config = create_test_config(&mock_server.uri(), &db_path, &[("seed", "/seed")]);
    config.collector.max_concurrency = 2;
    config.collector.requests_per_second = 1000.0;

    let catalog: Vec<_> = (0..10)
        .map(|i| EndpointDescriptor::new(format!("ep-{}", i), format!("/ep/{}", i)))
        .collect();
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    let start = Instant::now();
    let summary = coordinator.run(&catalog).await.expect("run should complete");
    let elapsed = start.elapsed();

    assert_eq!(summary.succeeded, 10);
    // 10 requests of 100ms, at most 2 in flight
    assert!(elapsed >= Duration::from_millis(500), "finished in {:?}", elapsed);
}

#[tokio::test]
async fn test_row_invariants_across_mixed_endpoints() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1]"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"v":2}"#))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut config = create_test_config(
        &mock_server.uri(),
        &db_path,
        &[
            ("ok", "/ok"),
            ("flaky", "/flaky"),
            ("busy", "/busy"),
            ("missing", "/missing"),
            ("unresolved", "/items/{id}"),
        ],
    );
    config.collector.max_retries = 3;
    let max_retries = config.collector.max_retries;

    let catalog = build_catalog(&config);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let summary = coordinator.run(&catalog).await.expect("run should complete");

    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 1);

    let (outcomes, events) = all_rows(coordinator.storage().as_ref());

    for name in ["ok", "flaky", "busy", "missing"] {
        let rows: Vec<_> = outcomes.iter().filter(|o| o.endpoint_name == name).collect();
        let count = rows.len() as u32;
        assert!((1..=max_retries).contains(&count), "{} has {} rows", name, count);

        // Row count equals the final attempt number
        let last_attempt = rows.iter().map(|o| o.attempt).max().unwrap_or(0);
        assert_eq!(count, last_attempt, "{}", name);

        // A successful attempt implies exactly one matching event
        let success = rows.iter().find(|o| o.is_success());
        let matching_events: Vec<_> = events.iter().filter(|e| e.endpoint_name == name).collect();
        match success {
            Some(row) => {
                assert_eq!(matching_events.len(), 1, "{}", name);
                assert_eq!(matching_events[0].url, row.url);
            }
            None => assert!(matching_events.is_empty(), "{}", name),
        }
    }

    let busy = outcomes.iter().filter(|o| o.endpoint_name == "busy").count();
    assert_eq!(busy, max_retries as usize);
    assert!(outcomes.iter().all(|o| o.endpoint_name != "unresolved"));
}

#[tokio::test]
async fn test_sends_configured_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("user-agent", "TestCollector/1.0 (public-only)"))
        .and(header("authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut config = create_test_config(&mock_server.uri(), &db_path, &[("feed", "/feed")]);
    config.auth = Some(endpoint_collector::config::AuthConfig {
        bearer_token: "sekrit".to_string(),
    });

    let summary = run_collection(config).await.expect("collection should succeed");
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn test_repeated_runs_append() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"n":1}"#))
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();

    for _ in 0..2 {
        let config = create_test_config(&mock_server.uri(), &db_path, &[("feed", "/feed")]);
        run_collection(config).await.expect("collection should succeed");
    }

    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen store");
    assert_eq!(storage.count_outcomes().unwrap(), 2);
    assert_eq!(storage.count_events().unwrap(), 2);
}
