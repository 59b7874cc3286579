//! Integration tests for catalog enrichment against a mock GitHub API

use crate::common::user_agent;
use docsweep::catalog::{BatchFetcher, FetchOutcome, GitHubClient, ResultsFile};
use docsweep::config::{EnrichSettings, Pacing};
use docsweep::storage;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_source(dir: &Path, repos: &[&str]) -> std::path::PathBuf {
    let source = dir.join("packages.json");
    let urls: Vec<String> = repos
        .iter()
        .map(|r| format!("https://github.com/{}", r))
        .collect();
    std::fs::write(&source, serde_json::to_string(&urls).unwrap()).unwrap();
    source
}

fn settings(dir: &Path, server: &MockServer, repos: &[&str]) -> EnrichSettings {
    let mut settings = EnrichSettings::new(
        "packages",
        write_source(dir, repos),
        dir.join("out"),
        Url::parse(&server.uri()).unwrap(),
    );
    settings.pacing = Pacing::none();
    settings.checkpoint_every = 1;
    settings
}

fn fetcher(settings: EnrichSettings) -> BatchFetcher {
    let client = GitHubClient::from_settings(&user_agent(), &settings).unwrap();
    BatchFetcher::new(settings, Arc::new(client))
}

fn repo(stars: u64, description: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "stargazers_count": stars,
        "description": description,
        "license": {"spdx_id": "MIT", "name": "MIT License"},
        "topics": ["swift"],
        "language": "Swift",
        "default_branch": "main",
        "archived": false,
        "pushed_at": "2024-03-01T12:00:00Z"
    }))
}

fn rate_limited() -> ResponseTemplate {
    ResponseTemplate::new(403)
        .insert_header("x-ratelimit-remaining", "0")
        .insert_header("x-ratelimit-reset", "1735787045")
        .set_body_json(json!({"message": "API rate limit exceeded"}))
}

async fn load_results(dir: &Path) -> ResultsFile {
    storage::load_json(&storage::results_path(&dir.join("out")))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_full_enrichment_run() {
    let server = MockServer::start().await;

    for (name, stars) in [("low", 3u64), ("high", 900), ("mid", 40)] {
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/{}", name)))
            .and(header("authorization", "Bearer secret"))
            .respond_with(repo(stars, name))
            .expect(2)
            .mount(&server)
            .await;
    }
    // acme/gone is unmatched and gets wiremock's default 404

    let dir = TempDir::new().unwrap();
    let mut settings = settings(
        dir.path(),
        &server,
        &["acme/low", "acme/gone", "acme/high", "acme/mid"],
    );
    settings.token = Some("secret".to_string());

    let report = fetcher(settings).run().await.unwrap();

    assert_eq!(report.outcome, FetchOutcome::Completed);
    assert_eq!(report.total, 4);
    assert_eq!(report.processed, 4);
    assert_eq!(report.statistics.new, 3);
    assert_eq!(report.statistics.errors, 1);

    let results = load_results(dir.path()).await;
    assert!(results.complete);
    assert_eq!(results.job, "packages");
    let ids: Vec<_> = results.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["acme/high", "acme/mid", "acme/low"]);
    assert_eq!(results.items[0].signal, Some(900));
    assert_eq!(results.items[0].metadata.license.as_deref(), Some("MIT"));

    // The not-found entry is kept in the checkpoint with its marker
    let raw: serde_json::Value = serde_json::from_slice(
        &std::fs::read(storage::checkpoint_path(&dir.path().join("out"))).unwrap(),
    )
    .unwrap();
    let gone = raw["accumulatedResults"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == "acme/gone")
        .unwrap();
    assert_eq!(gone["error"], "not_found");
}

#[tokio::test]
async fn test_rate_limit_then_resume() {
    let server = MockServer::start().await;

    for (name, stars) in [("a", 100u64), ("b", 50)] {
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/{}", name)))
            .respond_with(repo(stars, name))
            .mount(&server)
            .await;
    }
    // acme/c ranks fine, then its detail fetch hits the quota
    Mock::given(method("GET"))
        .and(path("/repos/acme/c"))
        .respond_with(repo(10, "c"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/c"))
        .respond_with(rate_limited())
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let repos = ["acme/c", "acme/a", "acme/b"];

    let report = fetcher(settings(dir.path(), &server, &repos))
        .run()
        .await
        .unwrap();

    match report.outcome {
        FetchOutcome::RateLimited { reset_at: Some(at) } => assert_eq!(at.timestamp(), 1735787045),
        other => panic!("expected a rate limit, got {:?}", other),
    }
    assert_eq!(report.processed, 2);

    let checkpoint = storage::load_checkpoint(&dir.path().join("out"))
        .await
        .unwrap()
        .unwrap();
    assert!(checkpoint.ranking_complete);
    assert_eq!(checkpoint.processed_count, 2);

    let partial = load_results(dir.path()).await;
    assert!(!partial.complete);
    assert_eq!(partial.items.len(), 2);

    // Quota restored: only the remaining entry is fetched
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/c"))
        .respond_with(repo(10, "c"))
        .expect(1)
        .mount(&server)
        .await;

    let resumed = fetcher(settings(dir.path(), &server, &repos))
        .run()
        .await
        .unwrap();

    assert_eq!(resumed.outcome, FetchOutcome::Completed);
    assert_eq!(resumed.statistics.total, 1);

    let results = load_results(dir.path()).await;
    assert!(results.complete);
    let ids: Vec<_> = results.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["acme/a", "acme/b", "acme/c"]);
    assert_eq!(results.processed, 3);
    assert_eq!(results.statistics.total, 3);
    assert_eq!(results.statistics.new, 3);
}

#[tokio::test]
async fn test_rate_limit_during_ranking() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/a"))
        .respond_with(repo(7, "a"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/b"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = fetcher(settings(dir.path(), &server, &["acme/a", "acme/b", "acme/c"]))
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, FetchOutcome::RateLimited { reset_at: None });
    assert_eq!(report.processed, 0);

    let checkpoint = storage::load_checkpoint(&dir.path().join("out"))
        .await
        .unwrap()
        .unwrap();
    assert!(!checkpoint.ranking_complete);
    assert_eq!(checkpoint.rankings.len(), 1);
    assert_eq!(checkpoint.rankings.get("acme/a"), Some(&Some(7)));

    let results = load_results(dir.path()).await;
    assert!(!results.complete);
    assert!(results.items.is_empty());
}

#[tokio::test]
async fn test_max_entries_limits_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(repo(1, "any"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path(), &server, &["x/one", "x/two", "x/three"]);
    settings.max_entries = Some(2);

    let report = fetcher(settings).run().await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.results.len(), 2);
}
