//! Integration tests for running configured jobs together

use docsweep::config::{load_config, Config};
use docsweep::orchestrator::{run_all, HarvestJob, JobStatus};
use docsweep::SweepError;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("<html><body><main><h1>{}</h1></main></body></html>", body),
            "text/html",
        ))
        .mount(server)
        .await;
}

fn write_config(dir: &Path, server: &MockServer) -> Config {
    let uri = server.uri();
    let root = dir.display();
    let content = format!(
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[[crawl]]
name = "site-one"
start-url = "{uri}/one/"
output-dir = "{root}/one"

[[crawl]]
name = "site-two"
start-url = "{uri}/two/"
output-dir = "{root}/two"

[[enrich]]
name = "packages"
source = "{root}/missing-packages.json"
output-dir = "{root}/packages"
api-base-url = "{uri}"
request-delay-ms = 0
"#
    );
    let config_path = dir.join("docsweep.toml");
    std::fs::write(&config_path, content).unwrap();
    load_config(&config_path).unwrap()
}

#[tokio::test]
async fn test_failing_job_does_not_stop_the_others() {
    let server = MockServer::start().await;
    mount_page(&server, "/one", "One").await;
    mount_page(&server, "/two", "Two").await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server);

    let jobs = HarvestJob::from_config(&config, &CancellationToken::new()).unwrap();
    assert_eq!(jobs.len(), 3);

    let report = run_all(jobs).await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failed_count(), 1);
    assert!(!report.is_success());

    for (name, result) in &report.results {
        match name.as_str() {
            "packages" => assert!(matches!(result, Err(SweepError::Catalog(_)))),
            _ => {
                let summary = result.as_ref().unwrap();
                assert_eq!(summary.status, JobStatus::Completed);
                assert_eq!(summary.statistics.new, 1);
            }
        }
    }

    assert!(dir.path().join("one/.docsweep-session.json").exists());
    assert!(dir.path().join("two/.docsweep-session.json").exists());
    assert_eq!(report.combined_statistics().new, 2);
}

#[tokio::test]
async fn test_selected_jobs_all_succeed() {
    let server = MockServer::start().await;
    mount_page(&server, "/one", "One").await;
    mount_page(&server, "/two", "Two").await;

    let dir = TempDir::new().unwrap();
    let mut config = write_config(dir.path(), &server);
    config
        .retain_jobs(&["site-one".to_string(), "site-two".to_string()])
        .unwrap();

    let jobs = HarvestJob::from_config(&config, &CancellationToken::new()).unwrap();
    let report = run_all(jobs).await;

    assert!(report.is_success());
    assert_eq!(report.results.len(), 2);
}

#[tokio::test]
async fn test_cancelled_jobs_are_reported_interrupted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = write_config(dir.path(), &server);
    config.retain_jobs(&["site-one".to_string()]).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_all(HarvestJob::from_config(&config, &cancel).unwrap()).await;

    assert_eq!(report.failed_count(), 1);
    let summary = report.results[0].1.as_ref().unwrap();
    assert_eq!(summary.status, JobStatus::Interrupted);
}
