//! Integration tests for crawl jobs
//!
//! Most tests use an in-process renderer that serves a binary tree of pages
//! under `/docs`; the last one runs the HTTP renderer against wiremock.

use crate::common::{markdown_files, user_agent};
use async_trait::async_trait;
use docsweep::config::{CrawlSettings, ResumeMode};
use docsweep::crawler::{CrawlDriver, CrawlOutcome, HttpRenderer, RenderError, RenderedPage, Renderer};
use docsweep::storage;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Every page `/docs/...` links to `<path>/a` and `<path>/b`
struct TreeRenderer {
    calls: AtomicUsize,
    text: Mutex<HashMap<String, String>>,
    /// Cancel on this call number (1-based); hang afterwards when `hang` is set
    cancel_on: Option<(usize, CancellationToken, bool)>,
}

impl TreeRenderer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            text: Mutex::new(HashMap::new()),
            cancel_on: None,
        }
    }

    fn cancelling(call: usize, token: CancellationToken, hang: bool) -> Self {
        Self {
            cancel_on: Some((call, token, hang)),
            ..Self::new()
        }
    }

    fn set_text(&self, path: &str, text: &str) {
        self.text
            .lock()
            .unwrap()
            .insert(path.to_string(), text.to_string());
    }
}

#[async_trait]
impl Renderer for TreeRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((at, token, hang)) = &self.cancel_on {
            if call == *at {
                token.cancel();
                if *hang {
                    std::future::pending::<()>().await;
                }
            }
        }

        let page = url.path().to_string();
        let text = self
            .text
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_else(|| format!("Contents of {}", page));

        Ok(RenderedPage {
            final_url: url.clone(),
            html: format!(
                r#"<html><body><nav><a href="/">Home</a></nav><main>
                <h1>{page}</h1><p>{text}</p>
                <a href="{page}/a">left</a> <a href="{page}/b">right</a>
                </main></body></html>"#
            ),
        })
    }
}

fn settings(dir: &Path) -> CrawlSettings {
    let mut settings = CrawlSettings::new("docs", "https://example.test/docs/", dir).unwrap();
    settings.max_pages = 5;
    settings.max_depth = 2;
    settings
}

fn visited_urls(session: &docsweep::CrawlSession) -> BTreeSet<String> {
    session.visited.keys().cloned().collect()
}

fn expected_first_five() -> BTreeSet<String> {
    [
        "https://example.test/docs",
        "https://example.test/docs/a",
        "https://example.test/docs/b",
        "https://example.test/docs/a/a",
        "https://example.test/docs/a/b",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[tokio::test]
async fn test_page_budget_bounds_the_crawl() {
    let dir = TempDir::new().unwrap();
    let driver = CrawlDriver::new(settings(dir.path()), Arc::new(TreeRenderer::new()));

    let report = driver.run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.visited, 5);
    assert_eq!(report.statistics.new, 5);
    assert_eq!(report.statistics.errors, 0);
    assert_eq!(markdown_files(dir.path()).len(), 5);

    let session = storage::load_session(dir.path()).await.unwrap().unwrap();
    assert!(!session.is_active);
    assert_eq!(visited_urls(&session), expected_first_five());

    // The budget stopped the crawl with the rest of depth 1's children queued
    let queued: Vec<_> = session.queue.iter().map(|u| u.url.as_str()).collect();
    assert_eq!(
        queued,
        vec!["https://example.test/docs/b/a", "https://example.test/docs/b/b"]
    );

    // Nothing beyond the depth limit was ever offered
    assert!(session.visited.values().all(|r| r.depth <= 2));
}

#[tokio::test]
async fn test_saved_file_holds_main_content() {
    let dir = TempDir::new().unwrap();
    let driver = CrawlDriver::new(settings(dir.path()), Arc::new(TreeRenderer::new()));
    driver.run().await.unwrap();

    let saved = std::fs::read_to_string(dir.path().join("example.test/docs/a.md")).unwrap();
    assert!(saved.starts_with("# /docs/a\n\nContents of /docs/a"));
    assert!(!saved.contains("Home"));
}

#[tokio::test]
async fn test_second_run_over_unchanged_site_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(TreeRenderer::new());

    CrawlDriver::new(settings(dir.path()), renderer.clone())
        .run()
        .await
        .unwrap();
    let before: Vec<_> = markdown_files(dir.path())
        .iter()
        .map(|p| std::fs::read_to_string(p).unwrap())
        .collect();

    let report = CrawlDriver::new(settings(dir.path()), renderer)
        .run()
        .await
        .unwrap();

    assert_eq!(report.statistics.skipped, 5);
    assert_eq!(report.statistics.new, 0);
    assert_eq!(report.statistics.updated, 0);
    assert_eq!(report.statistics.saved(), 0);

    let after: Vec<_> = markdown_files(dir.path())
        .iter()
        .map(|p| std::fs::read_to_string(p).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_changed_page_is_updated_and_force_rewrites_all() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(TreeRenderer::new());

    CrawlDriver::new(settings(dir.path()), renderer.clone())
        .run()
        .await
        .unwrap();

    renderer.set_text("/docs/a", "Rewritten");
    let report = CrawlDriver::new(settings(dir.path()), renderer.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(report.statistics.updated, 1);
    assert_eq!(report.statistics.skipped, 4);

    let saved = std::fs::read_to_string(dir.path().join("example.test/docs/a.md")).unwrap();
    assert!(saved.contains("Rewritten"));

    let mut forced = settings(dir.path());
    forced.force = true;
    let report = CrawlDriver::new(forced, renderer).run().await.unwrap();
    assert_eq!(report.statistics.updated, 5);
    assert_eq!(report.statistics.skipped, 0);
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_to_the_same_result() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();

    let first = CrawlDriver::new(
        settings(dir.path()),
        Arc::new(TreeRenderer::cancelling(3, cancel.clone(), false)),
    )
    .with_cancellation(cancel)
    .run()
    .await
    .unwrap();

    assert_eq!(first.outcome, CrawlOutcome::Interrupted);
    assert_eq!(first.visited, 3);

    let session = storage::load_session(dir.path()).await.unwrap().unwrap();
    assert!(session.is_active);
    assert_eq!(session.visited.len(), 3);

    let second = CrawlDriver::new(settings(dir.path()), Arc::new(TreeRenderer::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(second.outcome, CrawlOutcome::Completed);
    assert_eq!(second.statistics.total, 2);

    let session = storage::load_session(dir.path()).await.unwrap().unwrap();
    assert!(!session.is_active);
    assert_eq!(visited_urls(&session), expected_first_five());
    assert_eq!(markdown_files(dir.path()).len(), 5);
}

#[tokio::test]
async fn test_cancel_during_render_leaves_unit_queued() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();

    let report = CrawlDriver::new(
        settings(dir.path()),
        Arc::new(TreeRenderer::cancelling(2, cancel.clone(), true)),
    )
    .with_cancellation(cancel)
    .run()
    .await
    .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Interrupted);
    assert_eq!(report.visited, 1);
    assert_eq!(report.statistics.errors, 1);

    let session = storage::load_session(dir.path()).await.unwrap().unwrap();
    assert!(session.is_active);
    assert!(!session.visited.contains_key("https://example.test/docs/a"));
    assert!(session.failed.is_empty());
    assert_eq!(session.queue[0].url, "https://example.test/docs/a");

    let resumed = CrawlDriver::new(settings(dir.path()), Arc::new(TreeRenderer::new()))
        .run()
        .await
        .unwrap();
    assert_eq!(resumed.outcome, CrawlOutcome::Completed);
    assert_eq!(resumed.visited, 5);
}

#[tokio::test]
async fn test_never_mode_ignores_active_session() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();

    CrawlDriver::new(
        settings(dir.path()),
        Arc::new(TreeRenderer::cancelling(2, cancel.clone(), false)),
    )
    .with_cancellation(cancel)
    .run()
    .await
    .unwrap();

    let mut fresh = settings(dir.path());
    fresh.resume = ResumeMode::Never;
    let report = CrawlDriver::new(fresh, Arc::new(TreeRenderer::new()))
        .run()
        .await
        .unwrap();

    // Started over from the seed; the two pages seen before are unchanged
    assert_eq!(report.statistics.total, 5);
    assert_eq!(report.statistics.skipped, 2);
    assert_eq!(report.statistics.new, 3);
}

#[tokio::test]
async fn test_always_mode_without_session_fails() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path());
    settings.resume = ResumeMode::Always;
    settings.session_search_roots = vec![dir.path().to_path_buf()];

    let result = CrawlDriver::new(settings, Arc::new(TreeRenderer::new()))
        .run()
        .await;

    assert!(matches!(
        result,
        Err(docsweep::SweepError::Storage(
            storage::StorageError::SessionNotFound(_)
        ))
    ));
}

#[tokio::test]
async fn test_always_mode_discovers_session_elsewhere() {
    let root = TempDir::new().unwrap();
    let original = root.path().join("first-run");
    let cancel = CancellationToken::new();

    CrawlDriver::new(
        settings(&original),
        Arc::new(TreeRenderer::cancelling(2, cancel.clone(), false)),
    )
    .with_cancellation(cancel)
    .run()
    .await
    .unwrap();

    let mut moved = settings(&root.path().join("second-run"));
    moved.resume = ResumeMode::Always;
    moved.session_search_roots = vec![root.path().to_path_buf()];

    let report = CrawlDriver::new(moved, Arc::new(TreeRenderer::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.statistics.total, 3);
    assert_eq!(markdown_files(&original).len(), 5);
    assert!(!root.path().join("second-run").exists());
}

#[tokio::test]
async fn test_corrupt_session_fails_closed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(storage::session_path(dir.path()), b"{ not json").unwrap();

    let result = CrawlDriver::new(settings(dir.path()), Arc::new(TreeRenderer::new()))
        .run()
        .await;

    assert!(matches!(
        result,
        Err(docsweep::SweepError::Storage(storage::StorageError::Corrupt { .. }))
    ));
    // The damaged file is left for inspection
    assert_eq!(
        std::fs::read(storage::session_path(dir.path())).unwrap(),
        b"{ not json"
    );
}

#[tokio::test]
async fn test_http_renderer_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><title>Docs</title></head><body><main>
            <h1>Docs</h1>
            <a href="/docs/intro">Intro</a>
            <a href="/docs/missing">Missing</a>
            <a href="/docs/manual.pdf">Manual</a>
            <a href="/blog/post">Blog</a>
            <a href="https://elsewhere.test/docs/x">Elsewhere</a>
            <a href="mailto:docs@example.test">Mail</a>
            </main></body></html>"#,
            "text/html; charset=utf-8",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/intro"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><main><h1>Intro</h1><p>Getting started.</p></main></body></html>",
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/manual.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&mock_server)
        .await;

    // Unmatched paths (/docs/missing) get wiremock's default 404

    let dir = TempDir::new().unwrap();
    let settings = CrawlSettings::new("site", &format!("{}/docs/", base_url), dir.path()).unwrap();
    let renderer = HttpRenderer::from_user_agent(&user_agent(), Duration::from_secs(5)).unwrap();

    let report = CrawlDriver::new(settings, Arc::new(renderer))
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.visited, 2);
    assert_eq!(report.statistics.new, 2);
    assert_eq!(report.statistics.errors, 2);

    let session = storage::load_session(dir.path()).await.unwrap().unwrap();
    assert!(session.failed.contains_key(&format!("{}/docs/missing", base_url)));
    assert!(session.failed.contains_key(&format!("{}/docs/manual.pdf", base_url)));
    assert!(!session.visited.contains_key(&format!("{}/blog/post", base_url)));

    let saved = markdown_files(dir.path());
    assert_eq!(saved.len(), 2);
    let intro = saved
        .iter()
        .find(|p| p.ends_with("docs/intro.md"))
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(intro).unwrap(),
        "# Intro\n\nGetting started.\n"
    );
}
