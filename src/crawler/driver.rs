//! Crawl driver - the per-page processing loop
//!
//! One unit at a time: render, transform, hash, save or skip, extract links,
//! commit to the frontier. A unit's outcome is persisted before the next unit
//! is taken, so stopping at any point loses at most the unit in flight.

use crate::config::CrawlSettings;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::extract_links;
use crate::crawler::render::Renderer;
use crate::crawler::transform::{content_hash, TextTransform, Transform};
use crate::output::{notify, NoopProgress, Outcome, ProgressSink, Statistics};
use crate::state::{PageRecord, QueuedUnit, UnitState};
use crate::storage::write_atomic;
use crate::url::output_path_for;
use crate::SweepError;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Queue drained or page budget spent; the session is closed
    Completed,
    /// Cancelled; the session stays active for resumption
    Interrupted,
}

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub name: String,
    pub outcome: CrawlOutcome,
    pub statistics: Statistics,
    pub visited: usize,
    pub queued: usize,
}

/// Drives one crawl job over its own frontier
pub struct CrawlDriver {
    settings: CrawlSettings,
    renderer: Arc<dyn Renderer>,
    transform: Arc<dyn Transform>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

/// Result of processing one unit, before it is committed
enum Processed {
    Done {
        record: PageRecord,
        links: Vec<Url>,
        outcome: Outcome,
    },
    Failed(String),
    Cancelled,
}

impl CrawlDriver {
    /// Creates a driver with the text transform and no progress output
    pub fn new(settings: CrawlSettings, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            settings,
            renderer,
            transform: Arc::new(TextTransform),
            progress: Arc::new(NoopProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Runs the crawl until the frontier is exhausted or the job is cancelled
    ///
    /// Per-page failures are counted and never stop the crawl. Storage
    /// failures (including a corrupt session file) end the job with an error.
    pub async fn run(&self) -> Result<CrawlReport, SweepError> {
        let mut frontier = Frontier::load_or_create(&self.settings).await?;
        let mut stats = Statistics::started();
        let mut outcome = CrawlOutcome::Completed;

        loop {
            if self.cancel.is_cancelled() {
                outcome = CrawlOutcome::Interrupted;
                break;
            }

            let Some(unit) = frontier.next_unit() else {
                break;
            };

            tracing::debug!(url = %unit.url, depth = unit.depth, "Processing unit");

            match self.process(&frontier, &unit).await? {
                Processed::Done {
                    record,
                    links,
                    outcome: unit_outcome,
                } => {
                    let queued = frontier.record_outcome(&unit, record, &links).await?;
                    tracing::debug!(
                        url = %unit.url,
                        "{:?}, {} links found, {} queued",
                        unit_outcome,
                        links.len(),
                        queued
                    );
                    stats.record(unit_outcome);
                }
                Processed::Failed(error) => {
                    tracing::warn!(url = %unit.url, "Unit failed: {}", error);
                    frontier.record_failure(&unit, error).await?;
                    stats.record(Outcome::Error);
                }
                Processed::Cancelled => {
                    tracing::info!(url = %unit.url, "Cancelled while rendering; unit not committed");
                    frontier.release(unit);
                    stats.record(Outcome::Error);
                    outcome = CrawlOutcome::Interrupted;
                    break;
                }
            }

            notify(self.progress.as_ref(), frontier.percentage(), &unit.url);
        }

        if outcome == CrawlOutcome::Completed {
            frontier.finish().await?;
        }
        stats.finish();

        tracing::info!(
            "Crawl {:?}: {} visited, {} still queued, {} new, {} updated, {} skipped, {} errors",
            outcome,
            frontier.visited_len(),
            frontier.queue_len(),
            stats.new,
            stats.updated,
            stats.skipped,
            stats.errors
        );

        Ok(CrawlReport {
            name: self.settings.name.clone(),
            outcome,
            statistics: stats,
            visited: frontier.visited_len(),
            queued: frontier.queue_len(),
        })
    }

    /// Walks one unit through `Pending -> Rendering -> Hashing -> terminal`
    async fn process(&self, frontier: &Frontier, unit: &QueuedUnit) -> Result<Processed, SweepError> {
        let url = Url::parse(&unit.url)?;
        let state = UnitState::Pending.transition(UnitState::Rendering)?;

        let rendered = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.renderer.render(&url) => Some(result),
        };

        let page = match rendered {
            None => {
                state.transition(UnitState::Failed)?;
                return Ok(Processed::Cancelled);
            }
            Some(Err(e)) => {
                state.transition(UnitState::Failed)?;
                return Ok(Processed::Failed(e.to_string()));
            }
            Some(Ok(page)) => page,
        };

        let state = state.transition(UnitState::Hashing)?;
        let text = self.transform.to_normalized_text(&page.html);
        let hash = content_hash(&text);
        let extracted = extract_links(&page.html, &page.final_url);

        let (terminal, outcome) = match frontier.prior_record(&unit.url) {
            Some(prior) if prior.content_hash == hash && !self.settings.force => {
                (UnitState::Unchanged, Outcome::Skipped)
            }
            Some(_) => (UnitState::Saved, Outcome::Updated),
            None => (UnitState::Saved, Outcome::New),
        };

        let local_path = output_path_for(frontier.output_dir(), &url);

        if terminal == UnitState::Saved {
            if let Err(e) = write_atomic(&local_path, text.as_bytes()).await {
                state.transition(UnitState::Failed)?;
                return Ok(Processed::Failed(e.to_string()));
            }
        }
        state.transition(terminal)?;

        Ok(Processed::Done {
            record: PageRecord {
                url: unit.url.clone(),
                title: extracted.title,
                content_hash: hash,
                local_path,
                depth: unit.depth,
                last_crawled_at: Utc::now(),
            },
            links: extracted.links,
            outcome,
        })
    }
}
