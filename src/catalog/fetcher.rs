//! Rate-limited two-phase batch fetcher
//!
//! Phase 1 ranks every entry with a cheap call and caches the signal in the
//! checkpoint. Phase 2 walks the entries in descending signal order and
//! fetches details, so a quota stall still leaves the most valuable entries
//! enriched. Both phases checkpoint on a fixed cadence and halt on the first
//! rate-limit response.

use crate::catalog::api::{CatalogApi, CatalogError};
use crate::catalog::source::{load_entries, CatalogEntry};
use crate::config::{EnrichSettings, ResumeMode};
use crate::output::{notify, percentage, NoopProgress, Outcome, ProgressSink, Statistics};
use crate::state::{FetchCheckpoint, ItemError, ItemRecord};
use crate::storage::{self, StorageError};
use crate::SweepError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a batch fetch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Every entry was classified
    Completed,
    /// The remote quota ran out; the checkpoint marks where to resume
    RateLimited { reset_at: Option<DateTime<Utc>> },
    /// Cancelled; the checkpoint marks where to resume
    Interrupted,
}

/// Summary of one batch fetch run
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub name: String,
    pub outcome: FetchOutcome,
    /// Counters for the entries classified during this run
    pub statistics: Statistics,
    /// Entries classified so far, across runs
    pub processed: usize,
    pub total: usize,
    /// Filtered, sorted items; empty when interrupted
    pub results: Vec<ItemRecord>,
}

/// Contents of `results.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsFile {
    pub generated_at: DateTime<Utc>,
    pub job: String,
    /// False when the run stopped on a rate limit
    pub complete: bool,
    pub total_entries: usize,
    pub processed: usize,
    pub statistics: Statistics,
    pub items: Vec<ItemRecord>,
}

/// Where a phase stopped early
enum Halt {
    RateLimited(Option<DateTime<Utc>>),
    Interrupted,
}

pub struct BatchFetcher {
    settings: EnrichSettings,
    api: Arc<dyn CatalogApi>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl BatchFetcher {
    pub fn new(settings: EnrichSettings, api: Arc<dyn CatalogApi>) -> Self {
        Self {
            settings,
            api,
            progress: Arc::new(NoopProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &EnrichSettings {
        &self.settings
    }

    /// Runs both phases over the configured source
    pub async fn run(&self) -> Result<FetchReport, SweepError> {
        let entries = load_entries(&self.settings.source, self.settings.max_entries).await?;
        self.run_entries(&entries).await
    }

    /// Runs both phases over `entries`
    pub async fn run_entries(&self, entries: &[CatalogEntry]) -> Result<FetchReport, SweepError> {
        let output_dir = &self.settings.output_dir;
        let mut checkpoint = self.load_checkpoint(entries).await?;
        let mut stats = Statistics::started();

        tracing::info!(
            "Enriching {} entries ({} already processed)",
            entries.len(),
            checkpoint.processed_count
        );

        if !checkpoint.ranking_complete {
            if let Some(halt) = self.rank(entries, &mut checkpoint).await? {
                return self.halted(halt, entries, checkpoint, stats).await;
            }
        }

        let ranked = rank_order(entries, &checkpoint);

        if let Some(halt) = self.enrich(&ranked, &mut checkpoint, &mut stats).await? {
            return self.halted(halt, entries, checkpoint, stats).await;
        }

        checkpoint.touch();
        storage::save_checkpoint(output_dir, &checkpoint).await?;

        stats.finish();
        let results = finalize(&checkpoint.accumulated_results);
        self.write_results(true, entries.len(), &checkpoint, &stats, &results)
            .await?;

        tracing::info!(
            "Enrichment complete: {} enriched, {} errors, {} kept in results",
            stats.new,
            stats.errors,
            results.len()
        );

        Ok(FetchReport {
            name: self.settings.name.clone(),
            outcome: FetchOutcome::Completed,
            statistics: stats,
            processed: checkpoint.processed_count,
            total: entries.len(),
            results,
        })
    }

    /// Loads the checkpoint to continue from, or a fresh one
    ///
    /// A checkpoint that already covers every entry belongs to a finished run
    /// and is replaced under `Auto`. A checkpoint that no longer lines up with
    /// the current source (see [`matches_source`]) is replaced in every mode.
    async fn load_checkpoint(&self, entries: &[CatalogEntry]) -> Result<FetchCheckpoint, SweepError> {
        let output_dir = &self.settings.output_dir;

        if self.settings.resume == ResumeMode::Never {
            return Ok(FetchCheckpoint::new());
        }

        let existing = storage::load_checkpoint(output_dir).await?;

        let Some(checkpoint) = existing else {
            if self.settings.resume == ResumeMode::Always {
                return Err(StorageError::SessionNotFound(self.settings.name.clone()).into());
            }
            return Ok(FetchCheckpoint::new());
        };

        if !matches_source(&checkpoint, entries) {
            tracing::warn!(
                "Checkpoint of {} does not match the current source list ({} entries); starting over",
                checkpoint.timestamp,
                entries.len()
            );
            return Ok(FetchCheckpoint::new());
        }

        let finished = checkpoint.ranking_complete && checkpoint.processed_count == entries.len();
        if finished && self.settings.resume == ResumeMode::Auto {
            tracing::info!("Previous enrichment run finished; starting a new one");
            return Ok(FetchCheckpoint::new());
        }

        tracing::info!(
            "Resuming from checkpoint of {}: {} ranked, {} processed",
            checkpoint.timestamp,
            checkpoint.rankings.len(),
            checkpoint.processed_count
        );
        Ok(checkpoint)
    }

    /// Phase 1: caches a ranking signal for every unranked entry
    async fn rank(
        &self,
        entries: &[CatalogEntry],
        checkpoint: &mut FetchCheckpoint,
    ) -> Result<Option<Halt>, SweepError> {
        let mut requests = 0usize;

        for entry in entries {
            if checkpoint.rankings.contains_key(&entry.id) {
                continue;
            }

            let Some(result) = self.cancellable(self.api.fetch_ranking_signal(entry)).await else {
                self.save(checkpoint).await?;
                return Ok(Some(Halt::Interrupted));
            };

            match result {
                Ok(signal) => {
                    checkpoint.rankings.insert(entry.id.clone(), Some(signal));
                }
                Err(CatalogError::RateLimited { reset_at }) => {
                    tracing::warn!(index = checkpoint.rankings.len(), "Rate limited while ranking {}", entry.id);
                    self.save(checkpoint).await?;
                    return Ok(Some(Halt::RateLimited(reset_at)));
                }
                Err(e) => {
                    tracing::debug!("Ranking {} failed: {}", entry.id, e);
                    checkpoint.rankings.insert(entry.id.clone(), None);
                }
            }

            requests += 1;
            if requests % self.settings.checkpoint_every == 0 {
                self.save(checkpoint).await?;
            }

            if !self.pause(self.settings.pacing.delay_after(requests)).await {
                self.save(checkpoint).await?;
                return Ok(Some(Halt::Interrupted));
            }
        }

        checkpoint.ranking_complete = true;
        self.save(checkpoint).await?;
        tracing::info!("Ranking pass complete for {} entries", entries.len());
        Ok(None)
    }

    /// Phase 2: fetches details in ranked order from `processed_count`
    async fn enrich(
        &self,
        ranked: &[(&CatalogEntry, Option<u64>)],
        checkpoint: &mut FetchCheckpoint,
        stats: &mut Statistics,
    ) -> Result<Option<Halt>, SweepError> {
        let total = ranked.len();
        let mut requests = 0usize;

        for (index, (entry, signal)) in ranked.iter().enumerate().skip(checkpoint.processed_count) {
            let Some(result) = self.cancellable(self.api.fetch_detail(entry)).await else {
                self.save(checkpoint).await?;
                return Ok(Some(Halt::Interrupted));
            };

            let (item, outcome) = match result {
                Ok(metadata) => (
                    ItemRecord::enriched(&entry.id, &entry.url, *signal, metadata),
                    Outcome::New,
                ),
                Err(CatalogError::RateLimited { reset_at }) => {
                    tracing::warn!(index, "Rate limited while fetching {}", entry.id);
                    self.save(checkpoint).await?;
                    return Ok(Some(Halt::RateLimited(reset_at)));
                }
                Err(CatalogError::NotFound(_)) => (
                    ItemRecord::failed(&entry.id, &entry.url, *signal, ItemError::NotFound),
                    Outcome::Error,
                ),
                Err(e) => {
                    tracing::warn!(index, "Fetching {} failed: {}", entry.id, e);
                    (
                        ItemRecord::failed(&entry.id, &entry.url, *signal, ItemError::FetchFailed),
                        Outcome::Error,
                    )
                }
            };

            checkpoint.push(item);
            stats.record(outcome);
            notify(
                self.progress.as_ref(),
                percentage(checkpoint.processed_count, total),
                &entry.id,
            );

            requests += 1;
            if checkpoint.processed_count % self.settings.checkpoint_every == 0 {
                self.save(checkpoint).await?;
            }

            if !self.pause(self.settings.pacing.delay_after(requests)).await {
                self.save(checkpoint).await?;
                return Ok(Some(Halt::Interrupted));
            }
        }

        Ok(None)
    }

    /// Ends a run that stopped early
    async fn halted(
        &self,
        halt: Halt,
        entries: &[CatalogEntry],
        checkpoint: FetchCheckpoint,
        mut stats: Statistics,
    ) -> Result<FetchReport, SweepError> {
        stats.finish();

        let (outcome, results) = match halt {
            Halt::RateLimited(reset_at) => {
                let results = finalize(&checkpoint.accumulated_results);
                self.write_results(false, entries.len(), &checkpoint, &stats, &results)
                    .await?;
                tracing::warn!(
                    "Stopped on rate limit after {} of {} entries; rerun to resume",
                    checkpoint.processed_count,
                    entries.len()
                );
                (FetchOutcome::RateLimited { reset_at }, results)
            }
            Halt::Interrupted => {
                tracing::info!(
                    "Interrupted after {} of {} entries",
                    checkpoint.processed_count,
                    entries.len()
                );
                (FetchOutcome::Interrupted, Vec::new())
            }
        };

        Ok(FetchReport {
            name: self.settings.name.clone(),
            outcome,
            statistics: stats,
            processed: checkpoint.processed_count,
            total: entries.len(),
            results,
        })
    }

    /// Writes `results.json`; its counters cover every run of the checkpoint
    async fn write_results(
        &self,
        complete: bool,
        total_entries: usize,
        checkpoint: &FetchCheckpoint,
        run: &Statistics,
        items: &[ItemRecord],
    ) -> Result<(), StorageError> {
        let file = ResultsFile {
            generated_at: Utc::now(),
            job: self.settings.name.clone(),
            complete,
            total_entries,
            processed: checkpoint.processed_count,
            statistics: consolidated(&checkpoint.accumulated_results, run),
            items: items.to_vec(),
        };
        storage::save_json(&storage::results_path(&self.settings.output_dir), &file).await
    }

    async fn save(&self, checkpoint: &mut FetchCheckpoint) -> Result<(), StorageError> {
        checkpoint.touch();
        storage::save_checkpoint(&self.settings.output_dir, checkpoint).await
    }

    /// Awaits `future` unless the job is cancelled first
    async fn cancellable<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            output = future => Some(output),
        }
    }

    /// Sleeps for `delay`; false when cancelled meanwhile
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        self.cancellable(tokio::time::sleep(delay)).await.is_some()
    }
}

/// Whether `checkpoint` was built over the same entries as `entries`
///
/// Every cached ranking must name a current entry, and once ranking is
/// complete every current entry must be ranked. The accumulated results must
/// be exactly the first `processed_count` entries of the current ranked
/// order, otherwise resuming would skip or duplicate entries.
fn matches_source(checkpoint: &FetchCheckpoint, entries: &[CatalogEntry]) -> bool {
    let current: HashSet<&str> = entries.iter().map(|e| e.id.as_str()).collect();

    if checkpoint.rankings.keys().any(|id| !current.contains(id.as_str())) {
        return false;
    }
    if checkpoint.processed_count != checkpoint.accumulated_results.len()
        || checkpoint.processed_count > entries.len()
    {
        return false;
    }
    if !checkpoint.ranking_complete {
        return checkpoint.processed_count == 0;
    }
    if checkpoint.rankings.len() != current.len() {
        return false;
    }

    rank_order(entries, checkpoint)
        .iter()
        .zip(&checkpoint.accumulated_results)
        .all(|((entry, _), item)| entry.id == item.id)
}

/// Counters over every classified item, with this run's timing
fn consolidated(items: &[ItemRecord], run: &Statistics) -> Statistics {
    let mut stats = Statistics {
        start_time: run.start_time,
        end_time: run.end_time,
        ..Statistics::default()
    };
    for item in items {
        stats.record(if item.is_error() { Outcome::Error } else { Outcome::New });
    }
    stats
}

/// Entries sorted by cached signal, descending; ties keep input order
fn rank_order<'a>(
    entries: &'a [CatalogEntry],
    checkpoint: &FetchCheckpoint,
) -> Vec<(&'a CatalogEntry, Option<u64>)> {
    let mut ranked: Vec<_> = entries
        .iter()
        .map(|e| (e, checkpoint.rankings.get(&e.id).copied().flatten()))
        .collect();
    ranked.sort_by(|a, b| b.1.unwrap_or(0).cmp(&a.1.unwrap_or(0)));
    ranked
}

/// Drops errored items without a usable signal and sorts by signal, descending
pub fn finalize(items: &[ItemRecord]) -> Vec<ItemRecord> {
    let mut kept: Vec<ItemRecord> = items
        .iter()
        .filter(|item| !(item.is_error() && !item.has_usable_signal()))
        .cloned()
        .collect();
    kept.sort_by(|a, b| b.signal.unwrap_or(0).cmp(&a.signal.unwrap_or(0)));
    kept
}
