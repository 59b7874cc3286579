//! Concurrent job orchestration
//!
//! Every configured job runs as its own task with its own frontier or
//! checkpoint. Jobs share nothing but the cancellation token. A failing job
//! never cancels its siblings; the aggregate report is built once all of them
//! have reached a terminal state.

use crate::catalog::{BatchFetcher, FetchOutcome, FetchReport, GitHubClient};
use crate::config::{Config, CrawlSettings, EnrichSettings};
use crate::crawler::{CrawlDriver, CrawlOutcome, CrawlReport, HttpRenderer};
use crate::output::{Statistics, TracingProgress};
use crate::SweepError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Terminal status of a job that returned normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    /// Cancelled; persisted state allows resuming
    Interrupted,
    /// Stopped on an exhausted remote quota; persisted state allows resuming
    RateLimited { reset_at: Option<DateTime<Utc>> },
}

/// What a job reports back to the orchestrator
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub name: String,
    pub status: JobStatus,
    pub statistics: Statistics,
}

impl JobSummary {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

impl From<CrawlReport> for JobSummary {
    fn from(report: CrawlReport) -> Self {
        let status = match report.outcome {
            CrawlOutcome::Completed => JobStatus::Completed,
            CrawlOutcome::Interrupted => JobStatus::Interrupted,
        };
        Self {
            name: report.name,
            status,
            statistics: report.statistics,
        }
    }
}

impl From<FetchReport> for JobSummary {
    fn from(report: FetchReport) -> Self {
        let status = match report.outcome {
            FetchOutcome::Completed => JobStatus::Completed,
            FetchOutcome::Interrupted => JobStatus::Interrupted,
            FetchOutcome::RateLimited { reset_at } => JobStatus::RateLimited { reset_at },
        };
        Self {
            name: report.name,
            status,
            statistics: report.statistics,
        }
    }
}

/// One independently runnable traversal
#[async_trait]
pub trait TraversalJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<JobSummary, SweepError>;
}

/// The job kinds a config can declare
pub enum HarvestJob {
    Crawl(CrawlDriver),
    Enrich(BatchFetcher),
}

impl HarvestJob {
    /// Builds every configured job, wired to `cancel`, crawl jobs first
    pub fn from_config(config: &Config, cancel: &CancellationToken) -> Result<Vec<Self>, SweepError> {
        let mut jobs = Vec::with_capacity(config.job_count());

        for job in &config.crawl {
            let settings = CrawlSettings::from_config(job, &config.sessions)?;
            let renderer = HttpRenderer::from_user_agent(&config.user_agent, settings.request_timeout)?;
            let progress = TracingProgress::new(settings.name.clone());
            jobs.push(HarvestJob::Crawl(
                CrawlDriver::new(settings, Arc::new(renderer))
                    .with_progress(Arc::new(progress))
                    .with_cancellation(cancel.clone()),
            ));
        }

        for job in &config.enrich {
            let settings = EnrichSettings::from_config(job)?;
            let api = GitHubClient::from_settings(&config.user_agent, &settings)?;
            let progress = TracingProgress::new(settings.name.clone());
            jobs.push(HarvestJob::Enrich(
                BatchFetcher::new(settings, Arc::new(api))
                    .with_progress(Arc::new(progress))
                    .with_cancellation(cancel.clone()),
            ));
        }

        Ok(jobs)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HarvestJob::Crawl(_) => "crawl",
            HarvestJob::Enrich(_) => "enrich",
        }
    }
}

#[async_trait]
impl TraversalJob for HarvestJob {
    fn name(&self) -> &str {
        match self {
            HarvestJob::Crawl(driver) => &driver.settings().name,
            HarvestJob::Enrich(fetcher) => &fetcher.settings().name,
        }
    }

    async fn run(&self) -> Result<JobSummary, SweepError> {
        match self {
            HarvestJob::Crawl(driver) => Ok(driver.run().await?.into()),
            HarvestJob::Enrich(fetcher) => Ok(fetcher.run().await?.into()),
        }
    }
}

/// Outcome of every job, in completion order
#[derive(Debug, Default)]
pub struct AggregateReport {
    pub results: Vec<(String, Result<JobSummary, SweepError>)>,
}

impl AggregateReport {
    /// Jobs that errored or did not complete
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, result)| !matches!(result, Ok(summary) if summary.is_success()))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Sum of all per-job counters
    pub fn combined_statistics(&self) -> Statistics {
        let mut combined = Statistics::default();
        for summary in self.results.iter().filter_map(|(_, r)| r.as_ref().ok()) {
            let stats = &summary.statistics;
            combined.new += stats.new;
            combined.updated += stats.updated;
            combined.skipped += stats.skipped;
            combined.errors += stats.errors;
            combined.total += stats.total;
            combined.start_time = match (combined.start_time, stats.start_time) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            combined.end_time = match (combined.end_time, stats.end_time) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
        combined
    }
}

/// Runs all jobs concurrently and waits for every one of them
///
/// Each job runs in a span named after it. A panicking job is reported as
/// [`SweepError::JobAborted`] and does not affect the others.
pub async fn run_all<J>(jobs: Vec<J>) -> AggregateReport
where
    J: TraversalJob + 'static,
{
    let mut tasks = JoinSet::new();

    for job in jobs {
        let name = job.name().to_string();
        let span = tracing::info_span!("job", job = %name);

        tasks.spawn(async move {
            let handle = tokio::spawn(async move { job.run().await }.instrument(span));
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(SweepError::JobAborted {
                    name: name.clone(),
                    message: e.to_string(),
                }),
            };
            (name, result)
        });
    }

    let mut report = AggregateReport::default();

    while let Some(joined) = tasks.join_next().await {
        let (name, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("Job supervisor task failed: {}", e);
                (
                    "<unknown>".to_string(),
                    Err(SweepError::JobAborted {
                        name: "<unknown>".to_string(),
                        message: e.to_string(),
                    }),
                )
            }
        };

        match &result {
            Ok(summary) if summary.is_success() => {
                tracing::info!(job = %name, "Job completed")
            }
            Ok(summary) => tracing::warn!(job = %name, "Job ended {:?}", summary.status),
            Err(e) => tracing::error!(job = %name, "Job failed: {}", e),
        }

        report.results.push((name, result));
    }

    if !report.is_success() {
        tracing::warn!(
            "{} of {} jobs did not complete",
            report.failed_count(),
            report.results.len()
        );
    }

    report
}
