//! Crawl frontier over a persisted session
//!
//! The frontier owns the job's [`CrawlSession`]: the breadth-first queue of
//! pending units, the visited records, and the failures of the current run.
//! Every committed outcome is written back to the session file before the
//! next unit is handed out.

use crate::config::{CrawlSettings, ResumeMode};
use crate::output::percentage;
use crate::state::{CrawlSession, FailedUnit, PageRecord, QueuedUnit};
use crate::storage::{self, StorageError};
use crate::url::ScopePrefixes;
use crate::SweepError;
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    OutOfScope,
    TooDeep,
    AlreadyVisited,
    AlreadyQueued,
    /// Failed earlier in this session; not retried until the next run
    PreviouslyFailed,
}

impl Enqueue {
    pub fn is_queued(&self) -> bool {
        matches!(self, Enqueue::Queued)
    }
}

/// How the session backing a frontier was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// No previous session existed
    Fresh,
    /// A finished (or replaced) session was restarted; its records are the
    /// prior records for change detection
    Restarted,
    /// An active session was continued
    Resumed,
}

pub struct Frontier {
    session: CrawlSession,
    scope: ScopePrefixes,
    origin: SessionOrigin,
    /// URLs in `session.queue`, for constant-time duplicate checks
    queued: HashSet<String>,
}

impl Frontier {
    /// Wraps a session without touching storage
    pub fn from_session(session: CrawlSession, origin: SessionOrigin) -> Result<Self, SweepError> {
        let scope = ScopePrefixes::new(&session.allowed_prefixes)?;
        Ok(Self {
            queued: queued_urls(&session),
            session,
            scope,
            origin,
        })
    }

    /// Loads the session for a job, or creates one seeded with its start URL
    ///
    /// # Resume rules
    ///
    /// | Mode | Active session for the same start URL in `output_dir` | Otherwise |
    /// |------|------|------|
    /// | `Auto` | resumed | fresh start (prior records kept) |
    /// | `Always` | resumed | search roots scanned; one match resumed, none is an error |
    /// | `Never` | restarted | fresh start (prior records kept) |
    ///
    /// A corrupt session file is an error in every mode. More than one
    /// discovered match is [`StorageError::AmbiguousSession`].
    pub async fn load_or_create(settings: &CrawlSettings) -> Result<Self, SweepError> {
        let start_url = settings.start_url.as_str();
        let existing = storage::load_session(&settings.output_dir).await?;

        let existing = match existing {
            Some(session)
                if settings.resume != ResumeMode::Never
                    && session.is_active
                    && session.start_url == start_url =>
            {
                return Self::resume(session);
            }
            other => other,
        };

        if settings.resume == ResumeMode::Always {
            let found =
                storage::discover_session(start_url, &settings.session_search_roots).await?;
            let Some(dir) = found else {
                return Err(StorageError::SessionNotFound(start_url.to_string()).into());
            };
            let Some(mut session) = storage::load_session(&dir).await? else {
                return Err(StorageError::SessionNotFound(start_url.to_string()).into());
            };
            if !same_dir(&dir, &settings.output_dir) {
                tracing::warn!(
                    "Resuming session for {} found in {:?}; output continues there",
                    start_url,
                    dir
                );
            }
            session.output_directory = dir;
            return Self::resume(session);
        }

        let (session, origin) = match existing {
            Some(previous) => {
                if previous.start_url != start_url {
                    tracing::warn!(
                        "Replacing session for {} in {:?} with a crawl of {}",
                        previous.start_url,
                        settings.output_dir,
                        start_url
                    );
                }
                let mut session = CrawlSession::restart(
                    previous,
                    settings.scope.as_set().clone(),
                    settings.max_pages,
                    settings.max_depth,
                );
                session.start_url = start_url.to_string();
                session.output_directory = settings.output_dir.clone();
                (session, SessionOrigin::Restarted)
            }
            None => (
                CrawlSession::new(
                    start_url,
                    settings.scope.as_set().clone(),
                    settings.max_pages,
                    settings.max_depth,
                    settings.output_dir.clone(),
                ),
                SessionOrigin::Fresh,
            ),
        };

        let mut frontier = Self {
            queued: queued_urls(&session),
            session,
            scope: settings.scope.clone(),
            origin,
        };

        frontier.enqueue(&settings.start_url, 0);
        frontier.persist().await?;

        tracing::info!(
            "Starting crawl of {} ({} prior records)",
            start_url,
            frontier.session.prior.len()
        );

        Ok(frontier)
    }

    fn resume(session: CrawlSession) -> Result<Self, SweepError> {
        tracing::info!(
            "Resuming crawl of {}: {} visited, {} queued",
            session.start_url,
            session.visited.len(),
            session.queue.len()
        );
        Self::from_session(session, SessionOrigin::Resumed)
    }

    /// Offers a URL at `depth`
    pub fn enqueue(&mut self, url: &Url, depth: u32) -> Enqueue {
        let key = url.as_str();

        let verdict = if depth > self.session.max_depth {
            Enqueue::TooDeep
        } else if !self.scope.contains(url) {
            Enqueue::OutOfScope
        } else if self.session.visited.contains_key(key) {
            Enqueue::AlreadyVisited
        } else if self.session.failed.contains_key(key) {
            Enqueue::PreviouslyFailed
        } else if self.queued.contains(key) {
            Enqueue::AlreadyQueued
        } else {
            self.queued.insert(key.to_string());
            self.session.queue.push_back(QueuedUnit {
                url: key.to_string(),
                depth,
            });
            Enqueue::Queued
        };

        tracing::trace!(url = key, depth, ?verdict, "enqueue");
        verdict
    }

    /// Pops the next unit in discovery order
    ///
    /// Returns `None` when the queue is empty or the page budget is spent. The
    /// pop is in memory only; the persisted queue still holds the unit until
    /// its outcome is recorded.
    pub fn next_unit(&mut self) -> Option<QueuedUnit> {
        if self.session.budget_exhausted() {
            return None;
        }
        let unit = self.session.queue.pop_front()?;
        self.queued.remove(&unit.url);
        Some(unit)
    }

    /// Commits a processed unit and queues its in-scope links at depth + 1
    ///
    /// Must be called once per unit. Returns the number of links queued.
    pub async fn record_outcome(
        &mut self,
        unit: &QueuedUnit,
        record: PageRecord,
        new_links: &[Url],
    ) -> Result<usize, StorageError> {
        self.session.visited.insert(unit.url.clone(), record);

        let child_depth = unit.depth + 1;
        let queued = new_links
            .iter()
            .filter(|link| self.enqueue(link, child_depth).is_queued())
            .count();

        self.persist().await?;
        Ok(queued)
    }

    /// Commits a unit that failed; it does not count toward the page budget
    pub async fn record_failure(
        &mut self,
        unit: &QueuedUnit,
        error: impl Into<String>,
    ) -> Result<(), StorageError> {
        self.session.failed.insert(
            unit.url.clone(),
            FailedUnit {
                depth: unit.depth,
                error: error.into(),
                failed_at: Utc::now(),
            },
        );
        self.persist().await
    }

    /// Puts an uncommitted unit back at the head of the queue
    pub fn release(&mut self, unit: QueuedUnit) {
        self.queued.insert(unit.url.clone());
        self.session.queue.push_front(unit);
    }

    /// Marks the session finished and persists it
    pub async fn finish(&mut self) -> Result<(), StorageError> {
        self.session.is_active = false;
        self.persist().await
    }

    /// Cumulative progress: visited over the smaller of the budget and the
    /// currently known total
    pub fn percentage(&self) -> f64 {
        let visited = self.session.visited.len();
        let known = visited + self.session.queue.len();
        percentage(visited, self.session.max_pages.min(known))
    }

    pub fn prior_record(&self, url: &str) -> Option<&PageRecord> {
        self.session.prior_record(url)
    }

    pub fn output_dir(&self) -> &Path {
        &self.session.output_directory
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    pub fn queue_len(&self) -> usize {
        self.session.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.session.visited.len()
    }

    async fn persist(&mut self) -> Result<(), StorageError> {
        self.session.touch();
        storage::save_session(&self.session).await
    }
}

fn queued_urls(session: &CrawlSession) -> HashSet<String> {
    session.queue.iter().map(|unit| unit.url.clone()).collect()
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
