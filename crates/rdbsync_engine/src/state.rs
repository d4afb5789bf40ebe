//! Sync engine state machine.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::http::HttpClient;
use crate::store::ResultStore;
use parking_lot::RwLock;
use rdbsync_protocol::{Provenance, ResultsQuery, Sort, SubmitTime, SUBMIT_TIME_FIELD};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine has not run a pass yet.
    Idle,
    /// Engine is looking up the resume cursor in the destination.
    DiscoverCursor,
    /// Engine is reading the next source result (and page, if needed).
    FetchPage,
    /// Engine is checking whether the current result was already copied.
    DuplicateCheck,
    /// Engine is writing the current result into the destination.
    Copying,
    /// Engine has completed a pass.
    Synced,
    /// Engine is waiting for the next pass in polling mode.
    Sleeping,
    /// Engine aborted a pass on an error.
    Error,
}

impl SyncState {
    /// Returns true if the engine is in the middle of a pass.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::DiscoverCursor
                | SyncState::FetchPage
                | SyncState::DuplicateCheck
                | SyncState::Copying
        )
    }
}

/// Statistics accumulated across passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Number of passes completed successfully.
    pub passes_completed: u64,
    /// Total number of results copied.
    pub results_copied: u64,
    /// Total number of results skipped as already copied.
    pub results_skipped: u64,
    /// When the last successful pass finished.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a single pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPassResult {
    /// Cursor the pass resumed from; `None` means from the beginning.
    pub since: Option<SubmitTime>,
    /// Source results read.
    pub fetched: u64,
    /// Results written into the destination.
    pub copied: u64,
    /// Results skipped because a copy already existed.
    pub skipped: u64,
    /// Wall time of the pass.
    pub duration: Duration,
}

impl SyncPassResult {
    fn new(since: Option<SubmitTime>) -> Self {
        Self {
            since,
            fetched: 0,
            copied: 0,
            skipped: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Copies new results from a source store into a destination store.
///
/// The engine keeps no position of its own: every pass rediscovers the
/// cursor from the newest copy in the destination, then walks the source
/// forward from there, skipping anything already copied.
pub struct SyncEngine<S: HttpClient, D: HttpClient> {
    config: SyncConfig,
    source: ResultStore<S>,
    destination: ResultStore<D>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<S: HttpClient, D: HttpClient> SyncEngine<S, D> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, source: ResultStore<S>, destination: ResultStore<D>) -> Self {
        Self {
            config,
            source,
            destination,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the source store client.
    pub fn source(&self) -> &ResultStore<S> {
        &self.source
    }

    /// Returns the destination store client.
    pub fn destination(&self) -> &ResultStore<D> {
        &self.destination
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Finds the source submit time of the newest copy in the destination.
    ///
    /// Returns `None` when the destination holds no copies yet.
    pub fn discover_cursor(&self) -> SyncResult<Option<SubmitTime>> {
        let query = ResultsQuery::copied().sort(Sort::descending(SUBMIT_TIME_FIELD));
        let Some(newest) = self.destination.latest_result(&query)? else {
            return Ok(None);
        };

        Provenance::submit_time(&newest.data)
            .map(Some)
            .map_err(|source| SyncError::Provenance {
                id: newest.id,
                source,
            })
    }

    /// Returns true if the destination already holds a copy of `source_id`.
    pub fn is_copied(&self, source_id: i64) -> SyncResult<bool> {
        Ok(self
            .destination
            .latest_result(&ResultsQuery::copy_of(source_id))?
            .is_some())
    }

    /// Runs one pass: discover the cursor, then copy every new result.
    ///
    /// Any error aborts the pass. Results copied before the error stay in
    /// the destination and are skipped by the next pass.
    pub fn sync_once(&self) -> SyncResult<SyncPassResult> {
        let start = Instant::now();

        match self.pass() {
            Ok(mut result) => {
                result.duration = start.elapsed();
                self.set_state(SyncState::Synced);

                let mut stats = self.stats.write();
                stats.passes_completed += 1;
                stats.results_copied += result.copied;
                stats.results_skipped += result.skipped;
                stats.last_sync_time = Some(Instant::now());
                stats.last_error = None;
                drop(stats);

                info!(
                    fetched = result.fetched,
                    copied = result.copied,
                    skipped = result.skipped,
                    elapsed_ms = result.duration.as_millis() as u64,
                    "sync complete"
                );
                Ok(result)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Runs passes until one fails, or once if no poll interval is set.
    pub fn run(&self) -> SyncResult<()> {
        loop {
            self.sync_once()?;

            let Some(interval) = self.config.poll_interval else {
                return Ok(());
            };

            info!(
                seconds = interval.as_secs(),
                "sleeping before the next sync"
            );
            self.set_state(SyncState::Sleeping);
            std::thread::sleep(interval);
        }
    }

    fn pass(&self) -> SyncResult<SyncPassResult> {
        self.set_state(SyncState::DiscoverCursor);
        info!(destination = %self.destination.base_url(), "discovering the last sync time");
        let since = self.discover_cursor()?;

        match &since {
            Some(since) => info!(
                source = %self.source.base_url(),
                %since,
                "querying for results since the last sync"
            ),
            None => info!(
                source = %self.source.base_url(),
                "first sync, querying for all results"
            ),
        }

        let query = ResultsQuery::new()
            .since(since.clone())
            .sort(Sort::ascending(SUBMIT_TIME_FIELD))
            .limit(self.config.page_size);

        let mut result = SyncPassResult::new(since);

        self.set_state(SyncState::FetchPage);
        for record in self.source.get_results(&query) {
            let record = record?;
            result.fetched += 1;

            self.set_state(SyncState::DuplicateCheck);
            if self.is_copied(record.id)? {
                debug!(
                    source_id = record.id,
                    "skipping result, already present in the destination"
                );
                result.skipped += 1;
            } else {
                self.set_state(SyncState::Copying);
                self.destination.create_result(record)?;
                result.copied += 1;
            }

            self.set_state(SyncState::FetchPage);
        }

        Ok(result)
    }

    fn handle_error(&self, error: &SyncError) {
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}
