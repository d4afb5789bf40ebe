//! Audit of results already copied into the destination.
//!
//! The verifier re-reads every copy, fetches the source result it claims
//! to come from, and checks the two still agree. It reports, it never
//! repairs: the first disagreement ends the run.

use crate::error::{SyncError, SyncResult};
use crate::http::HttpClient;
use crate::store::ResultStore;
use rdbsync_protocol::{
    Provenance, ResultData, ResultRecord, ResultsQuery, Sort, SubmitTime, SUBMIT_TIME_FIELD,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Outcome of a clean verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    /// Copies checked against their source.
    pub verified: u64,
    /// Newest submit time in the source store.
    pub latest_source_submit_time: Option<SubmitTime>,
    /// Source submit time of the newest copy in the destination.
    pub latest_synced_submit_time: Option<SubmitTime>,
    /// Wall time of the run.
    pub duration: Duration,
}

/// Cross-checks destination copies against the source store.
pub struct Verifier<S: HttpClient, D: HttpClient> {
    source: ResultStore<S>,
    destination: ResultStore<D>,
    page_size: u32,
}

impl<S: HttpClient, D: HttpClient> Verifier<S, D> {
    /// Creates a verifier reading copies `page_size` at a time.
    pub fn new(source: ResultStore<S>, destination: ResultStore<D>, page_size: u32) -> Self {
        Self {
            source,
            destination,
            page_size: page_size.max(1),
        }
    }

    /// Checks every copy in the destination, oldest first.
    ///
    /// Stops at the first mismatch with [`SyncError::VerificationMismatch`],
    /// after logging both payloads.
    pub fn verify(&self) -> SyncResult<VerifyReport> {
        let start = Instant::now();
        let query = ResultsQuery::copied()
            .sort(Sort::ascending(SUBMIT_TIME_FIELD))
            .limit(self.page_size);

        info!(destination = %self.destination.base_url(), "verifying copied results");

        let mut verified = 0u64;
        for copy in self.destination.get_results(&query) {
            self.verify_copy(&copy?)?;
            verified += 1;
        }

        let report = VerifyReport {
            verified,
            latest_source_submit_time: self.latest_source_submit_time()?,
            latest_synced_submit_time: self.latest_synced_submit_time()?,
            duration: start.elapsed(),
        };

        info!(verified = report.verified, "all copied results match their source");
        info!(
            source = %self.source.base_url(),
            latest = %display_or_none(&report.latest_source_submit_time),
            "most recent source result"
        );
        info!(
            destination = %self.destination.base_url(),
            latest = %display_or_none(&report.latest_synced_submit_time),
            "most recent synced result"
        );

        Ok(report)
    }

    /// Checks one destination copy against its source result.
    pub fn verify_copy(&self, copy: &ResultRecord) -> SyncResult<()> {
        let (provenance, data) =
            Provenance::strip(copy.data.clone()).map_err(|source| SyncError::Provenance {
                id: copy.id,
                source,
            })?;

        let original = self.source.get_result(provenance.source_id)?;

        if !original
            .submit_time
            .same_instant(&provenance.source_submit_time)
        {
            let reason = format!(
                "submit_time {} recorded, source has {}",
                provenance.source_submit_time, original.submit_time
            );
            return Err(mismatch(copy, &original, reason));
        }

        if original.data != data {
            let reason = format!("data differs at keys: {}", differing_keys(&original.data, &data));
            return Err(mismatch(copy, &original, reason));
        }

        debug!(
            destination_id = copy.id,
            source_id = original.id,
            "copy matches source"
        );
        Ok(())
    }

    fn latest_source_submit_time(&self) -> SyncResult<Option<SubmitTime>> {
        let query = ResultsQuery::new().sort(Sort::descending(SUBMIT_TIME_FIELD));
        Ok(self
            .source
            .latest_result(&query)?
            .map(|result| result.submit_time))
    }

    fn latest_synced_submit_time(&self) -> SyncResult<Option<SubmitTime>> {
        let query = ResultsQuery::copied().sort(Sort::descending(SUBMIT_TIME_FIELD));
        match self.destination.latest_result(&query)? {
            Some(newest) => Provenance::submit_time(&newest.data)
                .map(Some)
                .map_err(|source| SyncError::Provenance {
                    id: newest.id,
                    source,
                }),
            None => Ok(None),
        }
    }
}

fn mismatch(copy: &ResultRecord, original: &ResultRecord, reason: String) -> SyncError {
    error!(
        destination_id = copy.id,
        source_id = original.id,
        %reason,
        destination = %serde_json::to_string(copy).unwrap_or_default(),
        source = %serde_json::to_string(original).unwrap_or_default(),
        "copied result does not match its source"
    );
    SyncError::VerificationMismatch {
        destination_id: copy.id,
        source_id: original.id,
        reason,
    }
}

fn differing_keys(left: &ResultData, right: &ResultData) -> String {
    let mut keys: Vec<&str> = left
        .iter()
        .filter(|(key, value)| right.get(*key) != Some(*value))
        .map(|(key, _)| key.as_str())
        .chain(
            right
                .keys()
                .filter(|key| !left.contains_key(*key))
                .map(String::as_str),
        )
        .collect();
    keys.sort_unstable();
    keys.join(", ")
}

fn display_or_none(value: &Option<SubmitTime>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}
