//! Property-based test generators using proptest.
//!
//! Provides strategies for source stores whose contents respect the
//! invariants a real ResultsDB keeps: unique ids and submit times that never
//! decrease in insertion order.

use proptest::prelude::*;
use rdbsync_protocol::{ResultRecord, SubmitTime};

/// Strategy for outcome strings.
pub fn outcome_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("PASSED".to_string()),
        Just("FAILED".to_string()),
        Just("INFO".to_string()),
        Just("NEEDS_INSPECTION".to_string()),
    ]
}

/// Formats a second offset as an ISO-8601 submit time.
pub fn iso_submit_time(offset_secs: u32) -> SubmitTime {
    let days = offset_secs / 86_400;
    let rest = offset_secs % 86_400;
    SubmitTime::Text(format!(
        "2017-{:02}-{:02}T{:02}:{:02}:{:02}.000000",
        1 + (days / 28) % 12,
        1 + days % 28,
        rest / 3600,
        (rest / 60) % 60,
        rest % 60
    ))
}

/// Strategy for a source store's contents.
///
/// Ids start at 1 and increase; submit times increase by 0..3 seconds per
/// result, so several results may share one submit time.
pub fn source_results_strategy(max_len: usize) -> impl Strategy<Value = Vec<ResultRecord>> {
    prop::collection::vec((0u32..3, outcome_strategy()), 0..=max_len).prop_map(|steps| {
        let mut offset = 0u32;
        steps
            .into_iter()
            .zip(1i64..)
            .map(|((step, outcome), id)| {
                offset += step;
                ResultRecord::new(id, iso_submit_time(offset)).with_data("outcome", outcome)
            })
            .collect()
    })
}
