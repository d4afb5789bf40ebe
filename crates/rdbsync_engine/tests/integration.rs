//! Integration tests for the sync engine and verifier against in-memory stores.

use proptest::prelude::*;
use rdbsync_engine::{SyncError, SyncState};
use rdbsync_protocol::{
    DataValue, Provenance, ResultRecord, ResultsQuery, Sort, SubmitTime, ORIGIN_FLAG_KEY,
    ORIGIN_ID_KEY, SUBMIT_TIME_FIELD,
};
use rdbsync_testkit::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing_test::traced_test;

fn copied_source_ids(fixture: &SyncFixture) -> Vec<i64> {
    fixture
        .destination
        .results()
        .iter()
        .map(|copy| Provenance::extract(&copy.data).unwrap().source_id)
        .collect()
}

fn scenario() -> SyncFixture {
    let fixture = SyncFixture::new();
    fixture.seed_source([
        ResultRecord::new(1, "T1").with_data("outcome", "PASSED"),
        ResultRecord::new(2, "T2").with_data("outcome", "FAILED"),
    ]);
    fixture
}

#[test]
fn first_pass_copies_everything_and_second_pass_nothing() {
    let fixture = scenario();
    let engine = fixture.engine(50);

    assert_eq!(engine.discover_cursor().unwrap(), None);

    let first = engine.sync_once().unwrap();
    assert_eq!(first.since, None);
    assert_eq!(first.fetched, 2);
    assert_eq!(first.copied, 2);
    assert_eq!(first.skipped, 0);
    assert_eq!(fixture.destination.len(), 2);
    assert_eq!(engine.state(), SyncState::Synced);

    assert_eq!(
        engine.discover_cursor().unwrap(),
        Some(SubmitTime::from("T2"))
    );

    let second = engine.sync_once().unwrap();
    assert_eq!(second.since, Some(SubmitTime::from("T2")));
    assert_eq!(second.copied, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(fixture.destination.len(), 2);

    let stats = engine.stats();
    assert_eq!(stats.passes_completed, 2);
    assert_eq!(stats.results_copied, 2);
    assert_eq!(stats.results_skipped, 1);
    assert!(stats.last_sync_time.is_some());
    assert!(stats.last_error.is_none());
}

#[test]
fn new_source_results_are_picked_up() {
    let fixture = scenario();
    let engine = fixture.engine(50);
    engine.sync_once().unwrap();

    fixture.seed_source([ResultRecord::new(3, "T3").with_data("outcome", "PASSED")]);
    let pass = engine.sync_once().unwrap();

    assert_eq!(pass.since, Some(SubmitTime::from("T2")));
    assert_eq!(pass.copied, 1);
    assert_eq!(copied_source_ids(&fixture), vec![1, 2, 3]);
}

#[test]
fn cursor_ignores_native_destination_results() {
    let fixture = scenario();
    fixture
        .destination
        .insert(ResultRecord::new(500, 999).with_data("outcome", "PASSED"));

    let engine = fixture.engine(50);
    assert_eq!(engine.discover_cursor().unwrap(), None);

    engine.sync_once().unwrap();
    assert_eq!(
        engine.discover_cursor().unwrap(),
        Some(SubmitTime::from("T2"))
    );
    assert_eq!(fixture.destination.len(), 3);
}

#[test]
fn already_copied_results_are_never_posted_again() {
    let fixture = SyncFixture::new();
    fixture.seed_source((1..=4).map(|id| ci_result(id, format!("T{id}"), "PASSED")));

    let destination = fixture.destination_client();
    for id in [1, 2] {
        destination
            .create_result(fixture.source.get(id).unwrap())
            .unwrap();
    }
    fixture.destination.clear_requests();

    // Results sharing the cursor's submit time must be checked, not assumed.
    fixture.source.set_submit_time(3, "T2");

    let pass = fixture.engine(50).sync_once().unwrap();
    assert_eq!(pass.since, Some(SubmitTime::from("T2")));
    assert_eq!(pass.copied, 2);
    assert_eq!(pass.skipped, 1);
    assert_eq!(fixture.destination.post_count(), 2);
    assert_eq!(copied_source_ids(&fixture), vec![1, 2, 3, 4]);
}

#[test]
fn copies_keep_fields_and_data() {
    let fixture = SyncFixture::new();
    fixture.seed_source([ci_result(7, "2017-06-12T10:00:00.000000", "NEEDS_INSPECTION")]);

    fixture.engine(50).sync_once().unwrap();

    let original = fixture.source.get(7).unwrap();
    let copy = fixture.destination.results().remove(0);
    assert_ne!(copy.submit_time, original.submit_time);
    assert_eq!(copy.fields["outcome"], original.fields["outcome"]);
    assert_eq!(copy.fields["testcase"], original.fields["testcase"]);

    let (provenance, data) = Provenance::strip(copy.data).unwrap();
    assert_eq!(provenance.source_id, 7);
    assert_eq!(provenance.source_submit_time, original.submit_time);
    assert_eq!(data, original.data);
}

#[test]
fn numeric_submit_times_round_trip() {
    let fixture = SyncFixture::new();
    fixture.seed_source((1..=3).map(|id| ci_result(id, 1_500_000_000 + id, "PASSED")));

    let engine = fixture.engine(2);
    engine.sync_once().unwrap();

    // The destination hands the numeric cursor back as text.
    assert_eq!(
        engine.discover_cursor().unwrap(),
        Some(SubmitTime::from("1500000003"))
    );
    assert_eq!(engine.sync_once().unwrap().copied, 0);
    assert_eq!(fixture.verifier(2).verify().unwrap().verified, 3);
}

#[test]
fn pagination_visits_every_result_once_in_order() {
    let fixture = SyncFixture::new();
    fixture.seed_source((1..=7).map(|id| ci_result(id, format!("T{id}"), "PASSED")));
    let source = fixture.source_client();

    let ascending = ResultsQuery::new()
        .sort(Sort::ascending(SUBMIT_TIME_FIELD))
        .limit(2);
    let ids: Vec<i64> = source
        .get_results(&ascending)
        .map(|r| r.unwrap().id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);

    let descending = ResultsQuery::new()
        .sort(Sort::descending(SUBMIT_TIME_FIELD))
        .limit(3);
    let ids: Vec<i64> = source
        .get_results(&descending)
        .map(|r| r.unwrap().id)
        .collect();
    assert_eq!(ids, vec![7, 6, 5, 4, 3, 2, 1]);

    // 7 results at 2 per page: 4 pages.
    let mut iter = source.get_results(&ascending);
    assert_eq!(iter.by_ref().count(), 7);
    assert_eq!(iter.pages_fetched(), 4);
}

#[test]
fn interrupted_pass_resumes_without_duplicates() {
    let fixture = SyncFixture::new();
    fixture.seed_source((1..=6).map(|id| ci_result(id, format!("T{id}"), "PASSED")));

    // Cursor lookup, then (check, create) for results 1..=3, then the
    // duplicate check for result 4 fails.
    fixture.destination.fail_after(7, 503);

    let engine = fixture.engine(2);
    let err = engine.sync_once().unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(engine.state(), SyncState::Error);
    assert!(engine.stats().last_error.is_some());
    assert_eq!(copied_source_ids(&fixture), vec![1, 2, 3]);

    fixture.destination.heal();
    let pass = engine.sync_once().unwrap();
    assert_eq!(pass.since, Some(SubmitTime::from("T3")));
    assert_eq!(pass.skipped, 1);
    assert_eq!(pass.copied, 3);
    assert_eq!(copied_source_ids(&fixture), vec![1, 2, 3, 4, 5, 6]);
    assert!(engine.stats().last_error.is_none());
}

#[test]
fn source_failure_aborts_pass() {
    let fixture = scenario();
    fixture.source.fail_after(0, 500);

    let err = fixture.engine(50).sync_once().unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 500, .. }));
    assert!(fixture.destination.is_empty());
}

#[test]
fn credential_is_sent_with_every_copy() {
    let fixture = SyncFixture::with_token("s3cret");
    fixture.seed_source([ci_result(1, "T1", "PASSED")]);

    fixture.engine(50).sync_once().unwrap();
    assert_eq!(fixture.destination.len(), 1);
}

#[test]
fn rejected_credential_is_fatal() {
    let fixture = SyncFixture::new();
    fixture.seed_source([ci_result(1, "T1", "PASSED")]);
    let fixture = SyncFixture {
        destination: MemoryResultStore::new(DESTINATION_URL).with_required_token("other"),
        ..fixture
    };

    let err = fixture.engine(50).sync_once().unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(fixture.destination.is_empty());
}

#[test]
fn polling_stops_at_the_first_failed_pass() {
    let fixture = scenario();
    let engine = rdbsync_engine::SyncEngine::new(
        fixture.config(50).with_poll_interval(Duration::ZERO),
        fixture.source_client(),
        fixture.destination_client(),
    );

    // First pass: cursor lookup plus (check, create) for both results.
    fixture.destination.fail_after(5, 503);

    let err = engine.run().unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(engine.stats().passes_completed, 1);
    assert_eq!(fixture.destination.len(), 2);
}

#[test]
fn one_shot_run_returns_after_a_pass() {
    let fixture = scenario();
    let engine = fixture.engine(50);
    engine.run().unwrap();
    assert_eq!(engine.stats().passes_completed, 1);
    assert_eq!(fixture.destination.len(), 2);
}

#[test]
fn verifier_accepts_faithful_copies() {
    let fixture = SyncFixture::new();
    fixture.seed_source((1..=5).map(|id| ci_result(id, format!("T{id}"), "PASSED")));
    fixture.engine(2).sync_once().unwrap();
    fixture
        .destination
        .insert(ResultRecord::new(900, 900).with_data("outcome", "PASSED"));

    let report = fixture.verifier(2).verify().unwrap();
    assert_eq!(report.verified, 5);
    assert_eq!(report.latest_source_submit_time, Some(SubmitTime::from("T5")));
    assert_eq!(report.latest_synced_submit_time, Some(SubmitTime::from("T5")));
}

#[test]
fn verifier_reports_sync_lag() {
    let fixture = scenario();
    fixture.engine(50).sync_once().unwrap();
    fixture.seed_source([ci_result(3, "T3", "PASSED")]);

    let report = fixture.verifier(50).verify().unwrap();
    assert_eq!(report.verified, 2);
    assert_eq!(report.latest_source_submit_time, Some(SubmitTime::from("T3")));
    assert_eq!(report.latest_synced_submit_time, Some(SubmitTime::from("T2")));
}

#[test]
fn verifier_on_empty_destination() {
    let fixture = scenario();
    let report = fixture.verifier(50).verify().unwrap();
    assert_eq!(report.verified, 0);
    assert_eq!(report.latest_synced_submit_time, None);
    assert_eq!(report.latest_source_submit_time, Some(SubmitTime::from("T2")));
}

#[test]
fn verifier_detects_data_drift() {
    let fixture = scenario();
    fixture.engine(50).sync_once().unwrap();
    fixture.source.set_data(2, "outcome", "PASSED");

    match fixture.verifier(50).verify().unwrap_err() {
        SyncError::VerificationMismatch {
            source_id, reason, ..
        } => {
            assert_eq!(source_id, 2);
            assert!(reason.contains("outcome"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[traced_test]
#[test]
fn verifier_logs_both_payloads_on_mismatch() {
    let fixture = scenario();
    fixture.engine(50).sync_once().unwrap();
    fixture.source.set_data(2, "outcome", "PASSED");

    let err = fixture.verifier(50).verify().unwrap_err();
    assert!(matches!(err, SyncError::VerificationMismatch { .. }));

    let copy = fixture
        .destination
        .results()
        .into_iter()
        .find(|r| Provenance::extract(&r.data).unwrap().source_id == 2)
        .unwrap();
    let original = fixture.source.get(2).unwrap();

    assert!(logs_contain("copied result does not match its source"));
    assert!(logs_contain(&serde_json::to_string(&copy).unwrap()));
    assert!(logs_contain(&serde_json::to_string(&original).unwrap()));
}

#[test]
fn verifier_detects_submit_time_drift() {
    let fixture = scenario();
    fixture.engine(50).sync_once().unwrap();
    fixture.source.set_submit_time(1, "T0");

    match fixture.verifier(50).verify().unwrap_err() {
        SyncError::VerificationMismatch {
            source_id, reason, ..
        } => {
            assert_eq!(source_id, 1);
            assert!(reason.contains("submit_time"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn verifier_fails_when_source_vanished() {
    let fixture = scenario();
    fixture.engine(50).sync_once().unwrap();
    fixture.source.remove(1);

    match fixture.verifier(50).verify().unwrap_err() {
        SyncError::NotFound { url, body } => {
            assert!(url.ends_with("/v2.0/results/1"));
            assert!(body.contains("Result not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn verifier_rejects_incomplete_provenance() {
    let fixture = scenario();
    fixture.destination.insert(
        ResultRecord::new(77, 1)
            .with_data(ORIGIN_FLAG_KEY, true)
            .with_data("outcome", "PASSED"),
    );

    match fixture.verifier(50).verify().unwrap_err() {
        SyncError::Provenance { id, source } => {
            assert_eq!(id, 77);
            assert!(source.to_string().contains(ORIGIN_ID_KEY));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn stored_annotations_are_list_wrapped() {
    let fixture = scenario();
    fixture.engine(50).sync_once().unwrap();

    let copy = fixture.destination.results().remove(0);
    assert_eq!(
        copy.data[ORIGIN_ID_KEY],
        DataValue::List(vec![DataValue::Text("1".into())])
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_source_result_is_copied_exactly_once(
        results in source_results_strategy(25),
        page_size in 1u32..6,
    ) {
        let fixture = SyncFixture::new();
        fixture.seed_source(results.clone());
        let engine = fixture.engine(page_size);

        let first = engine.sync_once().unwrap();
        prop_assert_eq!(first.copied as usize, results.len());

        let second = engine.sync_once().unwrap();
        prop_assert_eq!(second.copied, 0);

        let copied = copied_source_ids(&fixture);
        let unique: BTreeSet<i64> = copied.iter().copied().collect();
        prop_assert_eq!(copied.len(), unique.len());
        prop_assert_eq!(unique, results.iter().map(|r| r.id).collect::<BTreeSet<_>>());

        let expected_cursor = results.iter().map(|r| r.submit_time.clone()).max();
        prop_assert_eq!(engine.discover_cursor().unwrap(), expected_cursor);

        prop_assert_eq!(fixture.verifier(page_size).verify().unwrap().verified as usize, results.len());
    }

    #[test]
    fn interrupted_passes_converge(
        results in source_results_strategy(15),
        ok_requests in 0usize..40,
    ) {
        let fixture = SyncFixture::new();
        fixture.seed_source(results.clone());
        fixture.destination.fail_after(ok_requests, 503);

        let engine = fixture.engine(3);
        let _ = engine.sync_once();

        fixture.destination.heal();
        engine.sync_once().unwrap();

        let copied = copied_source_ids(&fixture);
        prop_assert_eq!(copied.len(), results.len());
        prop_assert_eq!(
            copied.into_iter().collect::<BTreeSet<_>>(),
            results.iter().map(|r| r.id).collect::<BTreeSet<_>>()
        );
    }
}
