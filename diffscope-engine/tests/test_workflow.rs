//! Integration tests for the workflow engine: routing, error sinking,
//! timeouts, panic containment, and boundary cancellation.
//!
//! Uses scripted stages so no real checkout is needed.

mod common;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use diffscope_core::domain::scan::{ScanState, ScanType};
use diffscope_core::domain::stage::{StageErrorKind, StageName};
use diffscope_engine::application::engine::{NoopObserver, RunObserver, RunOutcome};
use diffscope_engine::application::progress::ProgressTracker;

use common::*;

const PR_PATH: [StageName; 6] = [
    StageName::Fetch,
    StageName::Parse,
    StageName::StaticAnalysis,
    StageName::ImpactAnalysis,
    StageName::LlmAnalysis,
    StageName::Reporting,
];

const PROJECT_PATH: [StageName; 6] = [
    StageName::Fetch,
    StageName::Parse,
    StageName::StaticAnalysis,
    StageName::ProjectScan,
    StageName::LlmAnalysis,
    StageName::Reporting,
];

// ── Routing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pr_run_traverses_impact_path() {
    let log = new_log();
    let engine = engine_with(scripted_registry(&log, &[]), Duration::from_secs(5));
    let state = state_for(&pr_request("/tmp/checkout"));
    let scan_id = state.scan_id;

    let (final_state, outcome) = engine
        .run(state, &CancellationToken::new(), &NoopObserver)
        .await;

    assert!(matches!(outcome, RunOutcome::Completed));
    assert_eq!(stages_for(&log, scan_id).await, PR_PATH.to_vec());
    let report = final_state.report.expect("completed run carries a report");
    assert!(!report.partial);
}

#[tokio::test]
async fn test_project_run_traverses_project_path() {
    let log = new_log();
    let engine = engine_with(scripted_registry(&log, &[]), Duration::from_secs(5));
    let state = state_for(&project_request("/tmp/checkout"));
    let scan_id = state.scan_id;

    let (_, outcome) = engine
        .run(state, &CancellationToken::new(), &NoopObserver)
        .await;

    assert!(matches!(outcome, RunOutcome::Completed));
    let executed = stages_for(&log, scan_id).await;
    assert_eq!(executed, PROJECT_PATH.to_vec());
    assert!(!executed.contains(&StageName::ImpactAnalysis));
}

// ── Error sinking ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failure_at_every_pr_stage_reaches_the_sink() {
    for failing in [
        StageName::Fetch,
        StageName::Parse,
        StageName::StaticAnalysis,
        StageName::ImpactAnalysis,
        StageName::LlmAnalysis,
        StageName::Reporting,
    ] {
        let log = new_log();
        let registry =
            scripted_registry(&log, &[(failing, StageBehavior::Fail("injected failure"))]);
        let engine = engine_with(registry, Duration::from_secs(5));
        let state = state_for(&pr_request("/tmp/checkout"));
        let scan_id = state.scan_id;

        let (final_state, outcome) = engine
            .run(state, &CancellationToken::new(), &NoopObserver)
            .await;

        let RunOutcome::Failed(failure) = outcome else {
            panic!("injected failure at {failing} must fail the run");
        };
        assert_eq!(failure.stage, failing);
        assert_eq!(failure.kind, StageErrorKind::Execution);

        let executed = stages_for(&log, scan_id).await;
        assert_eq!(
            executed.last(),
            Some(&StageName::ErrorHandler),
            "sink must run after {failing} fails"
        );

        let report = final_state.report.expect("sink produces a partial report");
        assert!(report.partial);
        assert_eq!(
            report.error.expect("partial report names the failure").stage,
            failing
        );
    }
}

#[tokio::test]
async fn test_failed_stage_leaves_no_partial_mutations() {
    // A failing stage's in-flight state changes are discarded: the sink sees
    // the state as the failing stage received it.
    let log = new_log();
    let registry = scripted_registry(
        &log,
        &[(StageName::ImpactAnalysis, StageBehavior::Fail("boom"))],
    );
    let engine = engine_with(registry, Duration::from_secs(5));
    let state = state_for(&pr_request("/tmp/checkout"));

    let (final_state, _) = engine
        .run(state, &CancellationToken::new(), &NoopObserver)
        .await;

    assert!(final_state.impact.is_none());
    assert_eq!(
        final_state.error.expect("failure recorded").stage,
        StageName::ImpactAnalysis
    );
}

#[tokio::test]
async fn test_sink_failure_still_terminates_with_original_error() {
    let log = new_log();
    let registry = scripted_registry(
        &log,
        &[
            (StageName::Fetch, StageBehavior::Fail("fetch exploded")),
            (StageName::ErrorHandler, StageBehavior::Fail("sink broken")),
        ],
    );
    let engine = engine_with(registry, Duration::from_secs(5));
    let state = state_for(&pr_request("/tmp/checkout"));

    let (final_state, outcome) = engine
        .run(state, &CancellationToken::new(), &NoopObserver)
        .await;

    let RunOutcome::Failed(failure) = outcome else {
        panic!("run must fail");
    };
    assert_eq!(failure.stage, StageName::Fetch, "original failure wins");
    assert_eq!(failure.message, "fetch exploded");
    assert!(final_state.report.is_none(), "broken sink produced nothing");
}

// ── Timeout and panic classification ─────────────────────────────────────────

#[tokio::test]
async fn test_stage_timeout_is_classified() {
    let log = new_log();
    let registry = scripted_registry(
        &log,
        &[(
            StageName::Parse,
            StageBehavior::SucceedAfter(Duration::from_secs(10)),
        )],
    );
    let engine = engine_with(registry, Duration::from_millis(100));
    let state = state_for(&project_request("/tmp/checkout"));

    let (_, outcome) = engine
        .run(state, &CancellationToken::new(), &NoopObserver)
        .await;

    let RunOutcome::Failed(failure) = outcome else {
        panic!("timeout must fail the run");
    };
    assert_eq!(failure.stage, StageName::Parse);
    assert_eq!(failure.kind, StageErrorKind::Timeout);
}

#[tokio::test]
async fn test_stage_panic_is_contained() {
    let log = new_log();
    let registry = scripted_registry(
        &log,
        &[(StageName::StaticAnalysis, StageBehavior::Panic("rule blew up"))],
    );
    let engine = engine_with(registry, Duration::from_secs(5));
    let state = state_for(&project_request("/tmp/checkout"));

    let (_, outcome) = engine
        .run(state, &CancellationToken::new(), &NoopObserver)
        .await;

    let RunOutcome::Failed(failure) = outcome else {
        panic!("panic must fail the run");
    };
    assert_eq!(failure.stage, StageName::StaticAnalysis);
    assert_eq!(failure.kind, StageErrorKind::Panic);
    assert!(failure.message.contains("rule blew up"));
}

// ── Cancellation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancelled_before_start_runs_no_stage() {
    let log = new_log();
    let engine = engine_with(scripted_registry(&log, &[]), Duration::from_secs(5));
    let state = state_for(&pr_request("/tmp/checkout"));
    let scan_id = state.scan_id;

    let token = CancellationToken::new();
    token.cancel();

    let (_, outcome) = engine.run(state, &token, &NoopObserver).await;

    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert!(stages_for(&log, scan_id).await.is_empty());
}

#[tokio::test]
async fn test_cancellation_honored_at_stage_boundary() {
    let log = new_log();
    let token = CancellationToken::new();
    let registry = scripted_registry(
        &log,
        &[(
            StageName::Fetch,
            StageBehavior::CancelThenSucceed(token.clone()),
        )],
    );
    let engine = engine_with(registry, Duration::from_secs(5));
    let state = state_for(&pr_request("/tmp/checkout"));
    let scan_id = state.scan_id;

    let (_, outcome) = engine.run(state, &token, &NoopObserver).await;

    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert_eq!(
        stages_for(&log, scan_id).await,
        vec![StageName::Fetch],
        "the in-flight stage finishes, nothing further executes"
    );
}

// ── Progress observation ─────────────────────────────────────────────────────

struct RecordingObserver {
    tracker: ProgressTracker,
    scan_type: ScanType,
    percents: Mutex<Vec<Option<u8>>>,
}

#[async_trait]
impl RunObserver for RecordingObserver {
    async fn stage_completed(&self, stage: StageName, _state: &ScanState) {
        self.percents
            .lock()
            .await
            .push(self.tracker.percent_after(self.scan_type, stage));
    }
}

#[tokio::test]
async fn test_observed_progress_is_monotone_and_completes_at_100() {
    let log = new_log();
    let engine = engine_with(scripted_registry(&log, &[]), Duration::from_secs(5));
    let state = state_for(&project_request("/tmp/checkout"));

    let observer = RecordingObserver {
        tracker: ProgressTracker::standard(),
        scan_type: ScanType::Project,
        percents: Mutex::new(Vec::new()),
    };

    let (_, outcome) = engine
        .run(state, &CancellationToken::new(), &observer)
        .await;
    assert!(matches!(outcome, RunOutcome::Completed));

    let percents: Vec<u8> = observer
        .percents
        .into_inner()
        .into_iter()
        .map(|p| p.expect("every on-path stage has a percentage"))
        .collect();

    assert_eq!(percents.len(), PROJECT_PATH.len());
    assert!(percents.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn test_failed_run_never_reports_100() {
    let log = new_log();
    let registry = scripted_registry(
        &log,
        &[(StageName::LlmAnalysis, StageBehavior::Fail("provider down"))],
    );
    let engine = engine_with(registry, Duration::from_secs(5));
    let state = state_for(&pr_request("/tmp/checkout"));

    let observer = RecordingObserver {
        tracker: ProgressTracker::standard(),
        scan_type: ScanType::Pr,
        percents: Mutex::new(Vec::new()),
    };

    let (_, outcome) = engine
        .run(state, &CancellationToken::new(), &observer)
        .await;
    assert!(matches!(outcome, RunOutcome::Failed(_)));

    let percents = observer.percents.into_inner();
    assert!(
        percents
            .iter()
            .all(|p| p.is_none() || p.is_some_and(|v| v < 100)),
        "a failed run must never observe 100"
    );
}
