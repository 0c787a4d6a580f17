#![allow(dead_code)]

//! Shared test doubles and harness helpers for the engine integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use diffscope_core::domain::scan::{
    ReportSummary, ScanReport, ScanRequest, ScanState, ScanType,
};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};
use diffscope_engine::application::engine::WorkflowEngine;
use diffscope_engine::application::progress::ProgressTracker;
use diffscope_engine::application::transitions::TransitionTable;
use diffscope_engine::infrastructure::{
    InMemoryJobStore, JobService, JobServiceSettings, JobSnapshot,
};
use diffscope_engine::infrastructure::stage_registry::StageRegistry;

/// Execution log shared by all scripted stages: which scan ran which stage.
pub type StageLog = Arc<Mutex<Vec<(Uuid, StageName)>>>;

pub fn new_log() -> StageLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Stages a scan ran, in order.
pub async fn stages_for(log: &StageLog, scan_id: Uuid) -> Vec<StageName> {
    log.lock()
        .await
        .iter()
        .filter(|(id, _)| *id == scan_id)
        .map(|(_, stage)| *stage)
        .collect()
}

/// What a scripted stage does when invoked
#[derive(Clone)]
pub enum StageBehavior {
    Succeed,
    SucceedAfter(Duration),
    Fail(&'static str),
    Panic(&'static str),
    /// Cancels the run's own token, then succeeds; the engine should stop at
    /// the next boundary
    CancelThenSucceed(CancellationToken),
}

/// Scripted stage used to exercise the engine without real pipeline work.
///
/// The reporting and error-handler names additionally produce a minimal
/// report on success so the lifecycle layer sees the same contract the real
/// stages honor.
pub struct ScriptedStage {
    name: StageName,
    behavior: StageBehavior,
    log: StageLog,
}

impl ScriptedStage {
    pub fn new(name: StageName, behavior: StageBehavior, log: StageLog) -> Self {
        Self {
            name,
            behavior,
            log,
        }
    }
}

fn minimal_report(state: &ScanState, partial: bool) -> ScanReport {
    ScanReport {
        scan_id: state.scan_id,
        scan_type: state.scan_type,
        repository: state.repository.clone(),
        summary: ReportSummary::from_findings(&state.static_findings),
        findings: state.static_findings.clone(),
        impact: state.impact.clone(),
        project: state.project_summary.clone(),
        llm_review: state.llm_review.clone(),
        partial,
        error: state.error.clone(),
        generated_at: Utc::now(),
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    fn name(&self) -> StageName {
        self.name
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        self.log.lock().await.push((state.scan_id, self.name));

        match &self.behavior {
            StageBehavior::Succeed => {}
            StageBehavior::SucceedAfter(delay) => tokio::time::sleep(*delay).await,
            StageBehavior::Fail(message) => {
                return Err(StageError::ExecutionFailed((*message).to_string()));
            }
            StageBehavior::Panic(message) => panic!("{}", message),
            StageBehavior::CancelThenSucceed(token) => token.cancel(),
        }

        match self.name {
            StageName::Reporting => state.report = Some(minimal_report(&state, false)),
            StageName::ErrorHandler => state.report = Some(minimal_report(&state, true)),
            _ => {}
        }

        Ok(state)
    }
}

pub const ALL_PIPELINE_STAGES: [StageName; 8] = [
    StageName::Fetch,
    StageName::Parse,
    StageName::StaticAnalysis,
    StageName::ImpactAnalysis,
    StageName::ProjectScan,
    StageName::LlmAnalysis,
    StageName::Reporting,
    StageName::ErrorHandler,
];

/// Full scripted registry; `overrides` replaces the default Succeed behavior
/// per stage.
pub fn scripted_registry(
    log: &StageLog,
    overrides: &[(StageName, StageBehavior)],
) -> StageRegistry {
    let overrides: HashMap<StageName, StageBehavior> = overrides.iter().cloned().collect();
    let mut registry = StageRegistry::new();

    for name in ALL_PIPELINE_STAGES {
        let behavior = overrides.get(&name).cloned().unwrap_or(StageBehavior::Succeed);
        registry.register(Arc::new(ScriptedStage::new(name, behavior, log.clone())));
    }

    registry
}

pub fn engine_with(registry: StageRegistry, stage_timeout: Duration) -> WorkflowEngine {
    WorkflowEngine::new(
        Arc::new(registry),
        TransitionTable::standard(),
        stage_timeout,
    )
    .expect("engine must assemble from a validated table and full registry")
}

pub fn pr_request(repository: &str) -> ScanRequest {
    ScanRequest {
        scan_type: ScanType::Pr,
        repository: repository.to_string(),
        pr_id: Some(42),
        branch: Some("feature/scan".to_string()),
    }
}

pub fn project_request(repository: &str) -> ScanRequest {
    ScanRequest {
        scan_type: ScanType::Project,
        repository: repository.to_string(),
        pr_id: None,
        branch: None,
    }
}

pub fn state_for(request: &ScanRequest) -> ScanState {
    ScanState::new(Uuid::new_v4(), request)
}

/// A running service with its store and shutdown token.
pub struct Harness {
    pub service: Arc<JobService>,
    pub store: Arc<InMemoryJobStore>,
    pub shutdown: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Start a service over the given registry with a long cleanup interval so
/// sweeps never interfere with a test unless invoked directly.
pub fn start_service(registry: StageRegistry, max_concurrent_jobs: usize) -> Harness {
    let store = Arc::new(InMemoryJobStore::new());
    let engine = Arc::new(engine_with(registry, Duration::from_secs(5)));
    let shutdown = CancellationToken::new();

    let service = JobService::start(
        store.clone(),
        engine,
        Arc::new(ProgressTracker::standard()),
        JobServiceSettings {
            max_concurrent_jobs,
            cleanup_interval: Duration::from_secs(3600),
            job_retention: Duration::from_secs(3600),
        },
        shutdown.clone(),
    );

    Harness {
        service,
        store,
        shutdown,
    }
}

/// Poll until the job reaches a terminal status.
pub async fn wait_terminal(service: &JobService, job_id: Uuid, within: Duration) -> JobSnapshot {
    let deadline = tokio::time::Instant::now() + within;

    loop {
        let snapshot = service.status(job_id).await.expect("job must exist");
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} still {} after {within:?}",
            snapshot.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
