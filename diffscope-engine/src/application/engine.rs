//! Workflow engine: drives one scan state through the stage pipeline
//!
//! ```text
//! Worker               WorkflowEngine        StageRegistry      TransitionTable
//!   │                       │                     │                   │
//!   ├─ run(state) ─────────►│                     │                   │
//!   │                       ├─ get(current) ─────►│                   │
//!   │                       ├─ execute (spawn + timeout)              │
//!   │                       ├─ next(current, state) ────────────────►│
//!   │                       │   ... repeat until End ...              │
//!   │◄── (state, outcome) ──┤                     │                   │
//! ```
//!
//! Stages execute strictly sequentially inside a run. Each invocation runs in
//! its own task under the per-stage timeout so an error return, a timeout,
//! and a panic are all classified the same way: the state observed by the
//! failing stage is restored, `ScanState.error` is set, and routing is forced
//! to the error-handling sink. Cancellation is cooperative and checked at
//! every stage boundary; an in-flight stage always finishes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use diffscope_core::domain::scan::ScanState;
use diffscope_core::domain::stage::{StageContext, StageFailure, StageName};

use super::transitions::{RoutingError, TransitionTable};
use crate::infrastructure::stage_registry::StageRegistry;

/// How a run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Pipeline reached the end stage with no error recorded
    Completed,
    /// A stage failed; the error sink has produced a partial report
    Failed(StageFailure),
    /// Cancellation was observed at a stage boundary
    Cancelled,
}

/// Callback invoked after every successfully completed stage.
///
/// The job queue service uses this to publish progress; the state reference
/// is only valid for the duration of the call and must not be retained.
#[async_trait]
pub trait RunObserver: Send + Sync {
    async fn stage_completed(&self, stage: StageName, state: &ScanState);
}

/// Observer that ignores all events
pub struct NoopObserver;

#[async_trait]
impl RunObserver for NoopObserver {
    async fn stage_completed(&self, _stage: StageName, _state: &ScanState) {}
}

/// Configuration defect detected while assembling the engine, fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum EngineBuildError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("No stage implementation registered for {0}")]
    MissingStage(StageName),
}

/// Executes the stage sequence for one scan state to a terminal stage.
pub struct WorkflowEngine {
    registry: Arc<StageRegistry>,
    transitions: TransitionTable,
    stage_timeout: Duration,
}

impl WorkflowEngine {
    /// Assemble an engine, validating the transition table and checking that
    /// every routable stage has a registered implementation. Either defect is
    /// fatal here so it can never surface mid-scan.
    pub fn new(
        registry: Arc<StageRegistry>,
        transitions: TransitionTable,
        stage_timeout: Duration,
    ) -> Result<Self, EngineBuildError> {
        transitions.validate()?;

        for stage in transitions.routable_stages() {
            if registry.get(stage).is_none() {
                return Err(EngineBuildError::MissingStage(stage));
            }
        }

        Ok(Self {
            registry,
            transitions,
            stage_timeout,
        })
    }

    /// Drive `state` from the start stage to a terminal stage.
    ///
    /// Always returns: every failure mode is converted into the error path,
    /// and cancellation exits at the next boundary.
    pub async fn run(
        &self,
        mut state: ScanState,
        cancellation: &CancellationToken,
        observer: &dyn RunObserver,
    ) -> (ScanState, RunOutcome) {
        let scan_id = state.scan_id;
        let mut current = self.transitions.start_stage();
        let mut cancelled = false;

        info!(scan_id = %scan_id, scan_type = %state.scan_type, "Workflow run started");

        loop {
            // Boundary checks: cancellation wins over normal termination so a
            // job cancelled during its final stage still reports Cancelled.
            if cancellation.is_cancelled() {
                cancelled = true;
                break;
            }
            if current == StageName::End {
                break;
            }

            let snapshot = state.clone();
            match self.execute_stage(current, state, cancellation).await {
                Ok(next_state) => {
                    state = next_state;
                    observer.stage_completed(current, &state).await;

                    match self.transitions.next(current, &state) {
                        Ok(next) => {
                            debug!(scan_id = %scan_id, from = %current, to = %next, "Stage completed");
                            current = next;
                        }
                        Err(err) => {
                            // Startup validation makes this unreachable; keep
                            // the run terminating if it ever regresses.
                            error!(scan_id = %scan_id, stage = %current, error = %err, "Routing failed");
                            state.error =
                                Some(StageFailure::execution(current, format!("routing: {err}")));
                            if current == StageName::ErrorHandler {
                                break;
                            }
                            current = StageName::ErrorHandler;
                        }
                    }
                }
                Err(failure) => {
                    if current == StageName::ErrorHandler {
                        // The sink must never fail; restore the pre-sink state
                        // (which carries the original failure) and terminate.
                        error!(
                            scan_id = %scan_id,
                            error = %failure,
                            "Error-handling stage failed; terminating run with original error"
                        );
                        state = snapshot;
                        break;
                    }

                    warn!(scan_id = %scan_id, stage = %current, error = %failure, "Stage failed, routing to error handler");
                    state = snapshot;
                    state.error = Some(failure);
                    current = StageName::ErrorHandler;
                }
            }
        }

        let outcome = if cancelled {
            info!(scan_id = %scan_id, "Workflow run cancelled");
            RunOutcome::Cancelled
        } else if let Some(failure) = state.error.clone() {
            warn!(scan_id = %scan_id, stage = %failure.stage, "Workflow run failed");
            RunOutcome::Failed(failure)
        } else {
            info!(scan_id = %scan_id, "Workflow run completed");
            RunOutcome::Completed
        };

        (state, outcome)
    }

    /// Invoke one stage in its own task under the per-stage timeout.
    ///
    /// Spawning isolates panics: an unwinding stage surfaces as a
    /// [`StageFailure`] with the panic payload instead of tearing down the
    /// worker.
    async fn execute_stage(
        &self,
        name: StageName,
        state: ScanState,
        cancellation: &CancellationToken,
    ) -> Result<ScanState, StageFailure> {
        let Some(stage) = self.registry.get(name) else {
            return Err(StageFailure::execution(
                name,
                "no stage implementation registered",
            ));
        };

        let ctx = StageContext::new(cancellation.child_token(), self.stage_timeout);
        debug!(stage = %name, "Executing stage");

        let mut handle = tokio::spawn(async move { stage.execute(state, &ctx).await });

        match tokio::time::timeout(self.stage_timeout, &mut handle).await {
            Err(_elapsed) => {
                handle.abort();
                Err(StageFailure::timeout(name, self.stage_timeout))
            }
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    let payload = join_err.into_panic();
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "stage panicked".to_string());
                    Err(StageFailure::panic(name, message))
                } else {
                    Err(StageFailure::execution(name, "stage task was aborted"))
                }
            }
            Ok(Ok(Err(err))) => Err(StageFailure::execution(name, err.to_string())),
            Ok(Ok(Ok(next_state))) => Ok(next_state),
        }
    }
}
