//! Job queue service: the concurrent job manager in front of the engine
//!
//! Owns the job registry semantics of the system:
//!
//! - `submit` validates the request, allocates a Pending job, persists its
//!   first snapshot, and enqueues it without blocking; saturation just leaves
//!   jobs Pending until a worker slot frees
//! - a dispatcher loop feeds a `Semaphore`-bounded worker pool, so at most
//!   `max_concurrent_jobs` scans execute at once
//! - each worker is the single writer for its job; readers only ever get
//!   snapshots from the store
//! - `cancel` is cooperative: a Pending job is finalized immediately, a
//!   Running job stops at the next stage boundary
//! - a periodic sweep removes terminal jobs older than the retention window

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use diffscope_core::config::EngineConfig;
use diffscope_core::domain::scan::{ScanRequest, ScanRequestError, ScanState, ScanType};
use diffscope_core::domain::stage::{StageFailure, StageName};

use crate::application::engine::{RunObserver, RunOutcome, WorkflowEngine};
use crate::application::lifecycle::{JobLifecycle, LifecycleError};
use crate::application::progress::ProgressTracker;
use crate::domain::entities::ScanJob;
use crate::domain::value_objects::JobStatus;
use crate::infrastructure::job_store::{JobSnapshot, JobStore, JobStoreError};

/// Message delivered to the worker pool when a new scan job is queued.
pub struct QueuedScanJob {
    pub job: ScanJob,
}

/// Errors surfaced synchronously to callers of the service.
#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error("Invalid scan request: {0}")]
    InvalidRequest(#[from] ScanRequestError),

    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Job {job_id} is already {status}")]
    AlreadyTerminal { job_id: Uuid, status: JobStatus },

    #[error("Job queue is shut down")]
    QueueClosed,

    #[error(transparent)]
    Store(#[from] JobStoreError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Per-job bookkeeping shared between the submitter, `cancel`, and the
/// owning worker. `picked` flips exactly once, under the registry lock, when
/// a worker claims the job; `cancel` uses it to decide between finalizing a
/// Pending job directly and leaving a Running job to its worker.
struct JobHandle {
    token: CancellationToken,
    picked: bool,
}

/// Tunables for the worker pool and cleanup sweep.
#[derive(Debug, Clone)]
pub struct JobServiceSettings {
    pub max_concurrent_jobs: usize,
    pub cleanup_interval: Duration,
    pub job_retention: Duration,
}

impl JobServiceSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs,
            cleanup_interval: Duration::from_secs(config.cleanup_interval_seconds),
            job_retention: Duration::from_secs(config.job_retention_seconds),
        }
    }
}

impl Default for JobServiceSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Manages the lifecycle of many concurrent scan executions.
pub struct JobService {
    store: Arc<dyn JobStore>,
    lifecycle: JobLifecycle,
    engine: Arc<WorkflowEngine>,
    progress: Arc<ProgressTracker>,
    queue_tx: mpsc::UnboundedSender<QueuedScanJob>,
    handles: Mutex<HashMap<Uuid, JobHandle>>,
}

impl JobService {
    /// Build a service plus the queue receiver for its worker pool.
    ///
    /// Most callers want [`JobService::start`], which also spawns the pool
    /// and the cleanup sweep.
    pub fn new(
        store: Arc<dyn JobStore>,
        engine: Arc<WorkflowEngine>,
        progress: Arc<ProgressTracker>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<QueuedScanJob>) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let service = Arc::new(Self {
            lifecycle: JobLifecycle::new(store.clone()),
            store,
            engine,
            progress,
            queue_tx,
            handles: Mutex::new(HashMap::new()),
        });
        (service, queue_rx)
    }

    /// Build a fully wired service: worker pool and cleanup sweep included.
    pub fn start(
        store: Arc<dyn JobStore>,
        engine: Arc<WorkflowEngine>,
        progress: Arc<ProgressTracker>,
        settings: JobServiceSettings,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let (service, queue_rx) = Self::new(store, engine, progress);
        spawn_worker_pool(
            service.clone(),
            queue_rx,
            settings.max_concurrent_jobs,
            shutdown.clone(),
        );
        spawn_cleanup_worker(
            service.clone(),
            settings.cleanup_interval,
            settings.job_retention,
            shutdown,
        );
        service
    }

    /// Validate a request, allocate a Pending job, enqueue it, and return its id.
    pub async fn submit(&self, request: ScanRequest) -> Result<Uuid, JobServiceError> {
        request.validate()?;

        let job = ScanJob::new(request);
        let job_id = job.job_id;

        self.store.save_snapshot((&job).into()).await?;
        self.handles.lock().await.insert(
            job_id,
            JobHandle {
                token: CancellationToken::new(),
                picked: false,
            },
        );

        if self.queue_tx.send(QueuedScanJob { job }).is_err() {
            self.handles.lock().await.remove(&job_id);
            if let Err(e) = self.store.delete_snapshot(job_id).await {
                warn!(job_id = %job_id, error = %e, "Failed to roll back snapshot for unqueued job");
            }
            return Err(JobServiceError::QueueClosed);
        }

        info!(job_id = %job_id, "Scan job submitted");
        Ok(job_id)
    }

    /// Point-in-time snapshot of a job.
    pub async fn status(&self, job_id: Uuid) -> Result<JobSnapshot, JobServiceError> {
        self.store
            .get_snapshot(job_id)
            .await?
            .ok_or(JobServiceError::NotFound(job_id))
    }

    /// Request cancellation of a job.
    ///
    /// Pending jobs are finalized to Cancelled right here; Running jobs get
    /// their token cancelled and stop at the next stage boundary. Cancelling
    /// a terminal job is a conflict.
    pub async fn cancel(&self, job_id: Uuid) -> Result<(), JobServiceError> {
        let snapshot = self.status(job_id).await?;
        if snapshot.status.is_terminal() {
            return Err(JobServiceError::AlreadyTerminal {
                job_id,
                status: snapshot.status,
            });
        }

        // The registry lock is held across the direct finalize so a worker
        // cannot claim the job halfway through it.
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get_mut(&job_id) {
            handle.token.cancel();

            if !handle.picked {
                let mut job = snapshot.into_job();
                self.lifecycle
                    .cancel(&mut job, "cancelled while pending")
                    .await?;
            }
        }
        // A missing handle means the worker just finished; the job is
        // terminal (or about to be) and there is nothing left to stop.

        Ok(())
    }

    /// Snapshots of all known jobs, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status_filter: Option<JobStatus>,
    ) -> Result<Vec<JobSnapshot>, JobServiceError> {
        let mut snapshots = self.store.list_snapshots().await?;
        if let Some(status) = status_filter {
            snapshots.retain(|snapshot| snapshot.status == status);
        }
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(snapshots)
    }

    /// Remove terminal jobs whose completion is older than `retention`.
    pub async fn cleanup(&self, retention: Duration) -> Result<usize, JobServiceError> {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return Ok(0);
        };
        let cutoff = Utc::now() - retention;

        let mut removed = 0;
        for snapshot in self.store.list_snapshots().await? {
            if snapshot.status.is_terminal()
                && let Some(completed_at) = snapshot.completed_at
                && completed_at < cutoff
            {
                self.store.delete_snapshot(snapshot.job_id).await?;
                self.handles.lock().await.remove(&snapshot.job_id);
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Cleaned up terminal jobs past retention");
        }
        Ok(removed)
    }

    /// Execute one queued job to a terminal status. Called by pool workers;
    /// the worker is the job's single writer from claim to release.
    async fn process(&self, queued: QueuedScanJob) -> Result<(), LifecycleError> {
        let QueuedScanJob { mut job } = queued;
        let job_id = job.job_id;

        let token = self.claim(job_id).await;

        if token.is_cancelled() {
            // Cancelled while pending. The cancel path may have finalized the
            // snapshot already; only write if it has not.
            let already_terminal = matches!(
                self.store.get_snapshot(job_id).await,
                Ok(Some(snapshot)) if snapshot.status.is_terminal()
            );
            if !already_terminal {
                self.lifecycle
                    .cancel(&mut job, "cancelled while pending")
                    .await?;
            }
            self.release(job_id).await;
            return Ok(());
        }

        info!(job_id = %job_id, "Processing scan job");

        // ── Lifecycle: Pending → Running ─────────────────────────────────
        self.lifecycle.start(&mut job).await?;

        let state = ScanState::new(job.scan_id, &job.request);
        let sink = ProgressSink {
            lifecycle: self.lifecycle.clone(),
            progress: self.progress.clone(),
            scan_type: job.request.scan_type,
            job: Mutex::new(job),
        };

        let (mut final_state, outcome) = self.engine.run(state, &token, &sink).await;
        let mut job = sink.job.into_inner();

        // ── Lifecycle: Running → terminal ────────────────────────────────
        match outcome {
            RunOutcome::Completed => match final_state.report.take() {
                Some(report) => self.lifecycle.complete(&mut job, report).await?,
                None => {
                    // Reporting stage contract violation
                    let failure = StageFailure::execution(
                        StageName::Reporting,
                        "pipeline completed without producing a report",
                    );
                    self.lifecycle.fail(&mut job, failure, None).await?;
                }
            },
            RunOutcome::Failed(failure) => {
                let partial = final_state.report.take();
                self.lifecycle.fail(&mut job, failure, partial).await?;
            }
            RunOutcome::Cancelled => {
                self.lifecycle
                    .cancel(&mut job, "cancelled at stage boundary")
                    .await?;
            }
        }

        self.release(job_id).await;
        Ok(())
    }

    /// Mark the job as claimed by this worker and return its token.
    async fn claim(&self, job_id: Uuid) -> CancellationToken {
        let mut handles = self.handles.lock().await;
        let handle = handles.entry(job_id).or_insert_with(|| JobHandle {
            token: CancellationToken::new(),
            picked: false,
        });
        handle.picked = true;
        handle.token.clone()
    }

    async fn release(&self, job_id: Uuid) {
        self.handles.lock().await.remove(&job_id);
    }
}

/// Observer that turns stage completions into persisted progress updates.
struct ProgressSink {
    lifecycle: JobLifecycle,
    progress: Arc<ProgressTracker>,
    scan_type: ScanType,
    job: Mutex<ScanJob>,
}

#[async_trait]
impl RunObserver for ProgressSink {
    async fn stage_completed(&self, stage: StageName, _state: &ScanState) {
        let percent = self.progress.percent_after(self.scan_type, stage);
        let mut job = self.job.lock().await;
        self.lifecycle.progress(&mut job, stage, percent).await;
    }
}

/// Spawn the dispatcher that feeds queued jobs to a bounded worker pool.
///
/// The semaphore bounds total concurrent scan execution; once saturated,
/// queued jobs simply stay Pending until a permit frees.
pub fn spawn_worker_pool(
    service: Arc<JobService>,
    mut queue_rx: mpsc::UnboundedReceiver<QueuedScanJob>,
    max_concurrent_jobs: usize,
    shutdown: CancellationToken,
) {
    let concurrency = max_concurrent_jobs.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    tokio::spawn(async move {
        info!(concurrency, "Scan worker pool started");

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let queued = tokio::select! {
                _ = shutdown.cancelled() => {
                    drop(permit);
                    break;
                }
                queued = queue_rx.recv() => match queued {
                    Some(queued) => queued,
                    None => {
                        drop(permit);
                        break;
                    }
                },
            };

            let service = service.clone();
            tokio::spawn(async move {
                if let Err(err) = service.process(queued).await {
                    error!(error = %err, "Background job processing failed");
                }
                drop(permit);
            });
        }

        warn!("Scan worker pool exiting");
    });
}

/// Spawn the periodic cleanup sweep for terminal jobs.
pub fn spawn_cleanup_worker(
    service: Arc<JobService>,
    interval: Duration,
    retention: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = service.cleanup(retention).await {
                        warn!(error = %err, "Job cleanup sweep failed");
                    }
                }
            }
        }

        debug!("Job cleanup worker exiting");
    });
}
