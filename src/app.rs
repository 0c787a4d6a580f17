//! Application setup and wiring

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio_util::sync::CancellationToken;

use diffscope_core::Config;
use diffscope_engine::application::engine::WorkflowEngine;
use diffscope_engine::application::progress::ProgressTracker;
use diffscope_engine::application::transitions::TransitionTable;
use diffscope_engine::infrastructure::{InMemoryJobStore, JobService, JobServiceSettings};
use diffscope_engine::presentation::{EngineState, create_router};
use diffscope_engine::stages::default_registry;

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    pub shutdown_token: CancellationToken,
}

/// Wire the engine, job queue, and HTTP router together.
///
/// Startup validation happens here: the transition table, the progress
/// weight tables, and registry coverage are all checked before the service
/// accepts its first request, so a configuration defect aborts boot instead
/// of surfacing mid-scan.
pub async fn create_app(config: Config) -> anyhow::Result<AppHandle> {
    let shutdown_token = CancellationToken::new();

    let registry =
        Arc::new(default_registry(&config).context("failed to build the stage registry")?);

    let progress = ProgressTracker::standard();
    progress
        .validate()
        .context("progress weight tables are inconsistent")?;

    let engine = Arc::new(
        WorkflowEngine::new(
            registry,
            TransitionTable::standard(),
            Duration::from_secs(config.engine.stage_timeout_seconds),
        )
        .context("workflow engine configuration is invalid")?,
    );

    let store = Arc::new(InMemoryJobStore::new());
    let job_service = JobService::start(
        store,
        engine,
        Arc::new(progress),
        JobServiceSettings::from_config(&config.engine),
        shutdown_token.clone(),
    );

    tracing::info!(
        max_concurrent_jobs = config.engine.max_concurrent_jobs,
        stage_timeout_seconds = config.engine.stage_timeout_seconds,
        "Engine wired"
    );

    let router = create_router(EngineState { job_service }, &config.server);

    Ok(AppHandle {
        router,
        shutdown_token,
    })
}
