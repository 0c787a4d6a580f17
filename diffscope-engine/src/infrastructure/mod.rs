//! Engine infrastructure: job store, stage registry, and the queue service

pub mod job_service;
pub mod job_store;
pub mod stage_registry;

pub use job_service::{
    JobService, JobServiceError, JobServiceSettings, QueuedScanJob, spawn_cleanup_worker,
    spawn_worker_pool,
};
pub use job_store::{InMemoryJobStore, JobSnapshot, JobStore, JobStoreError};
pub use stage_registry::StageRegistry;
