use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::snapshot::JobSnapshot;

/// Job persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Job storage interface.
///
/// The engine only requires atomic read/write per job; durability is not
/// guaranteed by this core. An external store can be slotted in behind this
/// trait without touching the queue service.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save_snapshot(&self, snapshot: JobSnapshot) -> Result<(), JobStoreError>;
    async fn get_snapshot(&self, job_id: Uuid) -> Result<Option<JobSnapshot>, JobStoreError>;
    async fn delete_snapshot(&self, job_id: Uuid) -> Result<(), JobStoreError>;
    async fn list_snapshots(&self) -> Result<Vec<JobSnapshot>, JobStoreError>;
}

/// Default in-memory job store.
///
/// A process restart loses in-flight jobs; that is an accepted property of
/// the in-memory registry.
#[derive(Default)]
pub struct InMemoryJobStore {
    snapshots: RwLock<HashMap<Uuid, JobSnapshot>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn save_snapshot(&self, snapshot: JobSnapshot) -> Result<(), JobStoreError> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.job_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, job_id: Uuid) -> Result<Option<JobSnapshot>, JobStoreError> {
        Ok(self.snapshots.read().await.get(&job_id).cloned())
    }

    async fn delete_snapshot(&self, job_id: Uuid) -> Result<(), JobStoreError> {
        self.snapshots.write().await.remove(&job_id);
        Ok(())
    }

    async fn list_snapshots(&self) -> Result<Vec<JobSnapshot>, JobStoreError> {
        Ok(self.snapshots.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ScanJob;
    use diffscope_core::domain::scan::{ScanRequest, ScanType};

    fn snapshot() -> JobSnapshot {
        let job = ScanJob::new(ScanRequest {
            scan_type: ScanType::Project,
            repository: "/tmp/checkout".to_string(),
            pr_id: None,
            branch: None,
        });
        (&job).into()
    }

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let store = InMemoryJobStore::new();
        let snap = snapshot();
        let job_id = snap.job_id;

        store.save_snapshot(snap).await.unwrap();
        let loaded = store.get_snapshot(job_id).await.unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().job_id, job_id);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryJobStore::new();
        assert!(store.get_snapshot(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_snapshot() {
        let store = InMemoryJobStore::new();
        let snap = snapshot();
        let job_id = snap.job_id;

        store.save_snapshot(snap).await.unwrap();
        store.delete_snapshot(job_id).await.unwrap();
        assert!(store.get_snapshot(job_id).await.unwrap().is_none());
        assert!(store.list_snapshots().await.unwrap().is_empty());
    }
}
