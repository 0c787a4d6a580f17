//! Job snapshot persistence

pub mod snapshot;
pub mod store;

pub use snapshot::JobSnapshot;
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
