use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::TrackingRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The write lost against the current row for this task: a record
    /// already exists on create, or the record is no longer running on save.
    #[error("tracking record for task {0} conflicts with stored state")]
    Conflict(Uuid),

    #[error("tracking record {0} does not exist")]
    Missing(Uuid),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for tracking records.
///
/// Each method must be a single atomic operation against the store so that
/// an abandoned call never leaves a half-written record behind.
#[async_trait]
pub trait TrackingRepository: Send + Sync {
    async fn find_by_task(&self, task_id: Uuid) -> Result<Option<TrackingRecord>, StoreError>;

    /// Inserts a new record. Fails with [`StoreError::Conflict`] when the
    /// task already has one.
    async fn create(&self, record: TrackingRecord) -> Result<TrackingRecord, StoreError>;

    /// Persists a stopped record over its running row. Fails with
    /// [`StoreError::Conflict`] when the stored row is already stopped.
    async fn save(&self, record: TrackingRecord) -> Result<TrackingRecord, StoreError>;

    /// Stopped records for tasks owned by `user_id`.
    async fn list_stopped_by_user(&self, user_id: Uuid) -> Result<Vec<TrackingRecord>, StoreError>;
}
