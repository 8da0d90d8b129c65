use thiserror::Error;
use uuid::Uuid;

use super::repository::StoreError;

#[derive(Debug, Error)]
pub enum TrackingError {
    /// Raised for both running and finished sessions.
    #[error("task {0} has already been started")]
    AlreadyStarted(Uuid),

    #[error("no task with id {0}")]
    NotFound(Uuid),

    #[error("task {0} has already been stopped")]
    AlreadyStopped(Uuid),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

pub type TrackingResult<T> = Result<T, TrackingError>;
