//! Tracking record model.
//!
//! A task has at most one record. The absence of a record is the
//! not-started state; a record without `elapsed_ms` is running and a record
//! with `elapsed_ms` is stopped for good.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackingState {
    Running,
    Stopped,
}

impl TrackingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingState::Running => "Running",
            TrackingState::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub id: Uuid,
    pub task_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingRecord {
    /// A freshly started record for `task_id`.
    pub fn start(task_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            started_at,
            elapsed_ms: None,
            updated_at: started_at,
        }
    }

    pub fn state(&self) -> TrackingState {
        match self.elapsed_ms {
            Some(_) => TrackingState::Stopped,
            None => TrackingState::Running,
        }
    }

    /// Copy of this record moved to the stopped state.
    pub fn stopped(&self, elapsed_ms: u64, stopped_at: DateTime<Utc>) -> Self {
        Self {
            elapsed_ms: Some(elapsed_ms),
            updated_at: stopped_at,
            ..self.clone()
        }
    }
}
