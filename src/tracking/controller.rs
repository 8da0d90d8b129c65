use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, error, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::clock::{elapsed_ms_since, format_hh_mm, Clock, SystemClock};
use crate::db::models::{TrackingRecord, TrackingState};

use super::{
    error::{TrackingError, TrackingResult},
    repository::{StoreError, TrackingRepository},
};

/// Per-user time report: task id to `HH:MM`, longest task first.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TimeReport(IndexMap<Uuid, String>);

impl TimeReport {
    pub fn entries(&self) -> &IndexMap<Uuid, String> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Drives the start/stop lifecycle of task tracking records and builds
/// per-user reports from the stopped ones.
pub struct TrackingController<R, C = SystemClock> {
    repo: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> Clone for TrackingController<R, C> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<R: TrackingRepository> TrackingController<R, SystemClock> {
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: TrackingRepository, C: Clock> TrackingController<R, C> {
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self {
            repo: Arc::new(repo),
            clock: Arc::new(clock),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub async fn start_tracking(&self, task_id: Uuid) -> TrackingResult<TrackingRecord> {
        let now = self.clock.now();

        if let Some(existing) = self.repo.find_by_task(task_id).await? {
            debug!(
                "Task {} already has a {} tracking record",
                task_id,
                existing.state().as_str()
            );
            return Err(TrackingError::AlreadyStarted(task_id));
        }

        let record = match self.repo.create(TrackingRecord::start(task_id, now)).await {
            Ok(record) => record,
            Err(StoreError::Conflict(_)) => {
                warn!("Concurrent start for task {task_id} lost the insert");
                return Err(TrackingError::AlreadyStarted(task_id));
            }
            Err(err) => {
                error!("Failed to create tracking record for task {task_id}: {err}");
                return Err(err.into());
            }
        };

        info!("Started tracking task {} (record {})", task_id, record.id);
        Ok(record)
    }

    pub async fn stop_tracking(&self, task_id: Uuid) -> TrackingResult<TrackingRecord> {
        let now = self.clock.now();

        let record = self
            .repo
            .find_by_task(task_id)
            .await?
            .ok_or(TrackingError::NotFound(task_id))?;

        if record.state() == TrackingState::Stopped {
            return Err(TrackingError::AlreadyStopped(task_id));
        }

        let elapsed_ms = elapsed_ms_since(record.started_at, now);
        let stopped = match self.repo.save(record.stopped(elapsed_ms, now)).await {
            Ok(stopped) => stopped,
            Err(StoreError::Conflict(_)) => {
                warn!("Concurrent stop for task {task_id} lost the update");
                return Err(TrackingError::AlreadyStopped(task_id));
            }
            Err(StoreError::Missing(_)) => return Err(TrackingError::NotFound(task_id)),
            Err(err) => {
                error!("Failed to save tracking record for task {task_id}: {err}");
                return Err(err.into());
            }
        };

        info!("Stopped tracking task {} after {} ms", task_id, elapsed_ms);
        Ok(stopped)
    }

    pub async fn calc_time(&self, user_id: Uuid) -> TrackingResult<TimeReport> {
        let records = self.repo.list_stopped_by_user(user_id).await?;

        let mut durations: Vec<(Uuid, u64)> = records
            .iter()
            .filter_map(|record| record.elapsed_ms.map(|ms| (record.task_id, ms)))
            .collect();
        durations.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let report = durations
            .into_iter()
            .map(|(task_id, ms)| (task_id, format_hh_mm(ms)))
            .collect();

        Ok(TimeReport(report))
    }
}
