use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{is_unique_violation, parse_datetime, parse_uuid, to_i64, to_u64},
    models::TrackingRecord,
};
use crate::tracking::{StoreError, TrackingRepository};

const TRACK_COLUMNS: &str = "tt.id, tt.task_id, tt.started_at, tt.elapsed_ms, tt.updated_at";

enum SaveOutcome {
    Saved,
    AlreadyStopped,
    Missing,
}

fn row_to_record(row: &Row) -> Result<TrackingRecord> {
    let id: String = row.get("id")?;
    let task_id: String = row.get("task_id")?;
    let started_at: String = row.get("started_at")?;
    let elapsed_ms: Option<i64> = row.get("elapsed_ms")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(TrackingRecord {
        id: parse_uuid(&id, "id")?,
        task_id: parse_uuid(&task_id, "task_id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        elapsed_ms: elapsed_ms
            .map(|ms| to_u64(ms, "elapsed_ms"))
            .transpose()?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

#[async_trait]
impl TrackingRepository for Database {
    async fn find_by_task(&self, task_id: Uuid) -> Result<Option<TrackingRecord>, StoreError> {
        let record = self
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TRACK_COLUMNS} FROM task_tracks tt WHERE tt.task_id = ?1"
                ))?;

                let mut rows = stmt.query(params![task_id.to_string()])?;
                let record = match rows.next()? {
                    Some(row) => Some(row_to_record(row)?),
                    None => None,
                };
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    async fn create(&self, record: TrackingRecord) -> Result<TrackingRecord, StoreError> {
        let task_id = record.task_id;
        let to_insert = record.clone();
        let inserted = self
            .execute(move |conn| {
                let result = conn.execute(
                    "INSERT INTO task_tracks (id, task_id, started_at, elapsed_ms, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        to_insert.id.to_string(),
                        to_insert.task_id.to_string(),
                        to_insert.started_at.to_rfc3339(),
                        to_insert.elapsed_ms.map(to_i64).transpose()?,
                        to_insert.updated_at.to_rfc3339(),
                    ],
                );

                match result {
                    Ok(_) => Ok(true),
                    Err(err) if is_unique_violation(&err) => Ok(false),
                    Err(err) => Err(err.into()),
                }
            })
            .await?;

        if inserted {
            Ok(record)
        } else {
            Err(StoreError::Conflict(task_id))
        }
    }

    async fn save(&self, record: TrackingRecord) -> Result<TrackingRecord, StoreError> {
        let to_save = record.clone();
        let outcome = self
            .execute(move |conn| {
                let id = to_save.id.to_string();
                let rows_affected = conn.execute(
                    "UPDATE task_tracks
                     SET elapsed_ms = ?1,
                         updated_at = ?2
                     WHERE id = ?3 AND elapsed_ms IS NULL",
                    params![
                        to_save.elapsed_ms.map(to_i64).transpose()?,
                        to_save.updated_at.to_rfc3339(),
                        id,
                    ],
                )?;

                if rows_affected > 0 {
                    return Ok(SaveOutcome::Saved);
                }

                let exists: Option<String> = conn
                    .query_row(
                        "SELECT id FROM task_tracks WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?;

                Ok(match exists {
                    Some(_) => SaveOutcome::AlreadyStopped,
                    None => SaveOutcome::Missing,
                })
            })
            .await?;

        match outcome {
            SaveOutcome::Saved => Ok(record),
            SaveOutcome::AlreadyStopped => Err(StoreError::Conflict(record.task_id)),
            SaveOutcome::Missing => Err(StoreError::Missing(record.id)),
        }
    }

    async fn list_stopped_by_user(&self, user_id: Uuid) -> Result<Vec<TrackingRecord>, StoreError> {
        let records = self
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TRACK_COLUMNS}
                     FROM task_tracks tt
                     JOIN tasks t ON tt.task_id = t.id
                     WHERE t.user_id = ?1 AND tt.elapsed_ms IS NOT NULL
                     ORDER BY tt.elapsed_ms DESC, tt.task_id ASC"
                ))?;

                let mut rows = stmt.query(params![user_id.to_string()])?;
                let mut records = Vec::new();
                while let Some(row) = rows.next()? {
                    records.push(row_to_record(row)?);
                }

                Ok(records)
            })
            .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn seeded() -> (Database, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .insert_user("Ivanov".into(), "Ivan".into(), None, "Moscow".into())
            .await
            .unwrap();
        let task = db.insert_task(user.id, "report".into()).await.unwrap();
        (db, user.id, task.id)
    }

    #[tokio::test]
    async fn create_then_find_by_task() {
        let (db, _, task) = seeded().await;
        assert!(db.find_by_task(task).await.unwrap().is_none());

        let record = db.create(TrackingRecord::start(task, Utc::now())).await.unwrap();
        let found = db.find_by_task(task).await.unwrap().unwrap();
        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn second_create_for_task_conflicts() {
        let (db, _, task) = seeded().await;
        db.create(TrackingRecord::start(task, Utc::now())).await.unwrap();

        let err = db
            .create(TrackingRecord::start(task, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(id) if id == task));
    }

    #[tokio::test]
    async fn create_for_unknown_task_is_backend_error() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .create(TrackingRecord::start(Uuid::new_v4(), Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn save_only_stops_running_rows() {
        let (db, _, task) = seeded().await;
        let now = Utc::now();
        let record = db.create(TrackingRecord::start(task, now)).await.unwrap();

        let stopped = db.save(record.stopped(5_000, now)).await.unwrap();
        assert_eq!(db.find_by_task(task).await.unwrap(), Some(stopped.clone()));

        let err = db.save(record.stopped(9_000, now)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(
            db.find_by_task(task).await.unwrap().unwrap().elapsed_ms,
            Some(5_000)
        );
    }

    #[tokio::test]
    async fn save_of_unknown_record_is_missing() {
        let (db, _, task) = seeded().await;
        let ghost = TrackingRecord::start(task, Utc::now()).stopped(1, Utc::now());
        let err = db.save(ghost).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn lists_only_stopped_records_of_the_user() {
        let (db, user, first) = seeded().await;
        let second = db.insert_task(user, "review".into()).await.unwrap().id;
        let running = db.insert_task(user, "idle".into()).await.unwrap().id;
        let other_user = db
            .insert_user("Petrov".into(), "Petr".into(), None, "Kazan".into())
            .await
            .unwrap();
        let foreign = db.insert_task(other_user.id, "theirs".into()).await.unwrap().id;

        let now = Utc::now();
        for (task, ms) in [(first, 1_000), (second, 7_000), (foreign, 3_000)] {
            let record = db.create(TrackingRecord::start(task, now)).await.unwrap();
            db.save(record.stopped(ms, now)).await.unwrap();
        }
        db.create(TrackingRecord::start(running, now)).await.unwrap();

        let listed: Vec<(Uuid, Option<u64>)> = db
            .list_stopped_by_user(user)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.task_id, r.elapsed_ms))
            .collect();
        assert_eq!(listed, vec![(second, Some(7_000)), (first, Some(1_000))]);
    }
}
