use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_uuid},
    models::Task,
};

fn row_to_task(row: &Row) -> Result<Task> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let created_at: String = row.get("created_at")?;

    Ok(Task {
        id: parse_uuid(&id, "id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Create a task for a live user
    pub async fn insert_task(&self, user_id: Uuid, name: String) -> Result<Task> {
        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            name,
            created_at: Utc::now(),
        };

        let record = task.clone();
        self.execute(move |conn| {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE id = ?1 AND deleted_at IS NULL",
                    params![record.user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            if owner.is_none() {
                return Err(anyhow!("User not found or has been deleted"));
            }

            conn.execute(
                "INSERT INTO tasks (id, user_id, name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id.to_string(),
                    record.user_id.to_string(),
                    record.name,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(task)
    }

    pub async fn list_tasks_for_user(&self, user_id: Uuid) -> Result<Vec<Task>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, created_at
                 FROM tasks
                 WHERE user_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![user_id.to_string()])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(row_to_task(row)?);
            }

            Ok(tasks)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tasks_belong_to_their_user() {
        let db = Database::open_in_memory().unwrap();
        let alice = db
            .insert_user("Smith".into(), "Alice".into(), None, "Leeds".into())
            .await
            .unwrap();
        let bob = db
            .insert_user("Jones".into(), "Bob".into(), None, "York".into())
            .await
            .unwrap();

        let task = db.insert_task(alice.id, "write".into()).await.unwrap();
        db.insert_task(bob.id, "read".into()).await.unwrap();

        let tasks = db.list_tasks_for_user(alice.id).await.unwrap();
        assert_eq!(tasks, vec![task]);
    }

    #[tokio::test]
    async fn rejects_unknown_or_deleted_owner() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_task(Uuid::new_v4(), "orphan".into()).await.is_err());

        let user = db
            .insert_user("Smith".into(), "Alice".into(), None, "Leeds".into())
            .await
            .unwrap();
        db.soft_delete_user(user.id).await.unwrap();
        assert!(db.insert_task(user.id, "late".into()).await.is_err());
    }
}
