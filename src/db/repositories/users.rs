use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_uuid},
    models::{User, UserFilter, UserUpdate},
};

const USER_COLUMNS: &str =
    "id, surname, name, patronymic, address, created_at, updated_at, deleted_at";

fn row_to_user(row: &Row) -> Result<User> {
    let id: String = row.get("id")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;

    Ok(User {
        id: parse_uuid(&id, "id")?,
        surname: row.get("surname")?,
        name: row.get("name")?,
        patronymic: row.get("patronymic")?,
        address: row.get("address")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        deleted_at: parse_optional_datetime(deleted_at, "deleted_at")?,
    })
}

fn load_user(conn: &rusqlite::Connection, user_id: &str) -> Result<User> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let mut rows = stmt.query(params![user_id])?;
    match rows.next()? {
        Some(row) => row_to_user(row),
        None => Err(anyhow!("User not found")),
    }
}

impl Database {
    pub async fn insert_user(
        &self,
        surname: String,
        name: String,
        patronymic: Option<String>,
        address: String,
    ) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            surname,
            name,
            patronymic,
            address,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let record = user.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO users (id, surname, name, patronymic, address, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.to_string(),
                    record.surname,
                    record.name,
                    record.patronymic,
                    record.address,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(user)
    }

    /// Update the given fields of a live user
    pub async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> Result<User> {
        if update.is_empty() {
            return Err(anyhow!("No fields to update"));
        }

        self.execute(move |conn| {
            let mut updates = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            for (column, value) in [
                ("surname", update.surname),
                ("name", update.name),
                ("patronymic", update.patronymic),
                ("address", update.address),
            ] {
                if let Some(value) = value {
                    updates.push(format!("{column} = ?"));
                    params_vec.push(Box::new(value));
                }
            }

            updates.push("updated_at = ?".to_string());
            params_vec.push(Box::new(Utc::now().to_rfc3339()));

            let query = format!(
                "UPDATE users SET {} WHERE id = ? AND deleted_at IS NULL",
                updates.join(", ")
            );
            let id = user_id.to_string();
            params_vec.push(Box::new(id.clone()));

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let rows_affected = conn.execute(&query, params_refs.as_slice())?;
            if rows_affected == 0 {
                return Err(anyhow!("User not found or already deleted"));
            }

            load_user(conn, &id)
        })
        .await
    }

    /// Soft delete a user; their tasks and tracking records stay in place
    pub async fn soft_delete_user(&self, user_id: Uuid) -> Result<()> {
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            let rows_affected = conn.execute(
                "UPDATE users
                 SET deleted_at = ?1, updated_at = ?2
                 WHERE id = ?3 AND deleted_at IS NULL",
                params![now, now, user_id.to_string()],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("User not found or already deleted"));
            }

            Ok(())
        })
        .await
    }

    pub async fn list_users(
        &self,
        filter: UserFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<User>> {
        let limit = limit as i64;
        let offset = offset as i64;
        self.execute(move |conn| {
            let mut clauses = vec!["deleted_at IS NULL".to_string()];
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            for (column, value) in [
                ("surname", filter.surname),
                ("name", filter.name),
                ("patronymic", filter.patronymic),
                ("address", filter.address),
            ] {
                if let Some(value) = value {
                    clauses.push(format!("{column} = ?"));
                    params_vec.push(Box::new(value));
                }
            }

            params_vec.push(Box::new(limit));
            params_vec.push(Box::new(offset));

            let query = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE {}
                 ORDER BY created_at ASC, id ASC
                 LIMIT ? OFFSET ?",
                clauses.join(" AND ")
            );

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&query)?;
            let mut rows = stmt.query(params_refs.as_slice())?;
            let mut users = Vec::new();
            while let Some(row) = rows.next()? {
                users.push(row_to_user(row)?);
            }

            Ok(users)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (surname, name, address) in [
            ("Ivanov", "Ivan", "Moscow"),
            ("Ivanov", "Petr", "Kazan"),
            ("Sidorov", "Ivan", "Moscow"),
        ] {
            db.insert_user(surname.into(), name.into(), None, address.into())
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn filters_by_equality() {
        let db = db_with_users().await;
        let filter = UserFilter {
            surname: Some("Ivanov".into()),
            ..UserFilter::default()
        };
        let users = db.list_users(filter, 10, 0).await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.surname == "Ivanov"));

        let filter = UserFilter {
            name: Some("Ivan".into()),
            address: Some("Moscow".into()),
            ..UserFilter::default()
        };
        assert_eq!(db.list_users(filter, 10, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn paginates() {
        let db = db_with_users().await;
        let first = db.list_users(UserFilter::default(), 2, 0).await.unwrap();
        let rest = db.list_users(UserFilter::default(), 2, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 1);
        assert!(first.iter().all(|u| u.id != rest[0].id));
    }

    #[tokio::test]
    async fn updates_selected_fields() {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .insert_user("Ivanov".into(), "Ivan".into(), None, "Moscow".into())
            .await
            .unwrap();

        let updated = db
            .update_user(
                user.id,
                UserUpdate {
                    patronymic: Some("Ivanovich".into()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.patronymic.as_deref(), Some("Ivanovich"));
        assert_eq!(updated.surname, "Ivanov");

        assert!(db.update_user(user.id, UserUpdate::default()).await.is_err());
    }

    #[tokio::test]
    async fn soft_deleted_users_disappear() {
        let db = db_with_users().await;
        let victim = db.list_users(UserFilter::default(), 1, 0).await.unwrap()[0].clone();

        db.soft_delete_user(victim.id).await.unwrap();
        let remaining = db.list_users(UserFilter::default(), 10, 0).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|u| u.id != victim.id));

        assert!(db.soft_delete_user(victim.id).await.is_err());
        let update = UserUpdate {
            name: Some("Ghost".into()),
            ..UserUpdate::default()
        };
        assert!(db.update_user(victim.id, update).await.is_err());
    }
}
