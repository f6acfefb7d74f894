use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, DbPoolType};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
}

pub struct Users {
    db: DbPoolType
}

impl Users {
    pub fn new(db: DbPoolType) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, DbError> {
        let id = Uuid::new_v4().to_string();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING id, email, password_hash, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = ?
            "#
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::UserNotFound,
            _ => DbError::OperationFailed(e),
        })?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE lower(email) = lower(?)
            "#
        )
        .bind(email)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::UserNotFound,
            _ => DbError::OperationFailed(e),
        })?;

        Ok(user)
    }
}
