use chrono::NaiveDateTime;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::sqlite::SqliteQueryResult;

use crate::db::{DbError, DbPoolType};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub jti: String,
    pub user_id: String,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewRefreshToken {
    pub jti: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
}

pub struct RefreshTokens {
    db: DbPoolType
}

impl RefreshTokens {
    pub fn new(db: DbPoolType) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_refresh_token: NewRefreshToken) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (jti, user_id, token_hash, issued_at, expires_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP, ?)
            "#
        )
        .bind(new_refresh_token.jti)
        .bind(new_refresh_token.user_id)
        .bind(new_refresh_token.token_hash)
        .bind(new_refresh_token.expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// The active (not revoked) token record for a jti.
    pub async fn get_by_jti(&self, jti: &str) -> Result<RefreshToken, DbError> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, jti, user_id, token_hash, issued_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE jti = ? AND revoked_at IS NULL
            "#
        )
        .bind(jti)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::TokenNotFound,
            _ => DbError::OperationFailed(e),
        })?;
        Ok(token)
    }

    pub async fn revoke(&self, jti: &str) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = CURRENT_TIMESTAMP
            WHERE jti = ?
            "#
        )
        .bind(jti)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<SqliteQueryResult, DbError> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = ?
            WHERE user_id = ? AND revoked_at IS NULL
            "#
        )
        .bind(now)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result)
    }
}
