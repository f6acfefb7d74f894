use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{CompanyType, DbError, DbPoolType};

/// Lifecycle of a manual-approval signup request. Approval/rejection happens
/// in the admin review flow; this subsystem only reads the outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SignupStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct SignupRequest {
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub company_type: Option<CompanyType>,
    pub status: SignupStatus,
    pub assigned_tenant_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSignupRequest {
    pub user_id: String,
    pub company_name: String,
    pub company_type: Option<CompanyType>,
}

pub struct SignupRequests {
    db: DbPoolType
}

impl SignupRequests {
    pub fn new(db: DbPoolType) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_request: NewSignupRequest) -> Result<SignupRequest, DbError> {
        let id = Uuid::new_v4().to_string();
        let request = sqlx::query_as::<_, SignupRequest>(
            r#"
            INSERT INTO signup_requests (id, user_id, company_name, company_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING id, user_id, company_name, company_type, status, assigned_tenant_id, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(new_request.user_id)
        .bind(new_request.company_name)
        .bind(new_request.company_type)
        .fetch_one(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(request)
    }

    /// The most recent request for a user, if any.
    pub async fn latest_for_user(&self, user_id: &str) -> Result<Option<SignupRequest>, DbError> {
        let request = sqlx::query_as::<_, SignupRequest>(
            r#"
            SELECT id, user_id, company_name, company_type, status, assigned_tenant_id, created_at, updated_at
            FROM signup_requests
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(request)
    }

    /// Status transitions come from the admin review flow.
    pub async fn set_status(&self, id: &str, status: SignupStatus, assigned_tenant_id: Option<&str>) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE signup_requests
            SET status = ?, assigned_tenant_id = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#
        )
        .bind(status)
        .bind(assigned_tenant_id)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
