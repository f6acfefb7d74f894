use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, DbPoolType, TenantRole};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Cancelled,
}

/// An invitation to join a tenant, matched against the email at signup.
#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct EmployeeInvitation {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    pub role: TenantRole,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub status: InvitationStatus,
    pub expires_at: NaiveDateTime,
    pub accepted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewInvitation {
    pub tenant_id: String,
    pub email: String,
    pub role: TenantRole,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub expires_at: NaiveDateTime,
}

pub struct Invitations {
    db: DbPoolType
}

impl Invitations {
    pub fn new(db: DbPoolType) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_invitation: NewInvitation) -> Result<EmployeeInvitation, DbError> {
        let id = Uuid::new_v4().to_string();
        let invitation = sqlx::query_as::<_, EmployeeInvitation>(
            r#"
            INSERT INTO employee_invitations (id, tenant_id, email, role, department, job_title, expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING id, tenant_id, email, role, department, job_title, status, expires_at, accepted_at, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(new_invitation.tenant_id)
        .bind(new_invitation.email)
        .bind(new_invitation.role)
        .bind(new_invitation.department)
        .bind(new_invitation.job_title)
        .bind(new_invitation.expires_at)
        .fetch_one(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(invitation)
    }

    /// A pending, unexpired invitation for the email, matched case-insensitively.
    pub async fn find_pending_by_email(&self, email: &str) -> Result<Option<EmployeeInvitation>, DbError> {
        let now = Utc::now().naive_utc();
        let invitation = sqlx::query_as::<_, EmployeeInvitation>(
            r#"
            SELECT id, tenant_id, email, role, department, job_title, status, expires_at, accepted_at, created_at, updated_at
            FROM employee_invitations
            WHERE lower(email) = lower(?) AND status = 'pending' AND expires_at > ?
            LIMIT 1
            "#
        )
        .bind(email)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(invitation)
    }

    pub async fn mark_accepted(&self, id: &str) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE employee_invitations
            SET status = 'accepted', accepted_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::InvitationNotFound);
        }
        Ok(())
    }
}
