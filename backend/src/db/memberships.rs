use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, DbPoolType, Tenant};

/// Per-tenant role carried by a membership row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TenantRole {
    CompanyAdmin,
    Manager,
    Employee,
}

/// Tenant display fields joined onto a membership.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantInfo {
    pub id: String,
    pub name: String,
    pub domain: Option<String>,
    pub logo_url: Option<String>,
}

impl From<&Tenant> for TenantInfo {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            name: tenant.name.clone(),
            domain: tenant.domain.clone(),
            logo_url: tenant.logo_url.clone(),
        }
    }
}

/// A user's association with one tenant. For super-admins these are
/// synthesized from the tenant list instead of being read from this table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantMembership {
    pub id: String,
    pub tenant_id: String,
    pub role: TenantRole,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub is_suspended: bool,
    pub tenant: TenantInfo,
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    id: String,
    tenant_id: String,
    role: TenantRole,
    department: Option<String>,
    job_title: Option<String>,
    is_suspended: bool,
    tenant_name: String,
    tenant_domain: Option<String>,
    tenant_logo_url: Option<String>,
}

impl From<MembershipRow> for TenantMembership {
    fn from(row: MembershipRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id.clone(),
            role: row.role,
            department: row.department,
            job_title: row.job_title,
            is_suspended: row.is_suspended,
            tenant: TenantInfo {
                id: row.tenant_id,
                name: row.tenant_name,
                domain: row.tenant_domain,
                logo_url: row.tenant_logo_url,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewMembership {
    pub user_id: String,
    pub tenant_id: String,
    pub role: TenantRole,
    pub department: Option<String>,
    pub job_title: Option<String>,
}

pub struct Memberships {
    db: DbPoolType
}

impl Memberships {
    pub fn new(db: DbPoolType) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_membership: NewMembership) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO tenant_memberships (id, user_id, tenant_id, role, department, job_title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            "#
        )
        .bind(&id)
        .bind(new_membership.user_id)
        .bind(new_membership.tenant_id)
        .bind(new_membership.role)
        .bind(new_membership.department)
        .bind(new_membership.job_title)
        .execute(&self.db)
        .await?;

        Ok(id)
    }

    /// Memberships for one user, oldest first, with tenant display fields
    /// joined in. Session bootstrap picks the head of this list as the
    /// initial tenant selection.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<TenantMembership>, DbError> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT
                m.id,
                m.tenant_id,
                m.role,
                m.department,
                m.job_title,
                m.is_suspended,
                t.name AS tenant_name,
                t.domain AS tenant_domain,
                t.logo_url AS tenant_logo_url
            FROM tenant_memberships m
            JOIN tenants t ON t.id = m.tenant_id
            WHERE m.user_id = ?
            ORDER BY m.created_at, m.rowid
            "#
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(rows.into_iter().map(TenantMembership::from).collect())
    }

    /// Fills in the onboarding fields on one of the user's own memberships.
    pub async fn update_onboarding(&self, user_id: &str, membership_id: &str, department: Option<&str>, job_title: &str) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_memberships
            SET department = ?, job_title = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ?
            "#
        )
        .bind(department)
        .bind(job_title)
        .bind(membership_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::MembershipNotFound);
        }
        Ok(())
    }

    pub async fn set_suspended(&self, membership_id: &str, suspended: bool) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_memberships
            SET is_suspended = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#
        )
        .bind(suspended)
        .bind(membership_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::MembershipNotFound);
        }
        Ok(())
    }
}
