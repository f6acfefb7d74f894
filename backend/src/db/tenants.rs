use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{DbError, DbPoolType};

/// Line of business for a tenant company.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CompanyType {
    TalentAgency,
    PrAgency,
    FinanceOutsourcing,
    MarketingAgency,
    ProductionAgency,
    SalesAgency,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub domain: Option<String>,
    pub logo_url: Option<String>,
    pub company_type: Option<CompanyType>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub domain: Option<String>,
    pub logo_url: Option<String>,
    pub company_type: Option<CompanyType>,
}

pub struct Tenants {
    db: DbPoolType
}

impl Tenants {
    pub fn new(db: DbPoolType) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_tenant: NewTenant) -> Result<Tenant, DbError> {
        let id = Uuid::new_v4().to_string();
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (id, name, domain, logo_url, company_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING id, name, domain, logo_url, company_type, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(new_tenant.name)
        .bind(new_tenant.domain)
        .bind(new_tenant.logo_url)
        .bind(new_tenant.company_type)
        .fetch_one(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(tenant)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Tenant, DbError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, domain, logo_url, company_type, created_at, updated_at
            FROM tenants
            WHERE id = ?
            "#
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::TenantNotFound,
            _ => DbError::OperationFailed(e),
        })?;

        Ok(tenant)
    }

    pub async fn list_all(&self) -> Result<Vec<Tenant>, DbError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, domain, logo_url, company_type, created_at, updated_at
            FROM tenants
            ORDER BY name
            "#
        )
        .fetch_all(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(tenants)
    }
}
