use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{DbError, DbPoolType};

/// System-wide role stored on the profile row. `SuperAdmin` grants synthetic
/// access to every tenant; everything else is scoped by memberships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SystemRole {
    SuperAdmin,
    RegularUser,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub system_role: SystemRole,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String, // same id as the users row
    pub email: String,
    pub full_name: Option<String>,
    pub system_role: SystemRole,
}

pub struct Profiles {
    db: DbPoolType
}

impl Profiles {
    pub fn new(db: DbPoolType) -> Self {
        Self { db }
    }

    pub async fn create(&self, new_profile: NewProfile) -> Result<Profile, DbError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, full_name, system_role, created_at, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING id, email, full_name, avatar_url, phone, system_role, created_at, updated_at
            "#
        )
        .bind(new_profile.id)
        .bind(new_profile.email)
        .bind(new_profile.full_name)
        .bind(new_profile.system_role)
        .fetch_one(&self.db)
        .await
        .map_err(DbError::OperationFailed)?;

        Ok(profile)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Profile, DbError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, avatar_url, phone, system_role, created_at, updated_at
            FROM profiles
            WHERE id = ?
            "#
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::ProfileNotFound,
            _ => DbError::OperationFailed(e),
        })?;

        Ok(profile)
    }

    pub async fn update_phone(&self, id: &str, phone: Option<&str>) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET phone = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#
        )
        .bind(phone)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::ProfileNotFound);
        }
        Ok(())
    }
}
