use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::auth;
use crate::core;
use crate::db;
use crate::session;

#[derive(Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub domain: Option<String>,
    pub logo_url: Option<String>,
    pub company_type: Option<db::CompanyType>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Tenant name must not be empty")]
    EmptyTenantName,

    #[error("Database error: {0}")]
    DatabaseError(#[from] db::DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(
            error_type = %std::any::type_name::<Self>(),
            error_subtype = %std::any::type_name_of_val(&self),
            error_message = %self);

        #[rustfmt::skip]
        let (status, error_message) = match self {
            Self::SessionNotFound => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::EmptyTenantName => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Self::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "result": "error",
            "message": error_message
        }));

        (status, body).into_response()
    }
}

/// Workspace summary for the selected tenant; what the dashboard shell
/// renders after the guard lets a request through.
pub async fn workspace(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<auth::AccessTokenClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let session = session::get_session(&context.sessions, &claims.sid)
        .await
        .ok_or(ApiError::SessionNotFound)?;

    Ok(Json(json!({
        "result": "ok",
        "workspace": {
            "current_tenant": session.current_tenant,
            "membership_count": session.memberships.len(),
            "flags": session.flags(),
        }
    })))
}

/// Super-admin only: every registered tenant, ordered by name.
pub async fn list_tenants(
    State(context): State<core::ArcContext>,
) -> Result<impl IntoResponse, ApiError> {
    let tenants = context.db.tenants.list_all().await?;

    Ok(Json(json!({
        "result": "ok",
        "tenants": tenants
    })))
}

/// Super-admin only: registers a new tenant company.
pub async fn create_tenant(
    State(context): State<core::ArcContext>,
    Json(request): Json<CreateTenant>,
) -> Result<impl IntoResponse, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::EmptyTenantName);
    }

    let tenant = context.db.tenants.create(db::NewTenant {
        name: name.to_string(),
        domain: request.domain,
        logo_url: request.logo_url,
        company_type: request.company_type,
    }).await?;

    tracing::info!(tenant_id = tenant.id, name = tenant.name, "Tenant created");

    Ok((StatusCode::CREATED, Json(json!({
        "result": "ok",
        "tenant": tenant
    }))))
}
