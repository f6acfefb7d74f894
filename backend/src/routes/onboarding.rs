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
pub struct CompleteOnboarding {
    pub job_title: String,
    pub department: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("Job title must not be empty")]
    EmptyJobTitle,

    #[error("No tenant selected")]
    NoCurrentTenant,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] db::DbError),
}

impl IntoResponse for OnboardingError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(
            error_type = %std::any::type_name::<Self>(),
            error_subtype = %std::any::type_name_of_val(&self),
            error_message = %self);

        #[rustfmt::skip]
        let (status, error_message) = match self {
            Self::EmptyJobTitle => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Self::NoCurrentTenant => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Self::SessionNotFound => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "result": "error",
            "message": error_message
        }));

        (status, body).into_response()
    }
}

/// Completes onboarding for the caller's current membership: fills in the
/// job title (and optionally department and phone), then re-resolves the
/// membership set so the route guard sees the completed state immediately.
pub async fn complete(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<auth::AccessTokenClaims>,
    Json(request): Json<CompleteOnboarding>,
) -> Result<impl IntoResponse, OnboardingError> {
    let job_title = request.job_title.trim();
    if job_title.is_empty() {
        return Err(OnboardingError::EmptyJobTitle);
    }

    session::ensure_session(&context.db, &context.sessions, &claims).await;

    let current = session::with_session(&context.sessions, &claims.sid, |s| s.current_tenant.clone())
        .await
        .ok_or(OnboardingError::SessionNotFound)?
        .ok_or(OnboardingError::NoCurrentTenant)?;

    context.db.memberships
        .update_onboarding(&claims.sub, &current.id, request.department.as_deref(), job_title)
        .await?;

    if let Some(phone) = request.phone.as_deref() {
        context.db.profiles.update_phone(&claims.sub, Some(phone)).await?;
    }

    tracing::info!(user_id = claims.sub, membership_id = current.id, "Onboarding completed");

    let profile = session::fetch_profile(&context.db, &claims.sub).await;
    let memberships = session::fetch_memberships(&context.db, &claims.sub, profile.as_ref()).await;

    let snapshot = session::with_session(&context.sessions, &claims.sid, |s| {
        s.merge_memberships(memberships);
        s.snapshot()
    })
    .await
    .ok_or(OnboardingError::SessionNotFound)?;

    Ok(Json(json!({
        "result": "ok",
        "session": snapshot
    })))
}
