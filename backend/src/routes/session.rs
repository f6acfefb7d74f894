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
pub struct SelectTenant {
    /// Membership id to select; null clears the selection.
    pub membership_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Membership does not belong to this session")]
    UnknownMembership,

    #[error("Database error: {0}")]
    DatabaseError(#[from] db::DbError),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(
            error_type = %std::any::type_name::<Self>(),
            error_subtype = %std::any::type_name_of_val(&self),
            error_message = %self);

        #[rustfmt::skip]
        let (status, error_message) = match self {
            Self::SessionNotFound => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::UnknownMembership => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Self::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "result": "error",
            "message": error_message
        }));

        (status, body).into_response()
    }
}

/// Current session snapshot. Restores the registry entry first, so a valid
/// token still gets its session back after a server restart.
pub async fn get_session(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<auth::AccessTokenClaims>,
) -> Result<impl IntoResponse, SessionError> {
    session::ensure_session(&context.db, &context.sessions, &claims).await;

    let snapshot = session::with_session(&context.sessions, &claims.sid, |s| s.snapshot())
        .await
        .ok_or(SessionError::SessionNotFound)?;

    Ok(Json(json!({
        "result": "ok",
        "session": snapshot
    })))
}

/// Selects (or clears) the current tenant. The target must be one of the
/// session's own memberships; nothing is validated beyond that.
pub async fn select_tenant(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<auth::AccessTokenClaims>,
    Json(request): Json<SelectTenant>,
) -> Result<impl IntoResponse, SessionError> {
    session::ensure_session(&context.db, &context.sessions, &claims).await;

    let snapshot = session::with_session(&context.sessions, &claims.sid, |s| {
        let selected = match request.membership_id.as_deref() {
            None => None,
            Some(id) => match s.memberships.iter().find(|m| m.id == id) {
                Some(membership) => Some(membership.clone()),
                None => return Err(SessionError::UnknownMembership),
            },
        };
        s.set_current_tenant(selected);
        Ok(s.snapshot())
    })
    .await
    .ok_or(SessionError::SessionNotFound)??;

    Ok(Json(json!({
        "result": "ok",
        "session": snapshot
    })))
}

/// Re-resolves the membership set for the signed-in user and merges it into
/// the session, keeping the current tenant selection when it survives.
pub async fn refresh_memberships(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<auth::AccessTokenClaims>,
) -> Result<impl IntoResponse, SessionError> {
    session::ensure_session(&context.db, &context.sessions, &claims).await;

    // The profile decides the branch (super-admins get every tenant), but
    // the stored profile itself is not replaced here.
    let profile = session::fetch_profile(&context.db, &claims.sub).await;
    let memberships = session::fetch_memberships(&context.db, &claims.sub, profile.as_ref()).await;

    let snapshot = session::with_session(&context.sessions, &claims.sid, |s| {
        s.merge_memberships(memberships);
        s.snapshot()
    })
    .await
    .ok_or(SessionError::SessionNotFound)?;

    Ok(Json(json!({
        "result": "ok",
        "session": snapshot
    })))
}
