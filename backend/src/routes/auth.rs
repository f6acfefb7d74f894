use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Redirect};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::json;
use sha2::Digest;
use thiserror::Error;

use crate::auth;
use crate::core;
use crate::db;
use crate::session;

#[derive(Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub company_name: String,
    pub company_type: Option<db::CompanyType>,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
pub struct RevokeTokenRequest {
    refresh_token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailAlreadyRegistered,

    #[error("JWT error: {0}")]
    JwtError(#[from] auth::JwtError),

    #[error("Password error: {0}")]
    PasswordHashingError(argon2::password_hash::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] db::DbError),

    #[error("User not found")]
    UserNotFound,

    #[error("Token expired or invalid")]
    TokenInvalid,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(
            error_type = %std::any::type_name::<Self>(),
            error_subtype = %std::any::type_name_of_val(&self),
            error_message = %self);

        #[rustfmt::skip]
        #[allow(clippy::match_same_arms)]
        let (status, error_message) = match self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::EmailAlreadyRegistered => (StatusCode::CONFLICT, self.to_string()),
            Self::UserNotFound => (StatusCode::UNAUTHORIZED, Self::InvalidCredentials.to_string()),
            Self::TokenInvalid => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::JwtError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
            Self::PasswordHashingError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
            Self::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "result": "error",
            "message": error_message
        }));

        (status, body).into_response()
    }
}

/// Issues an access/refresh token pair for a user and persists the hashed
/// refresh token for later validation and revocation. The refresh token's
/// jti doubles as the session id carried in the access token's `sid` claim.
async fn issue_tokens(
    context: &core::Context,
    user: &db::User,
) -> Result<(auth::TokenResponse, String), AuthError> {
    let refresh_token = auth::generate_refresh_token(&context.jwt, &user.id)?;

    // Decode our own refresh token to get its jti and expiry for storage
    let refresh_claims = auth::decode_refresh_token(&context.jwt, &refresh_token)?;
    let expires_at = DateTime::from_timestamp(refresh_claims.exp, 0)
        .ok_or(AuthError::TokenInvalid)?
        .naive_utc();

    let token_hash = hex::encode(sha2::Sha256::digest(refresh_token.as_bytes()));
    context.db.refresh_tokens.create(db::NewRefreshToken {
        jti: refresh_claims.jti.clone(),
        user_id: user.id.clone(),
        token_hash,
        expires_at,
    }).await?;

    let access_token = auth::generate_access_token(&context.jwt, &user.id, &user.email, &refresh_claims.jti)?;
    let tokens = auth::TokenResponse::new(&context.jwt, access_token, refresh_token);
    Ok((tokens, refresh_claims.jti))
}

/// Creates the account and its profile, then signs the new user in.
/// A pending invitation for the email takes precedence over the manual
/// signup request flow.
pub async fn sign_up(
    State(context): State<core::ArcContext>,
    Json(signup): Json<SignUp>,
) -> Result<impl IntoResponse, AuthError> {
    tracing::info!("Signing up user: {}", signup.email);

    if context.db.users.get_by_email(&signup.email).await.is_ok() {
        return Err(AuthError::EmailAlreadyRegistered);
    }

    let password_hash = auth::hash_password(&signup.password)
        .map_err(AuthError::PasswordHashingError)?;
    let user = context.db.users.create(db::NewUser {
        email: signup.email,
        password_hash: Some(password_hash),
    }).await?;

    context.db.profiles.create(db::NewProfile {
        id: user.id.clone(),
        email: user.email.clone(),
        full_name: Some(signup.full_name),
        system_role: db::SystemRole::RegularUser,
    }).await?;

    match context.db.invitations.find_pending_by_email(&user.email).await? {
        Some(invitation) => {
            context.db.memberships.create(db::NewMembership {
                user_id: user.id.clone(),
                tenant_id: invitation.tenant_id.clone(),
                role: invitation.role,
                department: invitation.department.clone(),
                job_title: invitation.job_title.clone(),
            }).await?;
            context.db.invitations.mark_accepted(&invitation.id).await?;
            tracing::info!(
                user_id = user.id,
                tenant_id = invitation.tenant_id,
                "Accepted pending invitation at signup");
        }
        None => {
            context.db.signup_requests.create(db::NewSignupRequest {
                user_id: user.id.clone(),
                company_name: signup.company_name,
                company_type: signup.company_type,
            }).await?;
        }
    }

    let (tokens, session_id) = issue_tokens(&context, &user).await?;
    let session_user = session::SessionUser { id: user.id.clone(), email: user.email.clone() };
    let event = session::AuthEvent::SignedIn { user: session_user };
    session::handle_auth_event(&context.db, &context.sessions, &session_id, event).await;

    Ok((StatusCode::CREATED, Json(json!({
        "result": "ok",
        "tokens": tokens,
        "user": {
            "id": user.id,
            "email": user.email,
        }
    }))))
}

/// Verifies credentials and establishes a session with a fresh token pair.
pub async fn login(
    State(context): State<core::ArcContext>,
    Json(login): Json<Login>,
) -> Result<impl IntoResponse, AuthError> {
    tracing::info!("Logging in user: {}", login.email);

    let user = context.db.users.get_by_email(&login.email).await
        .map_err(|_| AuthError::UserNotFound)?;

    let password_valid = auth::verify_password(&login.password, user.password_hash.clone())
        .map_err(|e| match e {
            // accounts provisioned without a password cannot log in this way
            argon2::password_hash::Error::Password => AuthError::InvalidCredentials,
            _ => AuthError::PasswordHashingError(e),
        })?;
    if !password_valid {
        tracing::warn!("Failed login attempt for user: {}", login.email);
        return Err(AuthError::InvalidCredentials);
    }

    let (tokens, session_id) = issue_tokens(&context, &user).await?;
    let session_user = session::SessionUser { id: user.id.clone(), email: user.email.clone() };
    let event = session::AuthEvent::SignedIn { user: session_user };
    session::handle_auth_event(&context.db, &context.sessions, &session_id, event).await;

    Ok(Json(json!({
        "result": "ok",
        "tokens": tokens,
        "user": {
            "id": user.id,
            "email": user.email,
        }
    })))
}

/// Clears the caller's server-side session and revokes their refresh
/// tokens. Always lands back on the login route, token or no token.
pub async fn logout(
    State(context): State<core::ArcContext>,
    req: Request<Body>,
) -> impl IntoResponse {
    if let Ok(claims) = auth::decode_access_token_from_req(&context.jwt, &req) {
        tracing::info!(user_id = claims.sub, "Logging out user");
        if let Err(e) = context.db.refresh_tokens.revoke_all_for_user(&claims.sub).await {
            // sign-out must complete even when revocation fails
            tracing::warn!(user_id = claims.sub, "Failed to revoke refresh tokens on logout: {}", e);
        }
        session::handle_auth_event(&context.db, &context.sessions, &claims.sid, session::AuthEvent::SignedOut).await;
    }

    Redirect::to(&context.settings.guard.login_path)
}

/// Exchanges a valid refresh token for a new access token bound to the
/// same session.
pub async fn refresh_access_token(
    State(context): State<core::ArcContext>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let refresh_claims = auth::decode_refresh_token(&context.jwt, &request.refresh_token)
        .map_err(|_| AuthError::TokenInvalid)?;

    // The presented token must match the stored unrevoked record for its jti
    let stored = context.db.refresh_tokens.get_by_jti(&refresh_claims.jti).await
        .map_err(|_| AuthError::TokenInvalid)?;
    let token_hash = hex::encode(sha2::Sha256::digest(request.refresh_token.as_bytes()));
    if token_hash != stored.token_hash {
        tracing::warn!(user_id = refresh_claims.sub, "Refresh token hash mismatch");
        return Err(AuthError::TokenInvalid);
    }

    let user = context.db.users.get_by_id(&refresh_claims.sub).await
        .map_err(|_| AuthError::UserNotFound)?;

    let access_token = auth::generate_access_token(&context.jwt, &user.id, &user.email, &refresh_claims.jti)?;

    let session_user = session::SessionUser { id: user.id.clone(), email: user.email.clone() };
    let event = session::AuthEvent::TokenRefreshed { user: session_user };
    session::handle_auth_event(&context.db, &context.sessions, &refresh_claims.jti, event).await;

    Ok(Json(json!({
        "result": "ok",
        "access_token": access_token,
        "expires_in": context.jwt.access_token_expiry,
        "user": {
            "id": user.id,
            "email": user.email,
        }
    })))
}

/// Revokes a single refresh token, e.g. when closing one device's session.
pub async fn revoke_token(
    State(context): State<core::ArcContext>,
    Json(request): Json<RevokeTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let refresh_claims = auth::decode_refresh_token(&context.jwt, &request.refresh_token)
        .map_err(|_| AuthError::TokenInvalid)?;

    context.db.refresh_tokens.revoke(&refresh_claims.jti).await?;
    tracing::info!(user_id = refresh_claims.sub, "Refresh token revoked");

    Ok(Json(json!({
        "result": "ok",
        "message": "Token revoked successfully"
    })))
}
