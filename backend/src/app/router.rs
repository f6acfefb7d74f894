use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::core;
use crate::middleware::rate_limit;
use crate::routes;
use crate::session;

/// State for the route guard: the shared context plus the static
/// requirements of the route group it protects.
#[derive(Clone)]
struct GuardState {
    context: core::ArcContext,
    requirements: session::RouteRequirements,
}

impl GuardState {
    fn new(context: &core::ArcContext, requirements: session::RouteRequirements) -> Self {
        Self { context: context.clone(), requirements }
    }
}

/// Back end server built from public, token-authenticated and guarded routes
pub fn create_router(context: core::ArcContext) -> Router {
    let rate_limiter = rate_limit::RateLimiter::new();

    // Credential and token endpoints; signup and login are rate limited
    let auth_routes = Router::new()
        .route("/auth/signup", post(routes::auth::sign_up))
        .route("/auth/login", post(routes::auth::login))
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit::credential_rate_limit_middleware))
        .route("/auth/logout", get(routes::auth::logout))
        .route("/auth/refresh", post(routes::auth::refresh_access_token))
        .route("/auth/revoke", post(routes::auth::revoke_token))
        .with_state(context.clone());

    // Session surface: requires a valid token but bypasses the route guard,
    // so clients can read pending/suspended/loading states that the guard
    // itself would redirect
    let session_routes = Router::new()
        .route("/auth/session", get(routes::session::get_session))
        .route("/auth/session/tenant", put(routes::session::select_tenant))
        .route("/auth/session/memberships/refresh", post(routes::session::refresh_memberships))
        .layer(middleware::from_fn_with_state(context.clone(), auth_middleware))
        .with_state(context.clone());

    // Guarded app surface; each group carries its own route requirements
    let workspace_routes = Router::new()
        .route("/api/workspace", get(routes::api::workspace))
        .layer(middleware::from_fn_with_state(
            GuardState::new(&context, session::RouteRequirements::default()),
            guard_middleware,
        ))
        .with_state(context.clone());

    let onboarding_routes = Router::new()
        .route("/api/onboarding", post(routes::onboarding::complete))
        .layer(middleware::from_fn_with_state(
            GuardState::new(&context, session::RouteRequirements::onboarding()),
            guard_middleware,
        ))
        .with_state(context.clone());

    let admin_routes = Router::new()
        .route("/api/admin/tenants", get(routes::api::list_tenants).post(routes::api::create_tenant))
        .layer(middleware::from_fn_with_state(
            GuardState::new(&context, session::RouteRequirements::super_admin_only()),
            guard_middleware,
        ))
        .with_state(context.clone());

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check)) // Health check endpoint
        .with_state(context);

    // Combine all routes
    Router::new()
        .merge(auth_routes)
        .merge(session_routes)
        .merge(workspace_routes)
        .merge(onboarding_routes)
        .merge(admin_routes)
        .merge(public_routes)
        .fallback(routes::assets::static_handler) // Serve static assets
        .layer(TraceLayer::new_for_http())
}

async fn auth_middleware(
    State(context): State<core::ArcContext>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match auth::decode_access_token_from_req(&context.jwt, &req) {
        Ok(claims) => {
            tracing::debug!(
                user_id = claims.sub,
                session_id = claims.sid,
                "Authenticated session request"
            );
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!("Unauthorized access attempt: {}", e);
            let mut response = Response::new(Body::from("Unauthorized"));
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            response
        }
    }
}

/// Route guard for the app surface. Decodes the access token, restores the
/// session entry if the registry lost it, then maps the guard decision onto
/// the wire: interstitial states answer with JSON, navigation states with a
/// redirect to the matching SPA route.
async fn guard_middleware(
    State(guard): State<GuardState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let context = &guard.context;

    // An invalid or missing token evaluates as "no session", which the
    // decision below turns into the login redirect
    let claims = auth::decode_access_token_from_req(&context.jwt, &req).ok();

    let session_state = match &claims {
        Some(claims) => {
            session::ensure_session(&context.db, &context.sessions, claims).await;
            session::get_session(&context.sessions, &claims.sid).await
        }
        None => None,
    };

    let decision = session::evaluate(session_state.as_ref(), guard.requirements);
    if decision != session::RouteDecision::Allowed {
        tracing::debug!(path = %req.uri().path(), decision = ?decision, "Route guard blocked request");
    }

    match (decision, claims) {
        (session::RouteDecision::Allowed, Some(claims)) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        // evaluate only allows requests that carry a session user
        (session::RouteDecision::Allowed, None)
        | (session::RouteDecision::RedirectToLogin, _) => {
            Redirect::to(&context.settings.guard.login_path).into_response()
        }
        (session::RouteDecision::Loading, _) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "result": "loading",
                "message": "Session is still loading, retry shortly"
            })),
        )
            .into_response(),
        (session::RouteDecision::PendingApproval, _) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "result": "error",
                "reason": "pending_approval",
                "message": "Your signup request is awaiting approval"
            })),
        )
            .into_response(),
        (session::RouteDecision::Suspended, _) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "result": "error",
                "reason": "suspended",
                "message": "Your membership in this company is suspended"
            })),
        )
            .into_response(),
        (session::RouteDecision::RedirectToOnboarding, _) => {
            Redirect::to(&context.settings.guard.onboarding_path).into_response()
        }
        (session::RouteDecision::RedirectToDashboard, _) => {
            Redirect::to(&context.settings.guard.dashboard_path).into_response()
        }
    }
}
