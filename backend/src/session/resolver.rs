use crate::auth;
use crate::db;
use crate::session::{AuthEvent, LoadedUserData, SessionRegistry, SessionUser, registry};

/// Sentinel values stamped onto synthesized super-admin memberships.
pub const SUPER_ADMIN_DEPARTMENT: &str = "System";
pub const SUPER_ADMIN_JOB_TITLE: &str = "Super Admin";

/// Profile for a user id. `None` covers both not-found and query failure;
/// "no profile yet" is a valid state, so failures are logged and swallowed.
pub async fn fetch_profile(database: &db::Database, user_id: &str) -> Option<db::Profile> {
    match database.profiles.get_by_id(user_id).await {
        Ok(profile) => Some(profile),
        Err(db::DbError::ProfileNotFound) => None,
        Err(e) => {
            tracing::error!(user_id, error = %e, "profile fetch failed");
            None
        }
    }
}

/// Memberships for a user, branched on the resolved profile's system role.
/// Super-admins get the synthesized full tenant list; everyone else gets
/// their own membership rows. Failures degrade to an empty list.
pub async fn fetch_memberships(
    database: &db::Database,
    user_id: &str,
    profile: Option<&db::Profile>,
) -> Vec<db::TenantMembership> {
    match profile.map(|p| p.system_role) {
        Some(db::SystemRole::SuperAdmin) => fetch_all_tenants_as_memberships(database).await,
        Some(db::SystemRole::RegularUser) | None => fetch_user_memberships(database, user_id).await,
    }
}

async fn fetch_user_memberships(database: &db::Database, user_id: &str) -> Vec<db::TenantMembership> {
    match database.memberships.list_for_user(user_id).await {
        Ok(memberships) => memberships,
        Err(e) => {
            tracing::error!(user_id, error = %e, "membership fetch failed");
            Vec::new()
        }
    }
}

/// One synthetic company-admin membership per tenant, ordered by tenant
/// name. These are never persisted.
pub async fn fetch_all_tenants_as_memberships(database: &db::Database) -> Vec<db::TenantMembership> {
    let tenants = match database.tenants.list_all().await {
        Ok(tenants) => tenants,
        Err(e) => {
            tracing::error!(error = %e, "tenant list fetch failed");
            return Vec::new();
        }
    };

    tenants
        .iter()
        .map(|tenant| db::TenantMembership {
            id: format!("admin-{}", tenant.id),
            tenant_id: tenant.id.clone(),
            role: db::TenantRole::CompanyAdmin,
            department: Some(SUPER_ADMIN_DEPARTMENT.to_string()),
            job_title: Some(SUPER_ADMIN_JOB_TITLE.to_string()),
            is_suspended: false,
            tenant: db::TenantInfo::from(tenant),
        })
        .collect()
}

/// Latest signup request for a user. Gates the pending-approval
/// interstitial only; absence and failure both come back as `None`.
pub async fn fetch_signup_request(database: &db::Database, user_id: &str) -> Option<db::SignupRequest> {
    match database.signup_requests.latest_for_user(user_id).await {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(user_id, error = %e, "signup request fetch failed");
            None
        }
    }
}

/// Full dependent-data load for a user. The profile fetch decides the
/// membership branch, so it runs first; the signup-request fetch has no
/// ordering dependency on membership resolution and runs concurrently.
pub async fn load_user_data(database: &db::Database, user_id: &str) -> LoadedUserData {
    let profile = fetch_profile(database, user_id).await;
    let (memberships, signup_request) = tokio::join!(
        fetch_memberships(database, user_id, profile.as_ref()),
        fetch_signup_request(database, user_id),
    );

    LoadedUserData {
        profile,
        memberships,
        signup_request,
    }
}

/// Single entry point for session lifecycle events. User-bearing events
/// update the registry entry and run the dependent-data load for it;
/// sign-out clears the entry synchronously and drops it. A load that
/// finishes after a sign-out is discarded by its stale ticket.
pub async fn handle_auth_event(
    database: &db::Database,
    sessions: &SessionRegistry,
    session_id: &str,
    event: AuthEvent,
) {
    let user_id = match &event {
        AuthEvent::InitialSession { user }
        | AuthEvent::SignedIn { user }
        | AuthEvent::TokenRefreshed { user } => user.id.clone(),
        AuthEvent::SignedOut => {
            registry::remove_session(sessions, session_id).await;
            return;
        }
    };

    registry::dispatch_event(sessions, session_id, event).await;
    let Some(ticket) = registry::begin_load(sessions, session_id).await else {
        return;
    };

    let data = load_user_data(database, &user_id).await;
    if !registry::apply_load(sessions, session_id, ticket, data).await {
        tracing::debug!(session_id, "discarded user data load for a reset session");
    }
}

/// Restores the registry entry for a valid access token whose session is
/// not held (typically after a server restart), as an initial-session event.
pub async fn ensure_session(
    database: &db::Database,
    sessions: &SessionRegistry,
    claims: &auth::AccessTokenClaims,
) {
    if registry::contains(sessions, &claims.sid).await {
        return;
    }

    let user = SessionUser {
        id: claims.sub.clone(),
        email: claims.email.clone(),
    };
    handle_auth_event(database, sessions, &claims.sid, AuthEvent::InitialSession { user }).await;
}
