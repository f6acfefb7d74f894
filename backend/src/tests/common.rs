//! Shared fixtures for the HTTP-level tests.

use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::db;

pub const TEST_PASSWORD: &str = "abcdefghijklmnopqrstuvwxyz";
pub const TEST_JWT_SECRET: &str = "test__secret__key__for__jwt__testing";

pub fn default_settings() -> cfg::AppSettings {
    cfg::AppSettings {
        jwt: cfg::JwtSettings {
            access_token_expiry: 3600,
            refresh_token_expiry: 86400,
        },
        ..Default::default()
    }
}

/// Test server on a fresh in-memory database, plus the shared context so
/// tests can seed rows and inspect the session registry directly.
pub async fn create_test_server(settings: cfg::AppSettings) -> (TestServer, core::ArcContext) {
    let mut settings = settings;

    // a single pool connection keeps every query on the same in-memory database
    settings.database = cfg::DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        run_migrations_on_startup: true,
    };

    let db = db::Database::new(&settings.database).await.unwrap();
    let jwt = auth::JwtContext::new(&settings.jwt, TEST_JWT_SECRET).unwrap();
    let context = core::Context::new(db, jwt, settings);
    let server = TestServer::new(app::create_router(context.clone())).unwrap();
    (server, context)
}

pub async fn seed_user(context: &core::Context, email: &str) -> db::User {
    seed_account(context, email, db::SystemRole::RegularUser, "Test User").await
}

pub async fn seed_super_admin(context: &core::Context, email: &str) -> db::User {
    seed_account(context, email, db::SystemRole::SuperAdmin, "Platform Admin").await
}

async fn seed_account(
    context: &core::Context,
    email: &str,
    system_role: db::SystemRole,
    full_name: &str,
) -> db::User {
    let password_hash = auth::hash_password(TEST_PASSWORD).unwrap();
    let user = context.db.users.create(db::NewUser {
        email: email.to_string(),
        password_hash: Some(password_hash),
    }).await.unwrap();

    context.db.profiles.create(db::NewProfile {
        id: user.id.clone(),
        email: user.email.clone(),
        full_name: Some(full_name.to_string()),
        system_role,
    }).await.unwrap();

    user
}

pub async fn seed_tenant(context: &core::Context, name: &str) -> db::Tenant {
    context.db.tenants.create(db::NewTenant {
        name: name.to_string(),
        domain: None,
        logo_url: None,
        company_type: Some(db::CompanyType::TalentAgency),
    }).await.unwrap()
}

/// Membership with `job_title: None` still needs onboarding.
pub async fn seed_membership(
    context: &core::Context,
    user_id: &str,
    tenant_id: &str,
    role: db::TenantRole,
    job_title: Option<&str>,
) -> String {
    let department = match job_title {
        Some(_) => Some("Talent".to_string()),
        None => None,
    };
    context.db.memberships.create(db::NewMembership {
        user_id: user_id.to_string(),
        tenant_id: tenant_id.to_string(),
        role,
        department,
        job_title: job_title.map(ToString::to_string),
    }).await.unwrap()
}

pub async fn seed_signup_request(
    context: &core::Context,
    user_id: &str,
    company_name: &str,
) -> db::SignupRequest {
    context.db.signup_requests.create(db::NewSignupRequest {
        user_id: user_id.to_string(),
        company_name: company_name.to_string(),
        company_type: Some(db::CompanyType::TalentAgency),
    }).await.unwrap()
}

/// Pass a negative `expires_in_hours` to create an already-expired invitation.
pub async fn seed_invitation(
    context: &core::Context,
    tenant_id: &str,
    email: &str,
    expires_in_hours: i64,
) -> db::EmployeeInvitation {
    context.db.invitations.create(db::NewInvitation {
        tenant_id: tenant_id.to_string(),
        email: email.to_string(),
        role: db::TenantRole::Employee,
        department: Some("Production".to_string()),
        job_title: Some("Coordinator".to_string()),
        expires_at: (Utc::now() + Duration::hours(expires_in_hours)).naive_utc(),
    }).await.unwrap()
}

/// Logs in over HTTP and returns (access token, refresh token).
pub async fn login(server: &TestServer, email: &str) -> (String, String) {
    let response = server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let access_token = body["tokens"]["access_token"].as_str().unwrap().to_string();
    let refresh_token = body["tokens"]["refresh_token"].as_str().unwrap().to_string();
    (access_token, refresh_token)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
