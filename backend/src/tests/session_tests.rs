use axum::http::StatusCode;
use axum::http::header;
use serde_json::Value;
use serde_json::json;

use crate::auth;
use crate::db;
use crate::session;
use crate::tests::common;

#[tokio::test]
async fn test_session_bootstrap() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "agent@example.com").await;
    let tenant = common::seed_tenant(&context, "Orbit Talent").await;
    let membership_id =
        common::seed_membership(&context, &user.id, &tenant.id, db::TenantRole::Employee, Some("Agent")).await;
    let (access_token, _refresh_token) = common::login(&server, "agent@example.com").await;

    let response = server
        .get("/auth/session")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    let session = &body["session"];
    assert_eq!(session["user"]["id"], user.id);
    assert_eq!(session["user"]["email"], "agent@example.com");
    assert_eq!(session["profile"]["full_name"], "Test User");
    assert_eq!(session["profile"]["system_role"], "regular_user");
    assert_eq!(session["loading"], false);
    assert_eq!(session["memberships"].as_array().unwrap().len(), 1);

    // The single membership becomes the initial tenant selection
    assert_eq!(session["current_tenant"]["id"], membership_id);
    assert_eq!(session["current_tenant"]["tenant"]["name"], "Orbit Talent");
    assert_eq!(session["flags"]["is_super_admin"], false);
    assert_eq!(session["flags"]["is_company_admin"], false);
    assert_eq!(session["flags"]["is_pending_approval"], false);
    assert_eq!(session["flags"]["is_suspended"], false);
}

#[tokio::test]
async fn test_super_admin_memberships_synthesized() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    common::seed_super_admin(&context, "root@example.com").await;

    // seeded out of name order to show the listing is sorted, not insertion-ordered
    let tenant_b = common::seed_tenant(&context, "Borealis Agency").await;
    let tenant_a = common::seed_tenant(&context, "Aurora Agency").await;

    let (access_token, _refresh_token) = common::login(&server, "root@example.com").await;
    let response = server
        .get("/auth/session")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    let session = &body["session"];
    let memberships = session["memberships"].as_array().unwrap();
    assert_eq!(memberships.len(), 2);

    assert_eq!(memberships[0]["id"], format!("admin-{}", tenant_a.id));
    assert_eq!(memberships[0]["tenant"]["name"], "Aurora Agency");
    assert_eq!(memberships[1]["id"], format!("admin-{}", tenant_b.id));
    assert_eq!(memberships[1]["tenant"]["name"], "Borealis Agency");

    for membership in memberships {
        assert_eq!(membership["role"], "company_admin");
        assert_eq!(membership["department"], "System");
        assert_eq!(membership["job_title"], "Super Admin");
        assert_eq!(membership["is_suspended"], false);
    }

    assert_eq!(session["current_tenant"]["tenant"]["name"], "Aurora Agency");
    assert_eq!(session["flags"]["is_super_admin"], true);
    assert_eq!(session["flags"]["is_company_admin"], true);
}

#[tokio::test]
async fn test_select_tenant() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "agent@example.com").await;
    let tenant_a = common::seed_tenant(&context, "First Agency").await;
    let tenant_b = common::seed_tenant(&context, "Second Agency").await;
    let membership_a =
        common::seed_membership(&context, &user.id, &tenant_a.id, db::TenantRole::Employee, Some("Agent")).await;
    let membership_b =
        common::seed_membership(&context, &user.id, &tenant_b.id, db::TenantRole::Manager, Some("Producer")).await;
    let (access_token, _refresh_token) = common::login(&server, "agent@example.com").await;

    // Bootstrap selects the oldest membership
    let response = server
        .get("/auth/session")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;
    let body: Value = response.json();
    assert_eq!(body["session"]["current_tenant"]["id"], membership_a);

    // Switch to the second tenant
    let response = server
        .put("/auth/session/tenant")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .json(&json!({ "membership_id": membership_b }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["session"]["current_tenant"]["id"], membership_b);
    assert_eq!(body["session"]["current_tenant"]["tenant"]["id"], tenant_b.id);

    // A null id clears the selection
    let response = server
        .put("/auth/session/tenant")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .json(&json!({ "membership_id": null }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["session"]["current_tenant"], Value::Null);
}

#[tokio::test]
async fn test_select_unknown_membership() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "agent@example.com").await;
    let tenant = common::seed_tenant(&context, "Orbit Talent").await;
    common::seed_membership(&context, &user.id, &tenant.id, db::TenantRole::Employee, Some("Agent")).await;
    let (access_token, _refresh_token) = common::login(&server, "agent@example.com").await;

    let response = server
        .put("/auth/session/tenant")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .json(&json!({ "membership_id": "not-a-membership" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["result"], "error");
}

#[tokio::test]
async fn test_membership_refresh_preserves_selection() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "agent@example.com").await;
    let tenant_a = common::seed_tenant(&context, "First Agency").await;
    let tenant_b = common::seed_tenant(&context, "Second Agency").await;
    common::seed_membership(&context, &user.id, &tenant_a.id, db::TenantRole::Employee, Some("Agent")).await;
    let membership_b =
        common::seed_membership(&context, &user.id, &tenant_b.id, db::TenantRole::Manager, Some("Producer")).await;
    let (access_token, _refresh_token) = common::login(&server, "agent@example.com").await;

    let response = server
        .put("/auth/session/tenant")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .json(&json!({ "membership_id": membership_b }))
        .await;
    response.assert_status(StatusCode::OK);

    // Refreshing twice in a row must not flip the selection back to the head
    for _ in 0..2 {
        let response = server
            .post("/auth/session/memberships/refresh")
            .add_header(header::AUTHORIZATION, common::bearer(&access_token))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["session"]["memberships"].as_array().unwrap().len(), 2);
        assert_eq!(body["session"]["current_tenant"]["id"], membership_b);
    }
}

#[tokio::test]
async fn test_membership_refresh_picks_up_new_rows() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "agent@example.com").await;
    let tenant_a = common::seed_tenant(&context, "First Agency").await;
    common::seed_membership(&context, &user.id, &tenant_a.id, db::TenantRole::Employee, Some("Agent")).await;
    let (access_token, _refresh_token) = common::login(&server, "agent@example.com").await;

    // A second membership appears after sign-in (e.g. granted by an admin)
    let tenant_b = common::seed_tenant(&context, "Second Agency").await;
    common::seed_membership(&context, &user.id, &tenant_b.id, db::TenantRole::Employee, Some("Scout")).await;

    let response = server
        .post("/auth/session/memberships/refresh")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["session"]["memberships"].as_array().unwrap().len(), 2);
    assert_eq!(body["session"]["current_tenant"]["tenant"]["id"], tenant_a.id);
}

#[tokio::test]
async fn test_session_restored_after_registry_loss() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "agent@example.com").await;
    let tenant = common::seed_tenant(&context, "Orbit Talent").await;
    common::seed_membership(&context, &user.id, &tenant.id, db::TenantRole::Employee, Some("Agent")).await;
    let (access_token, _refresh_token) = common::login(&server, "agent@example.com").await;
    let claims = auth::decode_access_token(&context.jwt, &access_token).unwrap();

    // Simulate a restart: the in-memory registry entry disappears, the token survives
    session::remove_session(&context.sessions, &claims.sid).await;
    assert!(session::get_session(&context.sessions, &claims.sid).await.is_none());

    let response = server
        .get("/auth/session")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    let session = &body["session"];
    assert_eq!(session["user"]["id"], user.id);
    assert_eq!(session["memberships"].as_array().unwrap().len(), 1);
    assert_eq!(session["current_tenant"]["tenant"]["id"], tenant.id);
}

#[tokio::test]
async fn test_workspace_reflects_selected_tenant() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "agent@example.com").await;
    let tenant_a = common::seed_tenant(&context, "First Agency").await;
    let tenant_b = common::seed_tenant(&context, "Second Agency").await;
    common::seed_membership(&context, &user.id, &tenant_a.id, db::TenantRole::Employee, Some("Agent")).await;
    let membership_b = common::seed_membership(
        &context,
        &user.id,
        &tenant_b.id,
        db::TenantRole::CompanyAdmin,
        Some("Director"),
    )
    .await;
    let (access_token, _refresh_token) = common::login(&server, "agent@example.com").await;

    let response = server
        .put("/auth/session/tenant")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .json(&json!({ "membership_id": membership_b }))
        .await;
    response.assert_status(StatusCode::OK);

    let response = server
        .get("/api/workspace")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["workspace"]["current_tenant"]["tenant"]["id"], tenant_b.id);
    assert_eq!(body["workspace"]["membership_count"], 2);
    assert_eq!(body["workspace"]["flags"]["is_company_admin"], true);
}

#[tokio::test]
async fn test_onboarding_completes_and_unblocks_routes() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "recruit@example.com").await;
    let tenant = common::seed_tenant(&context, "Orbit Talent").await;
    common::seed_membership(&context, &user.id, &tenant.id, db::TenantRole::Employee, None).await;
    let (access_token, _refresh_token) = common::login(&server, "recruit@example.com").await;

    // No job title yet, so guarded routes push the user into onboarding
    let response = server
        .get("/api/workspace")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/onboarding");

    let response = server
        .post("/api/onboarding")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .json(&json!({
            "job_title": "Agent",
            "department": "Talent",
            "phone": "+40 721 555 120"
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["result"], "ok");
    assert_eq!(body["session"]["current_tenant"]["job_title"], "Agent");
    assert_eq!(body["session"]["current_tenant"]["department"], "Talent");

    // The guard sees the completed state on the next request
    let response = server
        .get("/api/workspace")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .await;
    response.assert_status(StatusCode::OK);

    // The phone number landed on the profile
    let profile = context.db.profiles.get_by_id(&user.id).await.unwrap();
    assert_eq!(profile.phone.as_deref(), Some("+40 721 555 120"));
}

#[tokio::test]
async fn test_onboarding_rejects_blank_job_title() {
    let (server, context) = common::create_test_server(common::default_settings()).await;
    let user = common::seed_user(&context, "recruit@example.com").await;
    let tenant = common::seed_tenant(&context, "Orbit Talent").await;
    common::seed_membership(&context, &user.id, &tenant.id, db::TenantRole::Employee, None).await;
    let (access_token, _refresh_token) = common::login(&server, "recruit@example.com").await;

    let response = server
        .post("/api/onboarding")
        .add_header(header::AUTHORIZATION, common::bearer(&access_token))
        .json(&json!({ "job_title": "   " }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["result"], "error");
}
