//! Registration, login, role management and customer lookup over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use bookshop_integration_tests::TestApp;
use serde_json::json;

// =============================================================================
// Registration and login
// =============================================================================

#[tokio::test]
async fn test_first_admin_bootstraps_then_second_is_refused() {
    let app = TestApp::new();

    let first = app.register("boss", Some("admin")).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json()["role"], "Admin");
    assert!(first.json().get("passwordHash").is_none());

    let second = app.register("mallory", Some("admin")).await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);

    let plain = app.register("anna", Some("superuser")).await;
    assert_eq!(plain.status, StatusCode::OK);
    assert_eq!(plain.json()["role"], "User");
}

#[tokio::test]
async fn test_duplicate_username_and_email_conflict() {
    let app = TestApp::new();
    app.register("anna", None).await;

    let same_name = app
        .post(
            "/auth/register",
            None,
            json!({ "username": "ANNA", "email": "other@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(same_name.status, StatusCode::CONFLICT);

    let same_email = app
        .post(
            "/auth/register",
            None,
            json!({ "username": "hania", "email": "anna@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(same_email.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_returns_bearer_token() {
    let app = TestApp::new();
    app.register("anna", None).await;

    let token = app.login("anna").await;
    assert!(token.starts_with("Bearer "));

    let wrong = app
        .post(
            "/auth/login",
            None,
            json!({ "username": "anna", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .post(
            "/auth/login",
            None,
            json!({ "username": "ghost", "password": "password123" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let app = TestApp::new();

    let missing = app.get("/customers", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert!(missing.headers.contains_key("www-authenticate"));

    let garbage = app.get("/customers", Some("Bearer not.a.jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let checkout = app.post("/orders/checkout", None, json!({})).await;
    assert_eq!(checkout.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Account changes
// =============================================================================

#[tokio::test]
async fn test_user_updates_own_account_and_logs_in_with_new_name() {
    let app = TestApp::new();
    let (_, token) = app.sign_up("anna", None).await;

    let updated = app
        .put(
            "/auth/update-account",
            Some(&token),
            json!({ "newUsername": "anna.k", "email": "anna.k@example.com" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);

    app.login("anna.k").await;
}

#[tokio::test]
async fn test_user_cannot_update_someone_else() {
    let app = TestApp::new();
    app.register("piotr", None).await;
    let (_, token) = app.sign_up("anna", None).await;

    let response = app
        .put(
            "/auth/update-account",
            Some(&token),
            json!({ "username": "piotr", "newUsername": "hacked" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reset_password() {
    let app = TestApp::new();
    let (_, token) = app.sign_up("anna", None).await;

    let same = app
        .post(
            "/auth/reset-password",
            Some(&token),
            json!({ "email": "anna@example.com", "newPassword": "password123" }),
        )
        .await;
    assert_eq!(same.status, StatusCode::BAD_REQUEST);

    let changed = app
        .post(
            "/auth/reset-password",
            Some(&token),
            json!({ "email": "anna@example.com", "newPassword": "correct-horse" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK, "{}", changed.body);

    let login = app
        .post(
            "/auth/login",
            None,
            json!({ "username": "anna", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_role_is_admin_only_and_keeps_last_admin() {
    let app = TestApp::new();
    let (_, admin) = app.sign_up("boss", Some("admin")).await;
    let (_, user) = app.sign_up("anna", None).await;

    let by_user = app
        .put(
            "/auth/change-role",
            Some(&user),
            json!({ "username": "anna", "newRole": "admin" }),
        )
        .await;
    assert_eq!(by_user.status, StatusCode::FORBIDDEN);

    let last_admin = app
        .put(
            "/auth/change-role",
            Some(&admin),
            json!({ "username": "boss", "newRole": "user" }),
        )
        .await;
    assert_eq!(last_admin.status, StatusCode::BAD_REQUEST);

    let promoted = app
        .put(
            "/auth/change-role",
            Some(&admin),
            json!({ "username": "anna", "newRole": "Admin" }),
        )
        .await;
    assert_eq!(promoted.status, StatusCode::OK, "{}", promoted.body);
    assert_eq!(promoted.json()["role"], "Admin");
}

// =============================================================================
// Customer lookup
// =============================================================================

#[tokio::test]
async fn test_customer_lookup_is_self_or_admin() {
    let app = TestApp::new();
    let (_, admin) = app.sign_up("boss", Some("admin")).await;
    let (anna_id, anna) = app.sign_up("anna", None).await;
    let (piotr_id, _) = app.sign_up("piotr", None).await;

    let own = app.get(&format!("/customers/{anna_id}"), Some(&anna)).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.json()["username"], "anna");

    let other = app.get(&format!("/customers/{piotr_id}"), Some(&anna)).await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let list_as_user = app.get("/customers", Some(&anna)).await;
    assert_eq!(list_as_user.status, StatusCode::FORBIDDEN);

    let list = app.get("/customers", Some(&admin)).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.json().as_array().unwrap().len(), 3);

    let missing = app.get("/customers/999", Some(&admin)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Health and request ids
// =============================================================================

#[tokio::test]
async fn test_health_and_request_id() {
    let app = TestApp::new();

    let health = app.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body, "ok");
    assert!(health.headers.contains_key("x-request-id"));

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}
