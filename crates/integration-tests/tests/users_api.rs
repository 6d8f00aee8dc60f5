//! Administrator account management API.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use agente_cidadao_core::{UserRole, UserStatus};
use agente_cidadao_integration_tests::TestApp;
use agente_cidadao_portal::db::UserStore;
use agente_cidadao_portal::models::UserChanges;

async fn app_with_admin() -> (TestApp, String) {
    let app = TestApp::new();
    app.seed_admin("admin@portal.gov.br", "admin-pass").await;
    let cookie = app.login("admin@portal.gov.br", "admin-pass").await;
    (app, cookie)
}

#[tokio::test]
async fn test_requires_session_then_administrator() {
    let app = TestApp::new();
    app.seed_user("Ana", "ana@x.com", "secret1", "Usuário", UserStatus::Active)
        .await;

    let anonymous = app.get("/api/users", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let cookie = app.login("ana@x.com", "secret1").await;
    let ordinary = app.get("/api/users", Some(&cookie)).await;
    assert_eq!(ordinary.status, StatusCode::FORBIDDEN);
    assert_eq!(ordinary.error_code(), "Forbidden");
}

#[tokio::test]
async fn test_demotion_takes_effect_on_next_call() {
    let (app, cookie) = app_with_admin().await;
    assert_eq!(app.get("/api/users", Some(&cookie)).await.status, StatusCode::OK);

    let admin = app
        .users
        .get_by_email(&"admin@portal.gov.br".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    app.users
        .update(
            admin.id,
            &UserChanges {
                role: Some(UserRole::new("Usuário")),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap();

    let response = app.get("/api/users", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_administrator_session_is_invalid() {
    let (app, cookie) = app_with_admin().await;
    let admin = app
        .users
        .get_by_email(&"admin@portal.gov.br".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    app.users.delete(admin.id).await.unwrap();

    let response = app.get("/api/users", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "InvalidSession");
}

#[tokio::test]
async fn test_store_failure_during_admin_check_is_500() {
    let (app, cookie) = app_with_admin().await;
    app.users.set_unavailable(true);

    let response = app.get("/api/users", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "InternalError");
    assert_eq!(response.json()["message"], "Internal server error");
}

#[tokio::test]
async fn test_create_normalizes_email_and_rejects_duplicates() {
    let (app, cookie) = app_with_admin().await;

    let created = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({"name": "Ana", "email": "Ana@X.com", "password": "secret1"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let body = created.json();
    assert_eq!(body["user"]["email"], "ana@x.com");
    assert_eq!(body["user"]["role"], UserRole::DEFAULT);
    assert_eq!(body["user"]["status"], "active");
    assert!(body["user"].get("password_hash").is_none());

    let duplicate = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({"name": "Ana 2", "email": "ana@x.com ", "password": "secret1"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.error_code(), "Conflict");
}

#[tokio::test]
async fn test_create_validation() {
    let (app, cookie) = app_with_admin().await;

    let incomplete = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({"name": "Ana", "email": "ana@x.com"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);

    let weak = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({"name": "Ana", "email": "ana@x.com", "password": "12345"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);
    assert_eq!(weak.error_code(), "WeakPassword");

    let bad_email = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({"name": "Ana", "email": "not-an-email", "password": "secret1"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.error_code(), "ValidationFailed");
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let (app, cookie) = app_with_admin().await;
    for (name, email) in [("Ana", "ana@x.com"), ("Bia", "bia@x.com")] {
        let response = app
            .request(
                Method::POST,
                "/api/users",
                Some(json!({"name": name, "email": email, "password": "secret1"})),
                Some(&cookie),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let body = app.get("/api/users", Some(&cookie)).await.json();
    let emails: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, ["bia@x.com", "ana@x.com", "admin@portal.gov.br"]);
}

#[tokio::test]
async fn test_get_and_missing_ids() {
    let (app, cookie) = app_with_admin().await;
    let ana = app
        .seed_user("Ana", "ana@x.com", "secret1", "Usuário", UserStatus::Active)
        .await;

    let found = app
        .get(&format!("/api/users/{}", ana.id), Some(&cookie))
        .await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.json()["user"]["name"], "Ana");

    let missing = app.get("/api/users/9999", Some(&cookie)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let not_a_number = app.get("/api/users/abc", Some(&cookie)).await;
    assert_eq!(not_a_number.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_partial_update() {
    let (app, cookie) = app_with_admin().await;
    let ana = app
        .seed_user("Ana", "ana@x.com", "secret1", "Usuário", UserStatus::Active)
        .await;
    app.seed_user("Bia", "bia@x.com", "secret1", "Usuário", UserStatus::Active)
        .await;
    let uri = format!("/api/users/{}", ana.id);

    let renamed = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"name": "Ana Souza", "email": ""})),
            Some(&cookie),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    let user = &renamed.json()["user"];
    assert_eq!(user["name"], "Ana Souza");
    assert_eq!(user["email"], "ana@x.com");

    let same_email = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"email": "ANA@x.com"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(same_email.status, StatusCode::OK);

    let taken = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"email": "bia@x.com"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let weak = app
        .request(Method::PUT, &uri, Some(json!({"password": "123"})), Some(&cookie))
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);

    let blank = app
        .request(Method::PUT, &uri, Some(json!({"password": "   "})), Some(&cookie))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.error_code(), "WeakPassword");

    let spaces = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"password": "      "})),
            Some(&cookie),
        )
        .await;
    assert_eq!(spaces.status, StatusCode::OK);
    app.login("ana@x.com", "      ").await;

    let new_password = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"password": "brand-new"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(new_password.status, StatusCode::OK);
    app.login("ana@x.com", "brand-new").await;

    let missing = app
        .request(
            Method::PUT,
            "/api/users/9999",
            Some(json!({"name": "Ghost"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_with_self_protection() {
    let (app, cookie) = app_with_admin().await;
    let admin = app
        .users
        .get_by_email(&"admin@portal.gov.br".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    app.seed_admin("second@portal.gov.br", "admin-pass").await;
    let ana = app
        .seed_user("Ana", "ana@x.com", "secret1", "Usuário", UserStatus::Active)
        .await;

    let own = app
        .request(
            Method::DELETE,
            &format!("/api/users/{}", admin.id),
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);
    assert_eq!(own.error_code(), "SelfDeletion");

    let other = app
        .request(
            Method::DELETE,
            &format!("/api/users/{}", ana.id),
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(other.status, StatusCode::OK);
    assert_eq!(other.json()["success"], true);

    let again = app
        .request(
            Method::DELETE,
            &format!("/api/users/{}", ana.id),
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_patch_with_self_protection() {
    let (app, cookie) = app_with_admin().await;
    let admin = app
        .users
        .get_by_email(&"admin@portal.gov.br".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    let ana = app
        .seed_user("Ana", "ana@x.com", "secret1", "Usuário", UserStatus::Active)
        .await;

    let own = app
        .request(
            Method::PATCH,
            &format!("/api/users/{}/status", admin.id),
            Some(json!({"status": "inactive"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);
    assert_eq!(own.error_code(), "SelfDeactivation");

    let own_active = app
        .request(
            Method::PATCH,
            &format!("/api/users/{}/status", admin.id),
            Some(json!({"status": "active"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(own_active.status, StatusCode::OK);

    let invalid = app
        .request(
            Method::PATCH,
            &format!("/api/users/{}/status", ana.id),
            Some(json!({"status": "banned"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.error_code(), "InvalidStatus");

    let deactivated = app
        .request(
            Method::PATCH,
            &format!("/api/users/{}/status", ana.id),
            Some(json!({"status": "inactive"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(deactivated.status, StatusCode::OK);
    assert_eq!(deactivated.json()["user"]["status"], "inactive");

    let login = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "ana@x.com", "password": "secret1"})),
            None,
        )
        .await;
    assert_eq!(login.error_code(), "AccountDisabled");

    let missing = app
        .request(
            Method::PATCH,
            "/api/users/9999/status",
            Some(json!({"status": "active"})),
            Some(&cookie),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
