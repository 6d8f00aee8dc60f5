//! Webhook relay, liveness and readiness.

#![allow(clippy::unwrap_used)]

use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::post,
};
use serde_json::{Value, json};
use url::Url;

use agente_cidadao_integration_tests::TestApp;

/// Start a throwaway upstream on a random port and return its base URL.
async fn spawn_upstream(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/hooks")).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert!(
        chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok()
    );
}

#[tokio::test]
async fn test_readiness_follows_settings_store() {
    let app = TestApp::new();
    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::OK);

    app.settings.set_unavailable(true);
    assert_eq!(
        app.get("/health/ready", None).await.status,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_webhook_echo_without_forward_url() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/webhook/form-42",
            Some(json!({"citizen": "Ana", "topic": "iluminação"})),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["webhookId"], "form-42");
    assert_eq!(body["receivedData"]["citizen"], "Ana");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_webhook_echo_with_empty_body() {
    let app = TestApp::new();

    let response = app.request(Method::POST, "/webhook/ping", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["receivedData"], json!({}));
}

#[tokio::test]
async fn test_webhook_relays_upstream_status_and_body() {
    let upstream = Router::new().route(
        "/hooks/{id}",
        post(
            |Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                let content_type = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                (
                    StatusCode::ACCEPTED,
                    Json(json!({"id": id, "echo": body, "contentType": content_type})),
                )
            },
        ),
    );
    let base = spawn_upstream(upstream).await;
    let app = TestApp::builder().webhook_forward_url(base).build();

    let response = app
        .request(Method::POST, "/webhook/abc", Some(json!({"n": 1})), None)
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    let body = response.json();
    assert_eq!(body["id"], "abc");
    assert_eq!(body["echo"], json!({"n": 1}));
    assert_eq!(body["contentType"], "application/json");
}

#[tokio::test]
async fn test_webhook_non_json_upstream_is_500() {
    let upstream = Router::new().route("/hooks/{id}", post(|| async { "plain text" }));
    let base = spawn_upstream(upstream).await;
    let app = TestApp::builder().webhook_forward_url(base).build();

    let response = app
        .request(Method::POST, "/webhook/abc", Some(json!({})), None)
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "InternalError");
}

#[tokio::test]
async fn test_webhook_unreachable_upstream_is_500() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = Url::parse(&format!("http://{addr}/hooks")).unwrap();
    let app = TestApp::builder().webhook_forward_url(base).build();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhook/abc")
        .body(Body::from("raw"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "Internal server error");
}
