#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use axum::http::StatusCode;
mod common;

#[tokio::test]
async fn test_livez() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/livez", app.mgmt_url)).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readyz_happy_path() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/readyz", app.mgmt_url)).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["schemaVersion"], 20_260_301_000_100_i64);
}

#[tokio::test]
async fn test_readyz_database_error() {
    let app = common::TestApp::spawn().await;

    // Close the pool to simulate a database outage
    app.pool.close().await;

    let resp = app.client.get(format!("{}/readyz", app.mgmt_url)).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["database"], "error");
    assert!(body.get("schemaVersion").is_none());
}

#[tokio::test]
async fn test_management_listener_does_not_serve_api() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/api/dashboard", app.mgmt_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.client.get(format!("{}/readyz", app.server_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
