#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use herdbook::client::{ApiClient, ClientError, StoreKey};
use reqwest::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_client_recovers_from_rejected_access_token() {
    let app = common::TestApp::spawn().await;
    let client = app.api_client();
    let username = common::unique_name("e2e");
    let profile = client.register(&username, "password123").await.unwrap();

    let old_refresh = client.store().get(StoreKey::RefreshToken).await.unwrap();
    client.store().set(StoreKey::AccessToken, "garbage").await.unwrap();

    let me = client.me().await.unwrap();
    assert_eq!(me, profile);

    let new_refresh = client.store().get(StoreKey::RefreshToken).await.unwrap();
    assert_ne!(new_refresh, old_refresh);
    assert_ne!(client.store().get(StoreKey::AccessToken).await.as_deref(), Some("garbage"));

    let resp = app.post_json("/auth/refresh", &json!({ "refreshToken": old_refresh })).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_rotation() {
    let app = common::TestApp::spawn().await;
    let client = app.api_client();
    client.register(&common::unique_name("burst"), "password123").await.unwrap();
    client.store().set(StoreKey::AccessToken, "garbage").await.unwrap();

    // A second refresh would present a token the server already rotated out
    // and end the session, so every call succeeding proves a single refresh.
    let results = futures::future::join_all((0..8).map(|_| client.me())).await;
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    assert!(client.restore_session().await.is_some());
}

#[tokio::test]
async fn test_revoked_session_is_cleared() {
    let app = common::TestApp::spawn().await;
    let client = app.api_client();
    client.register(&common::unique_name("revoked"), "password123").await.unwrap();

    let refresh_token = client.store().get(StoreKey::RefreshToken).await.unwrap();
    let resp = app.post_json("/auth/logout", &json!({ "refreshToken": refresh_token })).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    client.store().set(StoreKey::AccessToken, "garbage").await.unwrap();

    let err = client.me().await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired { .. }), "{err:?}");
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(client.restore_session().await.is_none());
}

#[tokio::test]
async fn test_logout_clears_local_and_server_session() {
    let app = common::TestApp::spawn().await;
    let client = app.api_client();
    client.register(&common::unique_name("bye"), "password123").await.unwrap();
    let refresh_token = client.store().get(StoreKey::RefreshToken).await.unwrap();

    client.logout().await;

    assert!(client.restore_session().await.is_none());
    let resp = app.post_json("/auth/refresh", &json!({ "refreshToken": refresh_token })).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Nothing stored: protected calls fail without a refresh attempt.
    let err = client.me().await.unwrap_err();
    assert!(err.should_logout());
}

#[tokio::test]
async fn test_file_store_restores_session_across_clients() {
    let app = common::TestApp::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let config = app.client_config().with_token_dir(dir.path());
    let username = common::unique_name("persist");

    let first = ApiClient::new(&config).unwrap();
    first.register(&username, "password123").await.unwrap();
    let profile = first.login(&username, "password123").await.unwrap();
    drop(first);

    let second = ApiClient::new(&config).unwrap();
    let session = second.restore_session().await.unwrap();
    assert_eq!(session.user, profile);
    assert_eq!(second.me().await.unwrap(), profile);
}

#[tokio::test]
async fn test_bad_credentials_leave_store_untouched() {
    let app = common::TestApp::spawn().await;
    let client = app.api_client();

    let err = client.login("nobody_here", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(client.restore_session().await.is_none());
}
