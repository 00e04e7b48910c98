#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use herdbook::AppBuilder;
use herdbook::adapters::database::{DbPool, init_pool};
use herdbook::api::{MgmtState, app_router, mgmt_router};
use herdbook::client::{ApiClient, ClientConfig, MemoryTokenStore, StoreKey, TokenStore};
use herdbook::config::Config;
use clap::Parser;
use reqwest::Url;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("herdbook=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Parses a server config for tests. Flags in `extra` replace the test
/// defaults of the same name instead of repeating them.
pub fn test_config(extra: &[&str]) -> Config {
    let defaults = [
        ("--jwt-secret", "test_secret"),
        ("--database-url", "sqlite::memory:"),
        ("--host", "127.0.0.1"),
        ("--auth-per-second", "10000"),
        ("--auth-burst", "10000"),
        ("--token-cleanup-interval-secs", "0"),
    ];

    let mut args = vec!["herdbook"];
    for (flag, value) in defaults {
        if !extra.contains(&flag) {
            args.extend([flag, value]);
        }
    }
    args.extend_from_slice(extra);
    Config::try_parse_from(args).unwrap()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await.unwrap();
    });
    addr
}

/// The real server on a private in-memory database.
pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub config: Config,
    pub pool: DbPool,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(&[]).await
    }

    pub async fn spawn_with(extra: &[&str]) -> Self {
        setup_tracing();
        let config = test_config(extra);

        let pool = init_pool(&config.database).await.unwrap();
        herdbook::run_migrations(&pool).await.unwrap();

        let app = AppBuilder::new(config.clone()).with_database(pool.clone()).build().unwrap();
        let api_addr = serve(app_router(config.clone(), app.services)).await;
        let mgmt_addr = serve(mgmt_router(MgmtState { health_service: app.health_service })).await;

        Self {
            server_url: format!("http://{api_addr}/api"),
            mgmt_url: format!("http://{mgmt_addr}"),
            client: reqwest::Client::new(),
            config,
            pool,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(Url::parse(&self.server_url).unwrap())
    }

    /// An `ApiClient` with its own in-memory token store.
    pub fn api_client(&self) -> ApiClient {
        ApiClient::new(&self.client_config()).unwrap()
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client.post(format!("{}{path}", self.server_url)).json(body).send().await.unwrap()
    }

    /// Registers a fresh user and returns the `data` object of the response.
    pub async fn register(&self, prefix: &str) -> Value {
        let username = unique_name(prefix);
        let resp = self.post_json("/auth/register", &json!({ "username": username, "password": "password123" })).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json::<Value>().await.unwrap()["data"].clone()
    }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", &Uuid::new_v4().simple().to_string()[..8])
}

/// Behaviour of the stub's refresh endpoint.
#[derive(Clone, Debug)]
pub struct StubOptions {
    pub refresh_delay: Duration,
    pub refresh_fails: bool,
    pub rotate_refresh_token: bool,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self { refresh_delay: Duration::from_millis(0), refresh_fails: false, rotate_refresh_token: true }
    }
}

#[derive(Clone, Debug)]
struct StubState {
    options: StubOptions,
    refresh_calls: Arc<AtomicUsize>,
    always_401_calls: Arc<AtomicUsize>,
    seen_auth: Arc<Mutex<Vec<String>>>,
    valid_token: Arc<Mutex<String>>,
}

/// A minimal API that accepts exactly one access token at a time and issues
/// `T2` from its refresh endpoint.
#[derive(Debug)]
pub struct StubServer {
    pub url: Url,
    state: StubState,
}

impl StubServer {
    pub async fn spawn(options: StubOptions) -> Self {
        setup_tracing();
        let state = StubState {
            options,
            refresh_calls: Arc::default(),
            always_401_calls: Arc::default(),
            seen_auth: Arc::default(),
            valid_token: Arc::new(Mutex::new("T1-valid".to_string())),
        };

        let router = Router::new()
            .route("/api/resource", get(stub_resource))
            .route("/api/always-401", get(stub_always_401))
            .route("/api/forbidden", get(|| async { (StatusCode::FORBIDDEN, Json(json!({ "error": "Forbidden resource" }))) }))
            .route("/api/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>") }))
            .route(
                "/api/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Json(json!({ "data": {} }))
                }),
            )
            .route("/api/auth/refresh", post(stub_refresh))
            .with_state(state.clone());

        let addr = serve(router).await;
        Self { url: Url::parse(&format!("http://{addr}/api/")).unwrap(), state }
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn always_401_calls(&self) -> usize {
        self.state.always_401_calls.load(Ordering::SeqCst)
    }

    /// Authorization headers seen by `/resource`, in arrival order.
    pub fn seen_auth(&self) -> Vec<String> {
        self.state.seen_auth.lock().unwrap().clone()
    }

    /// A client whose store holds an access token the stub rejects, plus a refresh token.
    pub async fn client_with_expired_token(&self) -> (ApiClient, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(StoreKey::AccessToken, "T1").await.unwrap();
        store.set(StoreKey::RefreshToken, "R1").await.unwrap();
        store.set(StoreKey::User, r#"{"id":"0192e0a0-0000-7000-8000-000000000000","username":"stub"}"#).await.unwrap();
        (self.client(store.clone(), Duration::from_secs(5)), store)
    }

    pub fn client(&self, store: Arc<dyn TokenStore>, timeout: Duration) -> ApiClient {
        let config = ClientConfig::new(self.url.clone()).with_timeout(timeout);
        ApiClient::with_store(&config, store).unwrap()
    }
}

async fn stub_resource(State(state): State<StubState>, headers: HeaderMap) -> impl IntoResponse {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    state.seen_auth.lock().unwrap().push(auth.clone());

    let expected = format!("Bearer {}", state.valid_token.lock().unwrap());
    if auth == expected {
        (StatusCode::OK, Json(json!({ "data": { "ok": true } })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })))
    }
}

async fn stub_always_401(State(state): State<StubState>) -> impl IntoResponse {
    state.always_401_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })))
}

async fn stub_refresh(State(state): State<StubState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.options.refresh_delay).await;

    if state.options.refresh_fails || body["refreshToken"] != "R1" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid refresh token" })));
    }

    *state.valid_token.lock().unwrap() = "T2".to_string();
    let mut data = json!({ "accessToken": "T2" });
    if state.options.rotate_refresh_token {
        data["refreshToken"] = json!("R2");
    }
    (StatusCode::OK, Json(json!({ "data": data })))
}
