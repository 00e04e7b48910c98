use crate::api::rate_limit::log_rate_limit_events;
use crate::config::Config;
use crate::services::account_service::AccountService;
use crate::services::auth_service::AuthService;
use crate::services::health_service::HealthService;
use crate::services::livestock_service::LivestockService;
use axum::body::Body;
use axum::http::{HeaderName, Request, StatusCode};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod animals;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod middleware;
pub mod rate_limit;
pub mod schemas;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub auth_service: AuthService,
    pub account_service: AccountService,
    pub livestock_service: LivestockService,
    pub rate_limit_metrics: rate_limit::Metrics,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub auth_service: AuthService,
    pub account_service: AccountService,
    pub livestock_service: LivestockService,
}

/// Configures and returns the primary application router.
///
/// The auth routes are rate limited per peer IP, so the router must be served
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
///
/// # Panics
/// Panics if the rate limiter configuration cannot be constructed.
pub fn app_router(config: Config, services: ServiceContainer) -> Router {
    let auth_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(replenish_interval_ns(config.rate_limit.auth_per_second))
            .burst_size(config.rate_limit.auth_burst.max(1))
            .finish()
            .expect("Failed to build auth rate limiter config"),
    );

    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);

    let state = AppState {
        config,
        auth_service: services.auth_service,
        account_service: services.account_service,
        livestock_service: services.livestock_service,
        rate_limit_metrics: rate_limit::Metrics::new(),
    };

    // Credential-handling routes carry the stricter limit.
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .layer(GovernorLayer::new(auth_conf))
        .layer(from_fn_with_state(state.clone(), log_rate_limit_events));

    let api_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/animals", get(animals::list_animals).post(animals::create_animal))
        .route(
            "/animals/{id}",
            get(animals::get_animal).put(animals::update_animal).delete(animals::delete_animal),
        )
        .route(
            "/animals/{id}/health-records",
            get(animals::list_health_records).post(animals::add_health_record),
        )
        .route("/dashboard", get(dashboard::summary));

    Router::new()
        .nest("/api", auth_routes.merge(api_routes))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(|response: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                    let status = response.status();
                    span.record("http.response.status_code", status.as_u16());

                    tracing::info!(
                        latency_ms = %latency.as_millis(),
                        status = %status.as_u16(),
                        "request completed"
                    );
                })
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER), MakeRequestUuid))
        .with_state(state)
}

/// Nanoseconds between replenished permits for a per-second rate. Never zero,
/// since the limiter rejects a zero period.
fn replenish_interval_ns(per_second: u32) -> u64 {
    (1_000_000_000 / u64::from(per_second.max(1))).max(1)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
