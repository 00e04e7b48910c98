use crate::api::MgmtState;
use crate::api::schemas::health::HealthResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe: the database must answer and be migrated.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    match state.health_service.check_db().await {
        Ok(version) => {
            let body = HealthResponse { status: "ok".into(), database: "ok".into(), schema_version: Some(version) };
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            tracing::warn!(error = %e, component = "database", "Readiness probe failed");
            let body = HealthResponse { status: "error".into(), database: "error".into(), schema_version: None };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body))
        }
    }
}
