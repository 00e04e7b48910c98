use crate::api::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use opentelemetry::{KeyValue, global, metrics::Counter};

#[derive(Clone, Debug)]
pub struct Metrics {
    decisions_total: Counter<u64>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        let meter = global::meter("herdbook");
        Self {
            decisions_total: meter
                .u64_counter("rate_limit_decisions_total")
                .with_description("Rate limit decisions on auth routes (allowed/throttled)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records whether the governor let an auth request through.
pub async fn log_rate_limit_events(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let label = if response.status() == StatusCode::TOO_MANY_REQUESTS {
        let after = response.headers().get("x-ratelimit-after").and_then(|v| v.to_str().ok()).unwrap_or("?");
        tracing::warn!("Rate limit exceeded (retry allowed after {}s)", after);
        "throttled"
    } else {
        "allowed"
    };
    state.rate_limit_metrics.decisions_total.add(1, &[KeyValue::new("status", label)]);

    response
}
