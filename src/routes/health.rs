use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::services::circuit_breaker::CircuitBreakerSnapshot;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub circuit_breaker: CircuitBreakerSnapshot,
    pub rate_limiter: RateLimiterInfo,
    pub upstream_key_configured: bool,
    pub queue_depth: usize,
}

#[derive(Serialize)]
pub struct RateLimiterInfo {
    pub window_secs: u64,
    pub max_requests: usize,
}

/// GET /health — read-only introspection of the fault-tolerance machinery.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        circuit_breaker: state.breaker.snapshot(),
        rate_limiter: RateLimiterInfo {
            window_secs: state.limiter.window().as_secs(),
            max_requests: state.limiter.max_requests(),
        },
        upstream_key_configured: state.config.openai_api_key.is_some(),
        queue_depth: state.queue.depth(),
    })
}
