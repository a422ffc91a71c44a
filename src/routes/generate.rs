use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::api::{GenerateRequest, GenerateResponse, JobStatusResponse};
use crate::services::rate_limiter::RateLimitDecision;

/// POST /api/v1/generate — submit a prompt for asynchronous UI generation.
///
/// Validates, applies the rate limiter, creates a pending job, and enqueues
/// it. Returns the job id immediately; the LLM call happens in a worker.
pub async fn submit_generation(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    body.validate()
        .map_err(|report| ApiError::Validation(report.to_string()))?;

    if body.prompt.chars().count() > state.config.max_prompt_chars {
        return Err(ApiError::Validation(format!(
            "prompt exceeds {} characters",
            state.config.max_prompt_chars
        )));
    }

    let client_key = client_key(&headers, addr);
    let remaining = match state.limiter.check(&client_key) {
        RateLimitDecision::Allowed { remaining } => remaining,
        RateLimitDecision::Denied => {
            tracing::warn!(client = %client_key, "rate limit exceeded");
            return Err(ApiError::RateLimited {
                retry_after_secs: state.config.rate_limit_window_secs,
            });
        }
    };

    let job = state.store.create(body.prompt).await;
    state.queue.enqueue(job.id);
    metrics::counter!("generation_jobs_submitted").increment(1);

    tracing::info!(job_id = %job.id, client = %client_key, "generation job created");

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            job_id: job.id,
            status: job.status,
            message: "Generation job started".to_string(),
            rate_limit_remaining: remaining,
        }),
    ))
}

/// GET /api/v1/jobs/{job_id} — poll a generation job.
///
/// Reads the authoritative record directly; no caching, so a poll after a
/// worker write always sees that write.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = state
        .store
        .get(job_id)
        .await
        .ok_or(ApiError::NotFound(job_id))?;

    Ok(Json(job.into()))
}

/// Rate-limit key for the calling client: the first X-Forwarded-For entry
/// when running behind a proxy, otherwise the peer address.
fn client_key(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "10.1.2.3:9999".parse().unwrap()
    }

    #[test]
    fn client_key_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers, addr()), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_to_peer_ip() {
        assert_eq!(client_key(&HeaderMap::new(), addr()), "10.1.2.3");
    }
}
