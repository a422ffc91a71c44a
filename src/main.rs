use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use uigen::app_state::AppState;
use uigen::config::AppConfig;
use uigen::routes;
use uigen::services::circuit_breaker::CircuitBreaker;
use uigen::services::llm::{LlmClient, OpenAiBackend};
use uigen::services::queue::JobQueue;
use uigen::services::rate_limiter::RateLimiter;
use uigen::store::JobStore;
use uigen::worker;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing uigen server");

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not configured; generation jobs will fail upstream");
    }

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "generation_jobs_submitted",
        "Total generation jobs submitted"
    );
    metrics::describe_counter!(
        "generation_jobs_completed",
        "Total generation jobs completed successfully"
    );
    metrics::describe_counter!("generation_jobs_failed", "Total generation jobs that failed");
    metrics::describe_gauge!(
        "generation_queue_depth",
        "Current number of pending jobs in the queue"
    );
    metrics::describe_histogram!(
        "generation_processing_seconds",
        "Time to process one generation job"
    );

    // Fault-tolerance machinery
    let limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit_window_secs),
        config.rate_limit_max_requests,
    );
    let breaker = Arc::new(CircuitBreaker::new(
        config.circuit_breaker_threshold,
        Duration::from_secs(config.circuit_breaker_cooldown_secs),
    ));

    // Upstream LLM client
    let backend = Arc::new(OpenAiBackend::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));
    let llm = LlmClient::new(
        backend,
        breaker.clone(),
        Duration::from_secs(config.llm_timeout_secs),
        config.llm_max_attempts,
        Duration::from_millis(config.llm_backoff_base_ms),
    );

    // Job store and queue
    let store = JobStore::new();
    let queue = JobQueue::new();

    let worker_count = config.worker_count.max(1);
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, store, queue, limiter, breaker, llm);

    // Background workers draining the queue
    for worker_id in 0..worker_count {
        tokio::spawn(worker::run(state.clone(), worker_id));
    }

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/generate", post(routes::generate::submit_generation))
        .route("/api/v1/jobs/{job_id}", get(routes::generate::get_job_status))
        .route("/api/v1/history", get(routes::history::get_history))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // prompts are small

    tracing::info!("Starting uigen on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
