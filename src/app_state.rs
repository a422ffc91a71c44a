use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::circuit_breaker::CircuitBreaker;
use crate::services::llm::LlmClient;
use crate::services::queue::JobQueue;
use crate::services::rate_limiter::RateLimiter;
use crate::store::JobStore;

/// Shared application state passed to route handlers and workers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<JobStore>,
    pub queue: Arc<JobQueue>,
    pub limiter: Arc<RateLimiter>,
    pub breaker: Arc<CircuitBreaker>,
    pub llm: Arc<LlmClient>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: JobStore,
        queue: JobQueue,
        limiter: RateLimiter,
        breaker: Arc<CircuitBreaker>,
        llm: LlmClient,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            queue: Arc::new(queue),
            limiter: Arc::new(limiter),
            breaker,
            llm: Arc::new(llm),
        }
    }
}
