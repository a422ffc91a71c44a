use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Upstream LLM API key. Generation jobs fail upstream if absent.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Upstream chat-completion model.
    #[serde(default = "default_model")]
    pub openai_model: String,

    /// Sliding-window length for submission rate limiting, in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Maximum submissions per client key within one window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: usize,

    /// Consecutive upstream failures before the circuit opens.
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,

    /// Seconds the circuit stays open before a half-open probe is allowed.
    #[serde(default = "default_circuit_breaker_cooldown_secs")]
    pub circuit_breaker_cooldown_secs: u64,

    /// Per-attempt upstream call timeout, in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Total upstream attempts per job (first call plus retries).
    #[serde(default = "default_llm_max_attempts")]
    pub llm_max_attempts: u32,

    /// Base backoff between retries, in milliseconds. Doubles per attempt.
    #[serde(default = "default_llm_backoff_base_ms")]
    pub llm_backoff_base_ms: u64,

    /// Number of background worker tasks draining the job queue.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum accepted prompt length, in characters.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> usize {
    10
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

fn default_circuit_breaker_cooldown_secs() -> u64 {
    60
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_llm_max_attempts() -> u32 {
    3
}

fn default_llm_backoff_base_ms() -> u64 {
    500
}

fn default_worker_count() -> usize {
    2
}

fn default_max_prompt_chars() -> usize {
    4000
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            openai_api_key: None,
            openai_model: default_model(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            circuit_breaker_cooldown_secs: default_circuit_breaker_cooldown_secs(),
            llm_timeout_secs: default_llm_timeout_secs(),
            llm_max_attempts: default_llm_max_attempts(),
            llm_backoff_base_ms: default_llm_backoff_base_ms(),
            worker_count: default_worker_count(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}
