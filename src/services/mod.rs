pub mod circuit_breaker;
pub mod llm;
pub mod queue;
pub mod rate_limiter;
