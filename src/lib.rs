//! Asynchronous UI-generation job service.
//!
//! Accepts natural-language prompts, generates React components through an
//! external LLM endpoint, and serves results to polling clients. Submissions
//! pass a sliding-window rate limiter; upstream calls are guarded by a
//! circuit breaker with bounded timeout and retry.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod worker;
