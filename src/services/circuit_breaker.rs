use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Observable breaker state, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Internal state machine. `HalfOpen` always means the single probe call is
/// in flight; its outcome moves the breaker to `Closed` or back to `Open`.
#[derive(Debug, Clone, Copy)]
enum State {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen,
}

/// Read-only snapshot for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

/// Circuit breaker guarding calls to the upstream LLM endpoint.
///
/// Closed: calls pass through; each failure bumps a consecutive-failure
/// counter, each success resets it. At the threshold the breaker opens and
/// rejects calls until the cooldown elapses, then admits exactly one probe
/// (half-open). A successful probe closes the circuit; a failed probe
/// reopens it and restarts the cooldown.
///
/// All transitions happen under one mutex, so concurrent callers cannot
/// both win the half-open probe slot.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            state: Mutex::new(State::Closed { failures: 0 }),
        }
    }

    /// Ask permission to attempt an upstream call.
    ///
    /// Returns false while the circuit is open (cooldown not yet elapsed) or
    /// while a half-open probe is already in flight. When the cooldown has
    /// elapsed this grants the caller the probe slot atomically.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            State::Closed { .. } => true,
            State::Open { since } => {
                if since.elapsed() >= self.cooldown {
                    tracing::info!("circuit breaker half-open, admitting probe call");
                    *state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => false,
        }
    }

    /// Record a successful upstream call.
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            State::Closed { .. } => *state = State::Closed { failures: 0 },
            State::HalfOpen => {
                tracing::info!("circuit breaker closed after successful probe");
                *state = State::Closed { failures: 0 };
            }
            // A straggling success from before the circuit opened; ignore.
            State::Open { .. } => {}
        }
    }

    /// Record a failed upstream call.
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            State::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.failure_threshold {
                    tracing::warn!(
                        failures,
                        threshold = self.failure_threshold,
                        "circuit breaker opened"
                    );
                    *state = State::Open {
                        since: Instant::now(),
                    };
                } else {
                    *state = State::Closed { failures };
                }
            }
            State::HalfOpen => {
                tracing::warn!("circuit breaker reopened after failed probe");
                *state = State::Open {
                    since: Instant::now(),
                };
            }
            State::Open { .. } => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen => CircuitState::HalfOpen,
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let (observable, failures) = match *state {
            State::Closed { failures } => (CircuitState::Closed, failures),
            State::Open { .. } => (CircuitState::Open, self.failure_threshold),
            State::HalfOpen => (CircuitState::HalfOpen, self.failure_threshold),
        };
        CircuitBreakerSnapshot {
            state: observable,
            consecutive_failures: failures,
            failure_threshold: self.failure_threshold,
            cooldown_secs: self.cooldown.as_secs(),
        }
    }
}
