use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request admitted; `remaining` slots left in the current window.
    Allowed { remaining: usize },
    /// Request denied. Nothing was recorded.
    Denied,
}

impl RateLimitDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// In-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key; entries older than the window
/// are pruned lazily on each check. The check-and-record step runs under one
/// lock, so two concurrent callers can never both claim the last slot.
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether a submission from `key` is admitted, recording it if so.
    /// Denial has no side effect. An untracked key counts as zero requests.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());

        let window_start = now.checked_sub(self.window);
        if let Some(start) = window_start {
            // Drop keys whose whole window has expired, so tracking stays
            // bounded by currently-active clients.
            requests.retain(|_, timestamps| timestamps.last().is_some_and(|ts| *ts > start));
        }

        let timestamps = requests.entry(key.to_string()).or_default();
        if let Some(start) = window_start {
            timestamps.retain(|ts| *ts > start);
        }

        if timestamps.len() >= self.max_requests {
            return RateLimitDecision::Denied;
        }

        timestamps.push(now);
        RateLimitDecision::Allowed {
            remaining: self.max_requests - timestamps.len(),
        }
    }

    /// Convenience predicate over [`check`](Self::check).
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).is_allowed()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn admits_up_to_limit_then_denies() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 10);

        for i in 0..10 {
            match limiter.check("client-a") {
                RateLimitDecision::Allowed { remaining } => {
                    assert_eq!(remaining, 10 - i - 1)
                }
                RateLimitDecision::Denied => panic!("request {i} should be admitted"),
            }
        }

        // 11th call within the window is denied.
        assert_eq!(limiter.check("client-a"), RateLimitDecision::Denied);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn denial_records_nothing() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        // Repeated denials must not extend the window occupancy.
        for _ in 0..5 {
            assert!(!limiter.allow("a"));
        }
        let requests = limiter.requests.lock().unwrap();
        assert_eq!(requests.get("a").map(Vec::len), Some(2));
    }

    #[test]
    fn window_expiry_readmits() {
        let limiter = RateLimiter::new(Duration::from_millis(50), 1);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.allow("a"));
    }

    #[test]
    fn idle_keys_are_dropped_from_tracking() {
        let limiter = RateLimiter::new(Duration::from_millis(30), 5);
        assert!(limiter.allow("a"));
        std::thread::sleep(Duration::from_millis(60));

        // A's window has fully expired; the next check sweeps it out.
        assert!(limiter.allow("b"));
        let requests = limiter.requests.lock().unwrap();
        assert!(!requests.contains_key("a"));
        assert!(requests.contains_key("b"));
    }

    #[test]
    fn concurrent_submissions_admit_exactly_the_limit() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), 10));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let limiter = limiter.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    if limiter.allow("shared") {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 10);
    }
}
