//! Login attempt rate limiting.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::error;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const RATE_LIMITED_MESSAGE: &str = "Too many login attempts, please try again later.";

// Bucket shared by requests whose client address could not be resolved.
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    /// Record a login attempt from `ip` and decide whether it may proceed.
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision;

    /// Drop bookkeeping that no longer affects any decision.
    fn prune(&self) {}
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Fixed number of attempts per client inside a rolling window.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowRateLimiter {
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn check_ip_at(&self, ip: Option<&str>, now: Instant) -> RateLimitDecision {
        let Ok(mut attempts) = self.attempts.lock() else {
            error!("Rate limiter lock poisoned");
            // Fail closed
            return RateLimitDecision::Limited;
        };

        let bucket = attempts
            .entry(ip.unwrap_or(UNKNOWN_CLIENT).to_string())
            .or_default();
        while bucket
            .front()
            .is_some_and(|at| now.saturating_duration_since(*at) >= self.window)
        {
            bucket.pop_front();
        }

        if bucket.len() >= self.max_attempts as usize {
            return RateLimitDecision::Limited;
        }

        bucket.push_back(now);
        RateLimitDecision::Allowed
    }

    pub fn prune_at(&self, now: Instant) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.retain(|_, bucket| {
                bucket
                    .back()
                    .is_some_and(|at| now.saturating_duration_since(*at) < self.window)
            });
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.attempts.lock().map_or(0, |attempts| attempts.len())
    }
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision {
        self.check_ip_at(ip, Instant::now())
    }

    fn prune(&self) {
        self.prune_at(Instant::now());
    }
}
