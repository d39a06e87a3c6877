use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

/// Sliding window in-memory rate limiter (process local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window { entry.pop_front(); } else { break; }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Limits for public form submissions.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub intake_limit: usize,
    pub intake_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { intake_limit: 5, intake_window: Duration::from_secs(3600) }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let intake_limit = std::env::var("RL_INTAKE_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.intake_limit);
        let intake_window = std::env::var("RL_INTAKE_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.intake_window);
        Self { intake_limit, intake_window }
    }
}

/// High level guard used by handlers.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }

    /// One consultation request per call, keyed by client address.
    pub fn allow_intake(&self, ip: &str) -> bool {
        self.limiter.check(&format!("intake:{ip}"), self.cfg.intake_limit, self.cfg.intake_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_basic() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(50);
        for _ in 0..3 { assert!(rl.check("k", 3, window)); }
        assert!(!rl.check("k", 3, window));
    }

    #[test]
    fn intake_keys_are_per_address() {
        let cfg = RateLimitConfig { intake_limit: 1, intake_window: Duration::from_secs(60) };
        let facade = RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg);
        assert!(facade.allow_intake("10.0.0.1"));
        assert!(!facade.allow_intake("10.0.0.1"));
        assert!(facade.allow_intake("10.0.0.2"));
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let rl = InMemoryRateLimiter::new(false);
        for _ in 0..10 { assert!(rl.check("k", 1, Duration::from_secs(60))); }
    }
}
