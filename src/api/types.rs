//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context - shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self::with_rate_limiter(core, RateLimiter::new())
    }

    pub fn with_rate_limiter(core: Arc<CoreState>, limiter: RateLimiter) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(limiter)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter
// ═══════════════════════════════════════════════════════════

/// Sliding-window request limiter keyed by client.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
    last_sweep: Option<Instant>,
}

const HOUR: Duration = Duration::from_secs(3600);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(100, 1000)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
            last_sweep: None,
        }
    }

    /// Record a request for `key`. Returns `Err(retry_after_secs)` when a
    /// window is full.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &str, now: Instant) -> Result<(), u64> {
        self.sweep_at(now);
        let entries = self.windows.entry(key.to_string()).or_default();

        entries.retain(|ts| now.saturating_duration_since(*ts) < HOUR);

        let last_minute = entries
            .iter()
            .filter(|ts| now.saturating_duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Forget clients with no request in the last hour. Runs at most once
    /// per minute.
    fn sweep_at(&mut self, now: Instant) {
        if let Some(last) = self.last_sweep {
            if now.saturating_duration_since(last) < SWEEP_INTERVAL {
                return;
            }
        }
        self.last_sweep = Some(now);
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.saturating_duration_since(*ts) < HOUR);
            !entries.is_empty()
        });
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_minute_limit() {
        let mut limiter = RateLimiter::with_limits(3, 100);
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("a", now).is_ok());
        }
        assert_eq!(limiter.check_at("a", now), Err(60));
        // Other keys have their own window
        assert!(limiter.check_at("b", now).is_ok());
    }

    #[test]
    fn minute_window_slides() {
        let mut limiter = RateLimiter::with_limits(1, 100);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("a", now + Duration::from_secs(30)).is_err());
        assert!(limiter.check_at("a", now + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn hour_limit_applies() {
        let mut limiter = RateLimiter::with_limits(100, 2);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("a", now + Duration::from_secs(120)).is_ok());
        assert_eq!(
            limiter.check_at("a", now + Duration::from_secs(240)),
            Err(3600)
        );
    }

    #[test]
    fn idle_clients_are_forgotten() {
        let mut limiter = RateLimiter::with_limits(10, 100);
        let now = Instant::now();
        for i in 0..50 {
            assert!(limiter.check_at(&format!("ip:10.0.0.{i}"), now).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 50);

        let later = now + Duration::from_secs(3601);
        assert!(limiter.check_at("ip:10.0.1.1", later).is_ok());
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn clients_inside_the_hour_are_kept() {
        let mut limiter = RateLimiter::with_limits(10, 100);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("b", now + Duration::from_secs(120)).is_ok());
        assert_eq!(limiter.tracked_clients(), 2);
    }
}
