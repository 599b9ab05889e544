use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Actions that hit the backend with side effects and are throttled per chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Login and registration attempts.
    Auth,
    /// Appointment confirmations.
    Booking,
}

impl Tier {
    fn limit(self) -> RateLimitConfig {
        match self {
            Tier::Auth => RateLimitConfig {
                max_requests: 10,
                window: Duration::from_secs(300),
            },
            Tier::Booking => RateLimitConfig {
                max_requests: 5,
                window: Duration::from_secs(300),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

/// Sliding-window limiter keyed by `(tier, chat id)`.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    hits: Arc<DashMap<(Tier, i64), Vec<Instant>>>,
    overrides: Arc<DashMap<Tier, RateLimitConfig>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the built-in limit of `tier`.
    pub fn set_limit(&self, tier: Tier, config: RateLimitConfig) {
        self.overrides.insert(tier, config);
    }

    fn config(&self, tier: Tier) -> RateLimitConfig {
        self.overrides
            .get(&tier)
            .map(|c| *c.value())
            .unwrap_or_else(|| tier.limit())
    }

    /// `Err(retry_after_secs)` when `chat` used up its budget for `tier`.
    pub fn check(&self, tier: Tier, chat: i64) -> Result<(), u64> {
        self.check_at(tier, chat, Instant::now())
    }

    fn check_at(&self, tier: Tier, chat: i64, now: Instant) -> Result<(), u64> {
        let config = self.config(tier);
        let mut entry = self.hits.entry((tier, chat)).or_default();
        entry.retain(|t| now.saturating_duration_since(*t) < config.window);

        if entry.len() >= config.max_requests {
            let retry_after = (entry[0] + config.window)
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        entry.push(now);
        Ok(())
    }

    /// Drops chats idle for more than twice their window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.hits.retain(|(tier, _), hits| {
            let cutoff = self.config(*tier).window * 2;
            hits.retain(|t| now.saturating_duration_since(*t) < cutoff);
            !hits.is_empty()
        });
    }

    pub fn tracked_chats(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: usize, window: Duration) -> RateLimiter {
        let limiter = RateLimiter::new();
        limiter.set_limit(
            Tier::Auth,
            RateLimitConfig {
                max_requests: max,
                window,
            },
        );
        limiter
    }

    #[test]
    fn test_builtin_booking_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check(Tier::Booking, 1).is_ok());
        }
        let retry = limiter.check(Tier::Booking, 1).unwrap_err();
        assert!((1..=300).contains(&retry));
    }

    #[test]
    fn test_chats_are_independent() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.check(Tier::Auth, 1).is_ok());
        assert!(limiter.check(Tier::Auth, 1).is_err());
        assert!(limiter.check(Tier::Auth, 2).is_ok());
    }

    #[test]
    fn test_tiers_are_independent() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.check(Tier::Auth, 1).is_ok());
        assert!(limiter.check(Tier::Auth, 1).is_err());
        assert!(limiter.check(Tier::Booking, 1).is_ok());
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(Tier::Auth, 1, start).is_ok());
        assert_eq!(
            limiter.check_at(Tier::Auth, 1, start + Duration::from_secs(20)),
            Err(40)
        );
        assert!(limiter
            .check_at(Tier::Auth, 1, start + Duration::from_secs(61))
            .is_ok());
    }

    #[test]
    fn test_cleanup_drops_idle_chats() {
        let limiter = limiter(10, Duration::from_millis(10));
        limiter
            .check_at(Tier::Auth, 1, Instant::now() - Duration::from_secs(1))
            .unwrap();
        limiter.check(Tier::Booking, 2).unwrap();
        limiter.cleanup();
        assert_eq!(limiter.tracked_chats(), 1);
    }
}
