//! Fixed-window rate limiting for membership probes.
//!
//! Process-local only. Each instance sees its own slice of traffic, which is
//! enough to blunt a cookie-driven enumeration vector but is not a
//! billing-grade quota. Horizontally scaled deployments that need a shared
//! counter must externalize this state.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counter keyed by principal id.
///
/// The first call for a key opens a window; calls inside the window
/// increment the count and are denied once it reaches the maximum. Denied
/// calls do not consume an increment. A call after the window elapsed starts
/// a fresh one.
pub struct FixedWindowLimiter {
    entries: DashMap<String, Window>,
    max_attempts: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_attempts: max_attempts.max(1),
            window,
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// The clock is a parameter so tests can drive window boundaries.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + self.window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_attempts {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_attempts - entry.count,
        }
    }

    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    /// Drop every entry whose window has elapsed.
    pub fn sweep_at(&self, now: Instant) {
        self.entries.retain(|_, window| now < window.reset_at);
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Start the periodic sweep so abandoned keys do not accumulate.
    /// The returned handle owns the task; `stop` shuts it down cleanly.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let limiter = Arc::clone(self);
        let token = CancellationToken::new();
        let child = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => limiter.sweep(),
                }
            }
        });

        SweeperHandle { token, task }
    }
}

pub struct SweeperHandle {
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_opens_window() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        let decision = limiter.check("user-a");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
    }

    #[test]
    fn denies_after_max_attempts_within_window() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now).allowed);
        let third = limiter.check_at("k", now);
        assert!(third.allowed);
        assert_eq!(third.remaining, 0);

        let fourth = limiter.check_at("k", now);
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
    }

    #[test]
    fn denied_calls_do_not_consume_increments() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("k", now).allowed);
        assert!(!limiter.check_at("k", now).allowed);
        assert!(!limiter.check_at("k", now).allowed);

        // A fresh window still admits exactly one call.
        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("k", later).allowed);
        assert!(!limiter.check_at("k", later).allowed);
    }

    #[test]
    fn window_resets_after_elapsing() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now).allowed);
        assert!(!limiter.check_at("k", now).allowed);

        let later = now + Duration::from_secs(60);
        let fresh = limiter.check_at("k", later);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("a", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
    }

    #[test]
    fn sweep_drops_expired_entries_only() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();

        limiter.check_at("old", now);
        limiter.check_at("fresh", now + Duration::from_secs(30));
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.sweep_at(now + Duration::from_secs(61));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn sweeper_lifecycle_stops_cleanly() {
        let limiter = Arc::new(FixedWindowLimiter::new(5, Duration::from_millis(10)));
        let handle = limiter.spawn_sweeper(Duration::from_millis(5));
        limiter.check("k");
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop().await;
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
