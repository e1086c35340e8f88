use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Fixed-window rate limit: at most `max` permits per `window`.
#[derive(Clone, Copy, Debug)]
pub struct RateLimit {
    pub max: u32,
    pub window: Duration,
}

struct Window {
    started_at: Instant,
    count: u32,
}

/// Throttles job claims to protect downstream consumers, independent of
/// worker concurrency.
pub struct RateLimiter {
    limit: RateLimit,
    window: Mutex<Window>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            window: Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Waits until a permit is available in the current window.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let elapsed = window.started_at.elapsed();
                if elapsed >= self.limit.window {
                    window.started_at = Instant::now();
                    window.count = 0;
                }
                if window.count < self.limit.max {
                    window.count += 1;
                    return;
                }
                self.limit.window.saturating_sub(elapsed)
            };
            sleep(wait.max(Duration::from_millis(5))).await;
        }
    }

    /// Returns an unused permit to the current window, so an empty claim does
    /// not count against the limit.
    pub async fn release(&self) {
        let mut window = self.window.lock().await;
        window.count = window.count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_within_window_are_immediate() {
        let limiter = RateLimiter::new(RateLimit {
            max: 3,
            window: Duration::from_secs(60),
        });
        let started = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_released_permit_is_immediately_reusable() {
        let limiter = RateLimiter::new(RateLimit {
            max: 2,
            window: Duration::from_secs(60),
        });
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.release().await;

        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_excess_permit_waits_for_next_window() {
        let limiter = RateLimiter::new(RateLimit {
            max: 2,
            window: Duration::from_millis(150),
        });
        limiter.acquire().await;
        limiter.acquire().await;

        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
