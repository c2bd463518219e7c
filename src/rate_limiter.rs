//! C1: shapes outbound request rate and applies exponential backoff on
//! transient errors. A single shared budget; safe under concurrent callers.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ScraperConfig;

/// Computes the backoff delay for a given retry attempt (0-indexed), without
/// performing any I/O or sleeping. Kept separate from `RateLimiter::backoff`
/// so the timing math is unit-testable without a runtime.
pub fn backoff_delay(base_delay_s: f64, max_delay_s: f64, attempt: u32) -> Duration {
    let scaled = base_delay_s * 2f64.powi(attempt as i32);
    Duration::from_secs_f64(scaled.min(max_delay_s).max(0.0))
}

pub struct RateLimiter {
    enabled: bool,
    min_interval: Duration,
    base_delay_s: f64,
    max_delay_s: f64,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &ScraperConfig, enabled: bool) -> Self {
        let requests_per_second = config.rate_limit.max(f64::MIN_POSITIVE);
        Self {
            enabled,
            min_interval: Duration::from_secs_f64(1.0 / requests_per_second),
            base_delay_s: config.base_delay_s,
            max_delay_s: config.max_delay_s,
            last_request: Mutex::new(None),
        }
    }

    /// Blocks until at least `1/requests_per_second` has elapsed since the
    /// previous successful `wait()`.
    pub async fn wait(&self) {
        if !self.enabled {
            return;
        }
        let mut guard = self.last_request.lock().await;
        let now = Instant::now();
        if let Some(prev) = *guard {
            let elapsed = now.saturating_duration_since(prev);
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }

    /// Blocks for `min(base_delay * 2^attempt, max_delay)`. Resets the
    /// "previous successful wait" timestamp so the next `wait()` is not
    /// doubly penalized.
    pub async fn backoff(&self, attempt: u32) {
        let delay = backoff_delay(self.base_delay_s, self.max_delay_s, attempt);
        if self.enabled {
            tokio::time::sleep(delay).await;
        }
        let mut guard = self.last_request.lock().await;
        *guard = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_until_capped() {
        assert_eq!(backoff_delay(5.0, 300.0, 0), Duration::from_secs_f64(5.0));
        assert_eq!(backoff_delay(5.0, 300.0, 1), Duration::from_secs_f64(10.0));
        assert_eq!(backoff_delay(5.0, 300.0, 2), Duration::from_secs_f64(20.0));
        // S6: three 429s then success => 5s, 10s, 20s.
        assert_eq!(backoff_delay(5.0, 300.0, 10), Duration::from_secs_f64(300.0));
    }

    #[tokio::test]
    async fn disabled_limiter_never_sleeps() {
        let config = ScraperConfig {
            rate_limit: 0.001,
            ..Default::default()
        };
        let limiter = RateLimiter::new(&config, false);
        let start = std::time::Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.backoff(5).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn enabled_limiter_spaces_requests() {
        let config = ScraperConfig {
            rate_limit: 20.0, // 50ms between requests
            ..Default::default()
        };
        let limiter = RateLimiter::new(&config, true);
        let start = std::time::Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(45));
    }
}
