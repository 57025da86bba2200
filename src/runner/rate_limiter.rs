//! Global admission rate limiting

use crate::config::admission_period;
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};

/// Caps how fast the dispatcher admits new requests
///
/// Unlike per-task pacing this is a single gate shared by the whole run: one
/// admission per `1 / rps` seconds, with no burst allowance.
pub struct AdmissionLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate_limit: Option<f64>,
}

impl AdmissionLimiter {
    /// Create a limiter; `None` or an unusable rate disables limiting
    ///
    /// `RunConfig::validate` rejects unusable rates before a run gets here.
    pub fn new(rate_limit: Option<f64>) -> Self {
        let limiter = rate_limit
            .and_then(admission_period)
            .and_then(Quota::with_period)
            .map(RateLimiter::direct);

        Self {
            limiter,
            rate_limit,
        }
    }

    /// Create a limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Wait until the next admission is allowed
    pub async fn wait(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Get the configured rate limit (requests per second)
    pub fn rate_limit(&self) -> Option<f64> {
        self.rate_limit
    }
}

impl std::fmt::Debug for AdmissionLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionLimiter")
            .field("rate_limit", &self.rate_limit)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
