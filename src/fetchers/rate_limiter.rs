//! Per-host request spacing with jitter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use log::debug;
use tokio::time::{sleep, Instant};

type RandomSource = Box<dyn Fn() -> f64 + Send + Sync>;

/// Per-host rate limiter to avoid hammering recipe sites.
///
/// Every call to [`schedule`](Self::schedule) pushes the host's next allowed
/// time to `now + min_delay + jitter`, including the first call for a host.
/// State is process-local; concurrent processes do not see each other.
pub struct DomainRateLimiter {
    min_delay: Duration,
    jitter: Duration,
    random: RandomSource,
    next_allowed: Mutex<HashMap<String, Instant>>,
}

impl DomainRateLimiter {
    pub fn new(min_delay: Duration, jitter: Duration) -> Self {
        Self {
            min_delay,
            jitter,
            random: Box::new(rand::random::<f64>),
            next_allowed: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the `[0, 1)` source used to draw jitter.
    pub fn with_random(mut self, random: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.random = Box::new(random);
        self
    }

    /// Wait until `host` may be contacted again, then reserve the next slot.
    pub async fn schedule(&self, host: &str) {
        let wait = {
            let next_allowed = self.lock();
            next_allowed
                .get(host)
                .map(|at| at.saturating_duration_since(Instant::now()))
                .unwrap_or_default()
        };

        if !wait.is_zero() {
            debug!("Rate limiting {}: waiting {}ms", host, wait.as_millis());
            sleep(wait).await;
        }

        let jitter_ms = self.jitter.as_millis() as f64;
        let jitter = if jitter_ms > 0.0 {
            Duration::from_millis(((self.random)() * jitter_ms).floor() as u64)
        } else {
            Duration::ZERO
        };

        self.lock()
            .insert(host.to_string(), Instant::now() + self.min_delay + jitter);
    }

    /// Number of hosts with a reserved slot.
    pub fn tracked_hosts(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        // The map holds plain timestamps, so a poisoned guard is still usable.
        self.next_allowed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DomainRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500), Duration::from_millis(200))
    }
}
