//! Per-host politeness via token buckets.
//!
//! One bucket per host, replenished at a steady rate. Workers await a token
//! before issuing a request, so the host rate holds regardless of how many
//! fetch tasks are in flight.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
    rate_per_sec: f64,
    burst: f64,
}

impl Bucket {
    fn new(rate_per_sec: f64) -> Self {
        let burst = rate_per_sec.max(1.0);
        Self {
            tokens: burst,
            last_refill: Instant::now(),
            rate_per_sec,
            burst,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.burst);
        self.last_refill = now;
    }

    /// Take one token, or return how long to wait for it.
    fn try_take(&mut self) -> Option<Duration> {
        let now = Instant::now();
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - self.tokens;
            Some(Duration::from_secs_f64(deficit / self.rate_per_sec))
        }
    }
}

/// Shared token-bucket map keyed by host.
pub struct HostRateLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
    default_rate: f64,
}

impl HostRateLimiter {
    pub fn new(default_rate_per_sec: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            default_rate: default_rate_per_sec,
        }
    }

    /// Override the rate for one host (robots.txt Crawl-delay).
    pub fn set_host_rate(&self, host: &str, rate_per_sec: f64) {
        let rate = rate_per_sec.max(0.01);
        self.buckets
            .insert(host.to_string(), Mutex::new(Bucket::new(rate)));
    }

    /// Wait until a request against `host` is allowed.
    ///
    /// The sleep happens outside the bucket lock so other hosts proceed
    /// unhindered.
    pub async fn acquire(&self, host: &str) {
        loop {
            let wait = {
                let entry = self
                    .buckets
                    .entry(host.to_string())
                    .or_insert_with(|| Mutex::new(Bucket::new(self.default_rate)));
                let mut bucket = entry.lock();
                bucket.try_take()
            };

            match wait {
                None => return,
                Some(duration) => tokio::time::sleep(duration).await,
            }
        }
    }
}
