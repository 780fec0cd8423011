// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-client request rate limiting.
//!
//! A fixed-window counter per client key, best-effort and local to this
//! process instance. Stale windows are swept when the map grows past a
//! bound, so an open internet endpoint cannot grow it without limit.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use kontor_config::model::RateLimitConfig;

/// Map size that triggers an eviction sweep.
const MAX_TRACKED_CLIENTS: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window per-key rate limiter.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            hits: DashMap::new(),
        }
    }

    /// Counts one request for `key` and returns whether it is allowed.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let allowed = {
            let mut entry = self.hits.entry(key.to_string()).or_insert(Window {
                started: now,
                count: 0,
            });
            if now.duration_since(entry.started) >= self.window {
                entry.started = now;
                entry.count = 0;
            }
            entry.count += 1;
            entry.count <= self.max_requests
        };
        if self.hits.len() > MAX_TRACKED_CLIENTS {
            self.evict(now);
        }
        allowed
    }

    fn evict(&self, now: Instant) {
        self.hits
            .retain(|_, window| now.duration_since(window.started) < self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window_secs,
        })
    }

    #[test]
    fn allows_up_to_the_window_maximum() {
        let limiter = limiter(3, 60);
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = limiter(1, 0);
        assert!(limiter.check("10.0.0.1"));
        // window_secs = 0 means every check starts a fresh window
        assert!(limiter.check("10.0.0.1"));
    }
}
