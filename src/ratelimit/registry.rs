//! Per-client limiter registry.
//!
//! Maps a [`ClientIdentity`] to its own [`RateLimiter`]. Limiters are created
//! lazily the first time a client is seen and are never removed, so memory
//! grows with the number of distinct identities observed.
//!
//! Lookups take the shared side of an `RwLock`; only a miss takes the
//! exclusive side, and it checks again before inserting so that concurrent
//! first requests from one client end up sharing a single limiter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::ratelimit::bucket::RateLimiter;
use crate::ratelimit::identity::ClientIdentity;

#[derive(Debug)]
pub struct LimiterRegistry {
    limiters: RwLock<HashMap<ClientIdentity, Arc<RateLimiter>>>,
    rate: f64,
    burst: u32,
}

impl LimiterRegistry {
    /// Creates an empty registry whose limiters all use `rate` and `burst`.
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            rate,
            burst,
        }
    }

    /// Returns the limiter for `identity`, creating it on first sight.
    pub fn get_or_create(&self, identity: &ClientIdentity) -> Arc<RateLimiter> {
        {
            let limiters = self.limiters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(limiter) = limiters.get(identity) {
                return Arc::clone(limiter);
            }
        }

        let mut limiters = self.limiters.write().unwrap_or_else(|e| e.into_inner());
        // Another task may have inserted between the two locks.
        let limiter = limiters
            .entry(identity.clone())
            .or_insert_with(|| {
                debug!(client = %identity, "Creating rate limiter");
                Arc::new(RateLimiter::new(self.rate, self.burst))
            });
        Arc::clone(limiter)
    }

    /// Number of identities tracked.
    pub fn len(&self) -> usize {
        self.limiters.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}
