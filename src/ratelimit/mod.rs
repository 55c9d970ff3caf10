//! Per-client rate limiting.
//!
//! Every client identity gets its own token bucket; buckets are independent,
//! so contention on one client never blocks another once its limiter exists.

pub mod bucket;
pub mod identity;
pub mod registry;

pub use bucket::RateLimiter;
pub use identity::{ClientIdentity, resolve};
pub use registry::LimiterRegistry;
