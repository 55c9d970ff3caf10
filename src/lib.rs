//! Tollgate - per-client rate limiting forward proxy
//!
//! Core library for HTTP handling, client rate limiting and upstream forwarding.

pub mod config;
pub mod http;
pub mod proxy;
pub mod ratelimit;
pub mod server;
