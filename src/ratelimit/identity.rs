//! Client identity resolution.
//!
//! Picks the key a request is rate limited under, in order:
//!
//! 1. `CF-Connecting-IP`, set by a fronting CDN
//! 2. `X-Forwarded-For`, first header value taken as-is
//! 3. the transport peer address (`ip:port`)
//!
//! Values are opaque. Nothing is checked against IP address syntax and
//! comma-separated forwarding chains are not split.

use std::fmt;

use crate::http::request::Request;

pub const CF_CONNECTING_IP: &str = "CF-Connecting-IP";
pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";

/// Opaque key partitioning rate-limit state between callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Resolves the identity of the caller behind `request`. Never fails.
pub fn resolve(request: &Request) -> ClientIdentity {
    [CF_CONNECTING_IP, X_FORWARDED_FOR]
        .into_iter()
        .filter_map(|name| request.header(name))
        .find(|value| !value.is_empty())
        .map(ClientIdentity::from)
        .unwrap_or_else(|| ClientIdentity::new(request.remote_addr.as_str()))
}
