//! Admission control in front of the forwarder.
//!
//! Every request is charged against its client's token bucket. Admitted
//! requests are forwarded; denied ones do not get a 429. Instead the
//! connection is taken over and [`DENIED_RESPONSE`] is written raw before
//! the socket is closed.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::http::request::Request;
use crate::http::response::Reply;
use crate::proxy::upstream::Forwarder;
use crate::ratelimit::{self, LimiterRegistry};

/// Bytes written on a taken-over connection when a client is over its limit.
pub const DENIED_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n";

/// Outcome of the admission check for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Denied,
}

/// Rate-limits requests by client identity and forwards the admitted ones.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    registry: Arc<LimiterRegistry>,
    forwarder: Forwarder,
}

impl Gatekeeper {
    pub fn new(registry: Arc<LimiterRegistry>, forwarder: Forwarder) -> Self {
        Self { registry, forwarder }
    }

    /// Builds a gatekeeper with a fresh registry from the loaded configuration.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            Arc::new(LimiterRegistry::new(cfg.rate, cfg.burst)),
            Forwarder::new(cfg.target_url.clone()),
        )
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }

    /// Charges the request's client one token.
    pub fn admit(&self, request: &Request) -> Admission {
        let client = ratelimit::resolve(request);
        let limiter = self.registry.get_or_create(&client);

        if limiter.allow() {
            debug!(client = %client, path = %request.path, "Request admitted");
            Admission::Admitted
        } else {
            warn!(client = %client, path = %request.path, "Rate limit exceeded, taking over connection");
            Admission::Denied
        }
    }

    pub async fn handle(&self, request: &Request) -> Reply {
        match self.admit(request) {
            Admission::Admitted => self.forwarder.forward(request).await.into(),
            Admission::Denied => Reply::Takeover(DENIED_RESPONSE),
        }
    }
}
