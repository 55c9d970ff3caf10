//! Proxy functionality
//!
//! This module implements admission control and request forwarding to the
//! single configured upstream.

pub mod admission;
pub mod upstream;

pub use admission::{Admission, DENIED_RESPONSE, Gatekeeper};
pub use upstream::{ForwardError, Forwarder, UpstreamResponse};
