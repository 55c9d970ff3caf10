//! HTTP/1.x protocol implementation.
//!
//! This module implements the server side of the proxy: parsing requests off
//! a byte stream, dispatching them, and writing replies back.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection state machine
//! - **`parser`**: parses requests from byte buffers
//! - **`chunked`**: chunked transfer-coding decoder (requests and upstream responses)
//! - **`headers`**: ordered, case-insensitive header multimap
//! - **`request`**: request representation
//! - **`response`**: responses and the [`Reply`](response::Reply) capability
//! - **`writer`**: serializes and writes responses
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Admission check, forward upstream
//!        └──────┬───────────┘
//!      Response │          │ Takeover
//!               ▼          ▼
//!        ┌────────────┐  ┌────────────┐
//!        │  Writing   │  │ TakingOver │ ← raw bytes, then close
//!        └─────┬──────┘  └─────┬──────┘
//!              ├─ Keep-Alive → Reading
//!              └─ Close ───────┴──→ Closed
//! ```

pub mod chunked;
pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
