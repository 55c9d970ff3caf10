//! Upstream request forwarding
//!
//! This module sends a copy of the inbound request to the configured target
//! over plain HTTP/1.1 and reads the full response back.
//!
//! Only the upstream body is relayed to the caller. The caller always sees
//! a 200 with that body; upstream status and headers are logged and dropped.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::http::chunked::{self, ChunkedError};
use crate::http::headers::Headers;
use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// Default buffer size for reads
const BUFFER_SIZE: usize = 8192;

/// Upper bound on the upstream status line plus headers.
const MAX_RESPONSE_HEAD: usize = 64 * 1024;

/// Hop-by-hop headers that describe the inbound connection only.
const HOP_BY_HOP: &[&str] = &[
    "Connection",
    "Keep-Alive",
    "Proxy-Connection",
    "Transfer-Encoding",
    "TE",
    "Trailer",
    "Upgrade",
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid target URL {0}")]
    InvalidTarget(String),
    #[error("unsupported target scheme {0}")]
    UnsupportedScheme(String),
    #[error("{0}")]
    Transport(#[from] std::io::Error),
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl From<ChunkedError> for ForwardError {
    fn from(e: ChunkedError) -> Self {
        ForwardError::MalformedResponse(e.to_string())
    }
}

impl ForwardError {
    /// Converts the failure into the response the caller receives.
    pub fn to_response(&self) -> Response {
        match self {
            ForwardError::InvalidTarget(_) | ForwardError::UnsupportedScheme(_) => {
                Response::internal_error("Error parsing target URL")
            }
            _ => Response::bad_gateway(&self.to_string()),
        }
    }
}

/// Response read back from the upstream.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Forwards requests to a single upstream base URL.
#[derive(Debug, Clone)]
pub struct Forwarder {
    /// Base URL the request path is appended to, e.g. "http://127.0.0.1:8081"
    target: String,

    /// Bound on the whole upstream exchange. `None` waits indefinitely.
    request_timeout: Option<Duration>,
}

impl Forwarder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            request_timeout: None,
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Forward a request and produce the reply for the original caller.
    ///
    /// Failures never escape: they become a 500 (bad target) or 502 (upstream).
    pub async fn forward(&self, request: &Request) -> Response {
        match self.send(request).await {
            Ok(upstream) => {
                tracing::info!(
                    upstream = %self.target,
                    status = upstream.status,
                    method = %request.method,
                    path = %request.path,
                    bytes = upstream.body.len(),
                    "Request forwarded"
                );
                Response::ok(upstream.body)
            }
            Err(e) => {
                tracing::warn!(
                    upstream = %self.target,
                    error = %e,
                    method = %request.method,
                    path = %request.path,
                    "Failed to forward request"
                );
                e.to_response()
            }
        }
    }

    /// Send `request` upstream and read the complete response.
    pub async fn send(&self, request: &Request) -> Result<UpstreamResponse, ForwardError> {
        let url = self.base_url()?;
        if url.scheme() != "http" {
            return Err(ForwardError::UnsupportedScheme(url.scheme().to_string()));
        }

        let exchange = self.exchange(request, &url);
        match self.request_timeout {
            Some(limit) => timeout(limit, exchange)
                .await
                .map_err(|_| ForwardError::Timeout(limit))?,
            None => exchange.await,
        }
    }

    /// Parse the configured target. Only its scheme, host, port and path
    /// prefix are used.
    pub fn base_url(&self) -> Result<Url, ForwardError> {
        Url::parse(&self.target)
            .map_err(|e| ForwardError::InvalidTarget(format!("{}: {e}", self.target)))
    }

    /// Request-target sent upstream: base path prefix, then the inbound path
    /// and raw query exactly as received. Dot segments and query bytes are
    /// not normalized or re-encoded.
    pub fn request_target(base: &Url, request: &Request) -> String {
        let prefix = base.path();
        let prefix = prefix.strip_suffix('/').unwrap_or(prefix);

        let mut target = String::with_capacity(prefix.len() + request.path.len() + 1);
        target.push_str(prefix);
        if !request.path.starts_with('/') {
            target.push('/');
        }
        target.push_str(&request.path);

        if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }
        target
    }

    async fn exchange(&self, request: &Request, url: &Url) -> Result<UpstreamResponse, ForwardError> {
        let host = url
            .host_str()
            .ok_or_else(|| ForwardError::InvalidTarget(url.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = url.port_or_known_default().unwrap_or(80);

        let mut stream = TcpStream::connect((host, port)).await?;
        tracing::trace!(upstream = %url, "Connected to upstream");

        let request_bytes = self.build_http_request(request, url);
        stream.write_all(&request_bytes).await?;
        stream.flush().await?;

        self.read_http_response(&mut stream, request.method == Method::HEAD).await
    }

    /// Build HTTP request bytes to send upstream
    ///
    /// The inbound headers are copied into a fresh collection; the inbound
    /// request is left untouched.
    pub fn build_http_request(&self, request: &Request, url: &Url) -> Vec<u8> {
        let mut buffer = Vec::new();

        let target = Self::request_target(url, request);
        buffer.extend_from_slice(
            format!("{} {} HTTP/1.1\r\n", request.method, target).as_bytes()
        );

        let mut headers = request.headers.clone();

        for name in HOP_BY_HOP {
            headers.remove(name);
        }

        if let Some(host) = url.host_str() {
            let host_value = match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            headers.set("Host", host_value);
        }

        headers.set("Content-Length", request.body.len().to_string());
        headers.set("Connection", "close");

        for (key, value) in headers.iter() {
            buffer.extend_from_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }

        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&request.body);

        buffer
    }

    /// Read an HTTP response from the upstream
    async fn read_http_response(
        &self,
        stream: &mut TcpStream,
        head_request: bool,
    ) -> Result<UpstreamResponse, ForwardError> {
        let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

        loop {
            if let Some(headers_end) = buffer
                .windows(4)
                .position(|window| window == b"\r\n\r\n")
            {
                let head = buffer.split_to(headers_end + 4);
                let (status, headers) = parse_response_head(&head)?;

                // Interim responses (e.g. 100 Continue) precede the real one.
                if (100..200).contains(&status) && status != 101 {
                    continue;
                }

                let body = if head_request || matches!(status, 101 | 204 | 304) {
                    Vec::new()
                } else {
                    read_response_body(stream, &mut buffer, &headers).await?
                };

                return Ok(UpstreamResponse { status, headers, body });
            }

            if buffer.len() > MAX_RESPONSE_HEAD {
                return Err(ForwardError::MalformedResponse("response headers too large".into()));
            }

            let n = stream.read_buf(&mut buffer).await?;
            if n == 0 {
                return Err(ForwardError::MalformedResponse(
                    "connection closed before complete response received".into(),
                ));
            }
        }
    }
}

/// Parse the status line and headers of an upstream response.
fn parse_response_head(head: &[u8]) -> Result<(u16, Headers), ForwardError> {
    let text = std::str::from_utf8(head)
        .map_err(|_| ForwardError::MalformedResponse("invalid UTF-8 in headers".into()))?;

    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(ForwardError::MalformedResponse(format!("invalid status line: {status_line}")));
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ForwardError::MalformedResponse(format!("invalid status line: {status_line}")))?;

    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.append(key.trim(), value.trim());
        }
    }

    Ok((status, headers))
}

/// Read the response body using chunked framing, Content-Length, or
/// until the upstream closes, in that order of preference.
async fn read_response_body(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
    headers: &Headers,
) -> Result<Vec<u8>, ForwardError> {
    if headers.has_token("Transfer-Encoding", "chunked") {
        loop {
            if let Some((body, _)) = chunked::decode(&buffer[..])? {
                return Ok(body);
            }
            if stream.read_buf(&mut *buffer).await? == 0 {
                return Err(ForwardError::MalformedResponse(
                    "connection closed inside chunked body".into(),
                ));
            }
        }
    }

    let Some(content_length) = headers.get("Content-Length") else {
        // No framing: the body runs until the upstream closes.
        let mut body = buffer.split().to_vec();
        stream.read_to_end(&mut body).await?;
        return Ok(body);
    };

    let content_length: usize = content_length
        .trim()
        .parse()
        .map_err(|_| ForwardError::MalformedResponse(format!("invalid Content-Length {content_length}")))?;

    let mut body = Vec::with_capacity(content_length.min(1 << 20));

    // Use already-buffered bytes first
    let from_buffer = buffer.len().min(content_length);
    body.extend_from_slice(&buffer[..from_buffer]);
    buffer.advance(from_buffer);

    let mut chunk = [0u8; BUFFER_SIZE];
    while body.len() < content_length {
        let to_read = (content_length - body.len()).min(BUFFER_SIZE);
        let n = stream.read(&mut chunk[..to_read]).await?;

        if n == 0 {
            return Err(ForwardError::MalformedResponse(
                "connection closed before complete body received".into(),
            ));
        }

        body.extend_from_slice(&chunk[..n]);
    }

    Ok(body)
}
