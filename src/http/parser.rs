use thiserror::Error;

use crate::http::chunked::{self, ChunkedError};
use crate::http::headers::Headers;
use crate::http::request::{Method, Request};

/// Upper bound on the request line plus headers.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequest,
    #[error("invalid method token")]
    InvalidMethod,
    #[error("unsupported protocol version")]
    InvalidVersion,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("request head too large")]
    HeadTooLarge,
    #[error(transparent)]
    Chunked(#[from] ChunkedError),
    #[error("incomplete request")]
    Incomplete,
}

/// Parses one request from the front of `buf`.
///
/// On success returns the request and the number of bytes it occupied, so
/// pipelined requests can be parsed from the remainder.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {

    // Look for header/body separator
    let Some(headers_end) = find_headers_end(buf) else {
        if buf.len() > MAX_HEAD_SIZE {
            return Err(ParseError::HeadTooLarge);
        }
        return Err(ParseError::Incomplete);
    };
    let header_bytes = &buf[..headers_end];
    let body_bytes = &buf[headers_end + 4..];

    let headers_str = std::str::from_utf8(header_bytes)
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;
    if parts.next().is_some() {
        return Err(ParseError::InvalidRequest);
    }
    if !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidVersion);
    }

    let method = Method::parse(method_str).ok_or(ParseError::InvalidMethod)?;
    let (path, query) = split_target(target);

    // Headers
    let mut headers = Headers::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::InvalidHeader);
        }

        headers.append(key, value.trim());
    }

    // Body
    let (body, body_len) = if headers.has_token("Transfer-Encoding", "chunked") {
        chunked::decode(body_bytes)?.ok_or(ParseError::Incomplete)?
    } else {
        let content_length = headers
            .get("Content-Length")
            .map(|v| v.trim().parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
            .transpose()?
            .unwrap_or(0);

        if body_bytes.len() < content_length {
            return Err(ParseError::Incomplete);
        }

        (body_bytes[..content_length].to_vec(), content_length)
    };

    let request = Request {
        method,
        path,
        query,
        version: version.to_string(),
        headers,
        body,
        remote_addr: String::new(),
    };

    let total_consumed = headers_end + 4 + body_len;
    Ok((request, total_consumed))

}

/// True once a complete HTTP/1.1 request head carrying
/// `Expect: 100-continue` sits at the front of `buf`.
pub fn head_expects_continue(buf: &[u8]) -> bool {
    let Some(end) = find_headers_end(buf) else {
        return false;
    };
    let Ok(head) = std::str::from_utf8(&buf[..end]) else {
        return false;
    };

    let mut lines = head.split("\r\n");
    let http11 = lines
        .next()
        .is_some_and(|line| line.split_whitespace().nth(2) == Some("HTTP/1.1"));

    http11
        && lines
            .filter_map(|line| line.split_once(':'))
            .any(|(k, v)| {
                k.trim().eq_ignore_ascii_case("Expect")
                    && v.trim().eq_ignore_ascii_case("100-continue")
            })
}

/// Splits a request target into raw path and raw query.
///
/// Absolute-form targets (`http://host/path?q`) have their scheme and
/// authority stripped, leaving the origin-form parts.
fn split_target(target: &str) -> (String, Option<String>) {
    let origin = match target.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") => {
            match rest.find(['/', '?']) {
                Some(idx) => &rest[idx..],
                None => "",
            }
        }
        _ => target,
    };

    let (path, query) = match origin.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (origin, None),
    };

    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), query)
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}
