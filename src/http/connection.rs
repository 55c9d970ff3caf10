use std::sync::Arc;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::parser::{ParseError, head_expects_continue, parse_http_request};
use crate::http::request::Request;
use crate::http::response::{Reply, Response};
use crate::http::writer::ResponseWriter;
use crate::proxy::Gatekeeper;

/// Interim response sent when a client waits for permission to send its body.
const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

#[derive(Debug, Error)]
pub enum TakeoverError {
    #[error("Hijacking not supported")]
    Unsupported,
    #[error("Failed to hijack connection: {0}")]
    Io(#[from] std::io::Error),
}

impl TakeoverError {
    /// Message sent in the 500 that replaces a failed takeover.
    pub fn public_message(&self) -> &'static str {
        match self {
            TakeoverError::Unsupported => "Hijacking not supported",
            TakeoverError::Io(_) => "Failed to hijack connection",
        }
    }
}

/// A client connection, generic over the byte stream so tests can drive it
/// with in-memory pipes.
pub struct Connection<S> {
    stream: S,
    peer: String,
    buffer: BytesMut,
    state: ConnectionState,
    gatekeeper: Arc<Gatekeeper>,
    /// 100 Continue already sent for the request being read
    continue_sent: bool,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    TakingOver(&'static [u8], bool), // bool = HTTP/1.x exchange?
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl Into<String>, gatekeeper: Arc<Gatekeeper>) -> Self {
        Self {
            stream,
            peer: peer.into(),
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            gatekeeper,
            continue_sent: false,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    match self.read_request().await {
                        Ok(Some(mut req)) => {
                            req.remote_addr = self.peer.clone();
                            self.state = ConnectionState::Processing(req);
                        }
                        Ok(None) => {
                            self.state = ConnectionState::Closed;
                        }
                        Err(ReadError::Parse(e)) => {
                            tracing::debug!(peer = %self.peer, error = %e, "Rejecting malformed request");
                            let writer = ResponseWriter::new(&closing(Response::bad_request()));
                            self.state = ConnectionState::Writing(writer, false);
                        }
                        Err(ReadError::Io(e)) => return Err(e.into()),
                    }
                }

                ConnectionState::Processing(req) => {
                    let keep_alive = req.keep_alive();
                    let http1 = req.is_http1();

                    self.state = match self.gatekeeper.handle(req).await {
                        Reply::Response(response) => {
                            let response = if keep_alive { response } else { closing(response) };
                            ConnectionState::Writing(ResponseWriter::new(&response), keep_alive)
                        }
                        Reply::Takeover(raw) => ConnectionState::TakingOver(raw, http1),
                    };
                }

                ConnectionState::Writing(writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if *keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::TakingOver(raw, http1) => {
                    let (raw, http1) = (*raw, *http1);
                    if let Err(e) = self.take_over(raw, http1).await {
                        tracing::error!(peer = %self.peer, error = %e, "Connection takeover failed");
                        let response = closing(Response::internal_error(e.public_message()));
                        // The stream may already be broken; nothing more to report if so.
                        let _ = ResponseWriter::new(&response)
                            .write_to_stream(&mut self.stream)
                            .await;
                    }
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Bypass response framing: write `raw` straight onto the socket and
    /// shut the write side down.
    ///
    /// Only HTTP/1.x exchanges can be taken over; anything buffered from
    /// pipelined requests is discarded.
    async fn take_over(&mut self, raw: &[u8], http1: bool) -> Result<(), TakeoverError> {
        if !http1 {
            return Err(TakeoverError::Unsupported);
        }

        self.buffer.clear();
        self.stream.write_all(raw).await?;
        self.stream.flush().await?;
        self.stream.shutdown().await?;

        tracing::debug!(peer = %self.peer, "Connection taken over and closed");
        Ok(())
    }

    pub async fn read_request(&mut self) -> Result<Option<Request>, ReadError> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    // Remove consumed bytes
                    self.buffer.advance(consumed);
                    self.continue_sent = false;
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Head is in but the body is not: let the client send it.
                    if !self.continue_sent && head_expects_continue(&self.buffer) {
                        self.stream.write_all(CONTINUE_RESPONSE).await?;
                        self.stream.flush().await?;
                        self.continue_sent = true;
                    }
                }

                Err(e) => return Err(ReadError::Parse(e)),
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(peer = %self.peer, "Client closed connection mid-request");
                }
                return Ok(None);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("HTTP parse error: {0}")]
    Parse(ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn closing(mut response: Response) -> Response {
    response.headers.set("Connection", "close");
    response
}
