use std::io;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::app::AppHandle;
use crate::events::EventData;
use crate::http::headers::RequestLine;
use crate::http::parser::{
    ParseError, find_headers_end, find_line_end, parse_header_block, parse_request_line,
};
use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::router::dispatch::{fail, panic_message};
use crate::router::{Dispatcher, Route, Step};
use crate::transport::Transport;

const NOT_FOUND_BODY: &str = "Page Not Found!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRequestLine,
    AwaitingHeaders,
    DispatchingBody,
    Done,
}

/// Serves exactly one request on one transport.
///
/// Reads arrive in chunks of at most `chunk_size` bytes. The request line
/// and header block are located in the accumulated bytes, so a request
/// split across any number of reads parses the same as one read. The first
/// route runs as soon as the headers are in; each later read advances the
/// chain by at most one route, and whatever is left runs once reading
/// stops.
pub struct Connection<T: Transport> {
    transport: T,
    routes: Arc<[Route]>,
    app: Arc<AppHandle>,
    peer: Option<SocketAddr>,
    state: ConnectionState,
    /// Everything received, minus whitespace before the request line
    buffer: BytesMut,
    request_line: Option<(Method, RequestLine)>,
    headers_start: usize,
    request: Option<Request>,
    response: Response,
    dispatcher: Dispatcher,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, routes: Arc<[Route]>, app: Arc<AppHandle>) -> Self {
        Self {
            transport,
            routes,
            app,
            peer: None,
            state: ConnectionState::AwaitingRequestLine,
            buffer: BytesMut::with_capacity(1024),
            request_line: None,
            headers_start: 0,
            request: None,
            response: Response::new(),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Runs the exchange to completion and closes the transport.
    ///
    /// Errors are transport failures while writing; they only ever end this
    /// connection.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let result = self.serve().await;
        self.state = ConnectionState::Done;

        if let Err(e) = self.transport.close().await {
            debug!(peer = ?self.peer, error = %e, "close failed");
        }

        if let Some(req) = &self.request {
            info!(
                peer = ?self.peer,
                method = %req.method,
                path = %req.path,
                status = self.response.status_code().as_u16(),
                "request served"
            );
        }

        result
    }

    async fn serve(&mut self) -> anyhow::Result<()> {
        let mut chunk = vec![0u8; self.app.config().chunk_size.max(1)];

        loop {
            let n = match self.receive(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(peer = ?self.peer, error = %e, "read ended");
                    break;
                }
            };

            let data = if self.buffer.is_empty() {
                chunk[..n].trim_ascii_start()
            } else {
                &chunk[..n]
            };
            if data.is_empty() {
                continue;
            }

            if let Err(e) = self.ingest(data) {
                return self.reject(e).await;
            }

            if self.request.is_some() {
                self.advance(false).await?;
                self.emit("data", EventData::chunk(Bytes::copy_from_slice(data)));
                self.flush().await?;
            }

            if self.response.is_sent() || self.request.as_ref().is_some_and(Request::is_body_complete) {
                break;
            }
        }

        if self.request.is_none() {
            if !self.buffer.is_empty() {
                return self.reject(ParseError::Incomplete).await;
            }
            return Ok(());
        }

        // Reading is over, so routes waiting on the body run with what arrived
        while self.dispatcher.can_step(&self.routes, &self.response) {
            self.advance(true).await?;
        }

        if !self.response.is_sent() {
            if self.response.is_head_written() {
                // Part of a body went out; nothing more fits its framing
                debug!(peer = ?self.peer, "chain ended with a partial body");
                self.response.abandon();
            } else {
                self.response.status(StatusCode::NOT_FOUND.as_u16()).end(NOT_FOUND_BODY);
                self.flush().await?;
            }
        }

        let everything = self.buffer.clone().freeze();
        self.emit("end", EventData::chunk(everything));
        self.flush().await
    }

    async fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.app.config().read_timeout() {
            Some(limit) => timeout(limit, self.transport.receive(buf))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timed out"))?,
            None => self.transport.receive(buf).await,
        }
    }

    /// Adds a chunk to the accumulated bytes and moves the parse state forward.
    fn ingest(&mut self, data: &[u8]) -> Result<(), ParseError> {
        self.buffer.extend_from_slice(data);

        if let Some(req) = self.request.as_mut() {
            req.append_body(data);
            return Ok(());
        }

        if self.state == ConnectionState::AwaitingRequestLine {
            if let Some((end, len)) = find_line_end(&self.buffer) {
                let text = std::str::from_utf8(&self.buffer[..end])
                    .map_err(|_| ParseError::InvalidEncoding)?;
                let line = parse_request_line(text)?;
                let method = Method::parse(&line.method);

                self.request_line = Some((method, line));
                self.headers_start = end + len;
                self.state = ConnectionState::AwaitingHeaders;
            }
        }

        if self.state == ConnectionState::AwaitingHeaders {
            if let Some((end, len)) = find_headers_end(&self.buffer) {
                let block = if end > self.headers_start {
                    &self.buffer[self.headers_start..end]
                } else {
                    &[][..]
                };
                let text = std::str::from_utf8(block).map_err(|_| ParseError::InvalidEncoding)?;
                let mut headers = parse_header_block(text);

                let Some((method, line)) = self.request_line.take() else {
                    return Err(ParseError::InvalidRequestLine);
                };
                headers.set_request_line(line);

                let mut request = Request::from_head(method, headers, self.app.clone());
                request.append_body(&self.buffer[end + len..]);

                debug!(
                    peer = ?self.peer,
                    method = %request.method,
                    path = %request.path,
                    "request head parsed"
                );

                self.request = Some(request);
                self.state = ConnectionState::DispatchingBody;
                return Ok(());
            }
        }

        if self.buffer.len() > self.app.config().max_header_bytes {
            return Err(ParseError::HeadersTooLarge);
        }

        Ok(())
    }

    /// Runs one dispatch step and writes out whatever it produced.
    async fn advance(&mut self, force: bool) -> anyhow::Result<Step> {
        let Some(req) = self.request.as_mut() else {
            return Ok(Step::Idle);
        };

        let body_ready = force || req.is_body_complete();
        let step = self
            .dispatcher
            .step(&self.routes, req, &mut self.response, body_ready);

        self.flush().await?;
        Ok(step)
    }

    /// Emits a request event. A panicking subscriber is treated like a
    /// failed handler.
    fn emit(&mut self, event: &str, data: EventData) {
        let Some(req) = self.request.as_mut() else {
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| req.events().emit(event, &data)));

        if let Err(payload) = outcome {
            error!(
                peer = ?self.peer,
                name = event,
                error = %panic_message(&*payload),
                "event subscriber panicked"
            );
            self.dispatcher.halt();
            fail(&mut self.response);
        }
    }

    async fn reject(&mut self, err: ParseError) -> anyhow::Result<()> {
        warn!(peer = ?self.peer, error = %err, "rejecting malformed request");

        let status = err.status();
        self.response
            .send_status(status.as_u16(), status.reason_phrase());
        self.flush().await
    }

    async fn flush(&mut self) -> anyhow::Result<()> {
        let pending = self.response.drain_pending();
        if pending.is_empty() {
            return Ok(());
        }

        ResponseWriter::new(pending)
            .write_to(&mut self.transport)
            .await
    }
}
