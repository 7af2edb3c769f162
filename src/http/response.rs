use tracing::warn;

use crate::http::headers::HeaderSet;
use crate::http::writer::serialize_head;

/// An HTTP status code.
///
/// Any three digit code can be carried; the reason phrase comes from a fixed
/// table and is empty for codes the table does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    pub const HEADERS_TOO_LARGE: StatusCode = StatusCode(431);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use waypoint::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use waypoint::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    /// assert_eq!(StatusCode(299).reason_phrase(), "");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            207 => "Multi-Status",
            208 => "Already Reported",
            226 => "IM Used",

            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",

            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Payload Too Large",
            414 => "URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Range Not Satisfiable",
            417 => "Expectation Failed",
            418 => "I'm a teapot",
            421 => "Misdirected Request",
            422 => "Unprocessable Entity",
            423 => "Locked",
            424 => "Failed Dependency",
            425 => "Too Early",
            426 => "Upgrade Required",
            428 => "Precondition Required",
            429 => "Too Many Requests",
            431 => "Request Header Fields Too Large",
            451 => "Unavailable For Legal Reasons",

            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            506 => "Variant Also Negotiates",
            507 => "Insufficient Storage",
            508 => "Loop Detected",
            510 => "Not Extended",
            511 => "Network Authentication Required",

            _ => "",
        }
    }
}

/// The response side of one connection.
///
/// Handlers set a status and headers, then call one of the `send` family.
/// Sending serializes the status line, headers and body into a pending
/// buffer which the connection flushes to the transport after the handler
/// returns. Once the declared `Content-Length` worth of body has been
/// written the response counts as sent and further writes are dropped.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderSet,
    pending: Vec<u8>,
    head_written: bool,
    body_written: usize,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates an unsent response with status 404.
    pub fn new() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: HeaderSet::new(),
            pending: Vec::new(),
            head_written: false,
            body_written: 0,
            sent: false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Sets the status code used by the next `end`.
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status = StatusCode(code);
        self
    }

    /// Adds or replaces a header. Names are stored lower-cased.
    pub fn header(&mut self, name: &str, value: impl ToString) -> &mut Self {
        if self.head_written {
            warn!(header = name, "header set after the response head was written");
            return self;
        }
        self.headers.set(name, value.to_string());
        self
    }

    /// Adds every header from `headers`, replacing existing values.
    pub fn set<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        for (name, value) in headers {
            self.header(name.as_ref(), value);
        }
        self
    }

    /// Sends `body` with status `code`.
    ///
    /// `content-type` defaults to `text/plain` and `content-length` to the
    /// byte length of `body`. If a larger `content-length` was declared the
    /// head is written once and later sends append body bytes until the
    /// declared length is reached. Bytes past that length are dropped.
    pub fn send_status(&mut self, code: u16, body: impl AsRef<[u8]>) -> &mut Self {
        let body = body.as_ref();

        if self.sent {
            warn!(status = code, bytes = body.len(), "write after response was sent");
            return self;
        }

        if !self.head_written {
            self.status = StatusCode(code);

            if !self.headers.contains("content-type") {
                self.headers.set("content-type", "text/plain");
            }
            if !self.headers.contains("content-length") {
                self.headers.set("content-length", body.len().to_string());
            }

            self.pending
                .extend_from_slice(&serialize_head(self.status, &self.headers));
            self.head_written = true;
        }

        let room = self.declared_length().saturating_sub(self.body_written);
        let taken = body.len().min(room);
        if taken < body.len() {
            warn!(
                status = code,
                dropped = body.len() - taken,
                "body exceeds the declared content-length"
            );
        }

        self.pending.extend_from_slice(&body[..taken]);
        self.body_written += taken;

        if self.body_written >= self.declared_length() {
            self.sent = true;
        }

        self
    }

    /// Sends `body` with status 200.
    pub fn send(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        self.send_status(StatusCode::OK.as_u16(), body)
    }

    /// Sends `body` with the previously set status (404 unless changed).
    pub fn end(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        let code = self.status.as_u16();
        self.send_status(code, body)
    }

    /// True once the full declared body has been written.
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// True once the status line and headers have been written.
    pub fn is_head_written(&self) -> bool {
        self.head_written
    }

    /// Takes the serialized bytes that have not been flushed yet.
    pub fn drain_pending(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    /// Closes the response without writing more body. Used when a handler
    /// fails after the head has already gone out.
    pub(crate) fn abandon(&mut self) {
        self.sent = true;
    }

    fn declared_length(&self) -> usize {
        self.headers.content_length().unwrap_or(0)
    }
}
