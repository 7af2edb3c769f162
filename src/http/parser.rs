use std::fmt;

use crate::http::headers::{HeaderSet, RequestLine};
use crate::http::response::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line did not have exactly three tokens
    InvalidRequestLine,
    /// The request head is not valid UTF-8
    InvalidEncoding,
    /// The header block did not terminate within the configured limit
    HeadersTooLarge,
    /// The peer stopped sending before the header block was complete
    Incomplete,
}

impl ParseError {
    /// The status code sent back to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::HeadersTooLarge => StatusCode::HEADERS_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidRequestLine => write!(f, "malformed request line"),
            ParseError::InvalidEncoding => write!(f, "request head is not valid UTF-8"),
            ParseError::HeadersTooLarge => write!(f, "request header block too large"),
            ParseError::Incomplete => write!(f, "connection closed before headers were complete"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses `METHOD SP PATH SP PROTOCOL`, ignoring a trailing line terminator.
pub fn parse_request_line(text: &str) -> Result<RequestLine, ParseError> {
    let line = first_line(text);

    let tokens: Vec<&str> = line
        .split(' ')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let [method, path, protocol] = tokens.as_slice() else {
        return Err(ParseError::InvalidRequestLine);
    };

    Ok(RequestLine {
        method: method.to_string(),
        path: path.to_string(),
        protocol: protocol.to_string(),
    })
}

/// Parses a block of `Name: Value` lines.
///
/// Each line is split on its first colon; later colons stay in the value.
/// Names are lower-cased. Blank lines are skipped and a line without any
/// colon is kept as a header with an empty value.
pub fn parse_header_block(text: &str) -> HeaderSet {
    let mut headers = HeaderSet::with_raw(text);

    for line in text.lines() {
        insert_header_line(&mut headers, line);
    }

    headers
}

/// Parses a single header line. Anything after the first line break is ignored.
pub fn parse_header_line(text: &str) -> HeaderSet {
    let line = first_line(text);
    let mut headers = HeaderSet::with_raw(line);
    insert_header_line(&mut headers, line);
    headers
}

fn insert_header_line(headers: &mut HeaderSet, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let (key, value) = line.split_once(':').unwrap_or((line, ""));
    headers.set(key, value.trim());
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Locates the first line terminator. Returns its offset and length
/// (2 for CRLF, 1 for a bare LF).
pub fn find_line_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.iter().position(|&b| b == b'\n')?;
    if lf > 0 && buf[lf - 1] == b'\r' {
        Some((lf - 1, 2))
    } else {
        Some((lf, 1))
    }
}

/// Locates the blank line ending the header block, accepting either
/// `\r\n\r\n` or `\n\n`. Returns its offset and length.
pub fn find_headers_end(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n");
    let lf = buf.windows(2).position(|w| w == b"\n\n");

    match (crlf, lf) {
        (Some(c), Some(l)) if l < c => Some((l, 2)),
        (Some(c), _) => Some((c, 4)),
        (None, Some(l)) => Some((l, 2)),
        (None, None) => None,
    }
}
