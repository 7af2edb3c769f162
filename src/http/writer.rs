use crate::http::headers::HeaderSet;
use crate::http::response::StatusCode;
use crate::transport::Transport;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes the status line and headers, up to and including the blank
/// line that separates them from the body.
///
/// `Connection`, `Content-Type` and `Content-Length` come first; any other
/// headers follow in insertion order.
pub fn serialize_head(status: StatusCode, headers: &HeaderSet) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // The connection is closed after one exchange all the same
    buf.extend_from_slice(b"Connection: keep-alive\r\n");
    push_header(&mut buf, "Content-Type", headers.get("content-type").unwrap_or(""));
    push_header(&mut buf, "Content-Length", headers.get("content-length").unwrap_or("0"));

    for (k, v) in headers.iter() {
        if matches!(k, "content-type" | "content-length" | "connection") {
            continue;
        }
        push_header(&mut buf, k, v);
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub async fn write_to<T: Transport>(&mut self, transport: &mut T) -> anyhow::Result<()> {
        while self.written < self.buffer.len() {
            let n = transport.send(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        Ok(())
    }
}
