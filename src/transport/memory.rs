use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::transport::Transport;

/// A connection whose reads come from a script and whose writes are kept.
///
/// Each scripted chunk is delivered by one `receive` call (split further if
/// the caller's buffer is smaller). Once the script runs out the transport
/// reports a closed peer.
pub struct MemoryTransport {
    reads: VecDeque<Vec<u8>>,
    fail_after_script: bool,
    output: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

/// Inspects what a [`MemoryTransport`] was sent after it has been moved away.
#[derive(Clone)]
pub struct MemoryHandle {
    output: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new<I, C>(chunks: I) -> (Self, MemoryHandle)
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let output = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let transport = Self {
            reads: chunks.into_iter().map(Into::into).collect(),
            fail_after_script: false,
            output: output.clone(),
            closed: closed.clone(),
        };

        (transport, MemoryHandle { output, closed })
    }

    /// Splits `bytes` into reads of `chunk` bytes each.
    pub fn chunked(bytes: &[u8], chunk: usize) -> (Self, MemoryHandle) {
        Self::new(bytes.chunks(chunk.max(1)).map(<[u8]>::to_vec))
    }

    /// Makes the read after the script a connection error instead of a close.
    pub fn fail_after_script(mut self) -> Self {
        self.fail_after_script = true;
        self
    }
}

impl Transport for MemoryTransport {
    async fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(mut chunk) = self.reads.pop_front() else {
            if self.fail_after_script {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "scripted failure"));
            }
            return Ok(0);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);

        if n < chunk.len() {
            self.reads.push_front(chunk.split_off(n));
        }

        Ok(n)
    }

    async fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed"));
        }

        let mut output = self
            .output
            .lock()
            .map_err(|_| io::Error::other("output buffer poisoned"))?;
        output.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl MemoryHandle {
    pub fn output(&self) -> Vec<u8> {
        self.output.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
