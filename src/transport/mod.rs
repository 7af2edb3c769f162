//! Byte-stream transport contract.
//!
//! The engine never touches sockets directly. A [`Transport`] is one
//! accepted connection; an [`Acceptor`] hands out new ones. The TCP
//! implementation lives in [`tcp`]; [`memory`] replays scripted reads and
//! captures writes for tests.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

pub mod memory;
pub mod tcp;

pub use memory::{MemoryHandle, MemoryTransport};
pub use tcp::{TcpAcceptor, TcpTransport};

pub trait Transport: Send + 'static {
    /// Reads at most `buf.len()` bytes. `Ok(0)` means the peer closed.
    fn receive(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Writes some prefix of `bytes`, returning how many were written.
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;

    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

pub trait Acceptor: Send + 'static {
    type Conn: Transport;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Waits for the next connection.
    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Conn, SocketAddr)>> + Send;
}
