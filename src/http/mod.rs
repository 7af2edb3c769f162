//! HTTP protocol implementation.
//!
//! One request-response exchange per connection.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection read loop and dispatch driver
//! - **`parser`**: request-line and header-block parsing
//! - **`headers`**: the case-insensitive header collection
//! - **`request`**: HTTP request representation and path parameters
//! - **`response`**: status codes and the response handlers write to
//! - **`writer`**: serializes response heads and writes bytes to the transport
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌───────────────────────┐
//!        │  AwaitingRequestLine  │ ← Accumulate until the first line break
//!        └──────────┬────────────┘
//!                   │ Request line parsed
//!                   ▼
//!        ┌───────────────────────┐
//!        │    AwaitingHeaders    │ ← Accumulate until a blank line
//!        └──────────┬────────────┘
//!                   │ Header block parsed, dispatch starts
//!                   ▼
//!        ┌───────────────────────┐
//!        │    DispatchingBody    │ ← Body chunks stream in, chain advances
//!        └──────────┬────────────┘
//!                   │ Response sent or input over
//!                   ▼
//!        ┌───────────────────────┐
//!        │         Done          │ ← "end" emitted, transport closed
//!        └───────────────────────┘
//! ```
//!
//! A malformed request line or an oversized head skips straight to `Done`
//! after a 400 or 431.

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
