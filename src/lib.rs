//! Waypoint - Express-style HTTP/1.1 server engine
//!
//! Ordered middleware and routing on top of a minimal request parser and
//! response writer, served over any byte-stream transport.

pub mod app;
pub mod config;
pub mod events;
pub mod http;
pub mod router;
pub mod server;
pub mod transport;

pub use app::{App, AppHandle};
pub use config::Config;
pub use http::request::{Method, Request};
pub use http::response::{Response, StatusCode};
pub use router::{HandlerResult, Next};
