//! Ordered middleware chain.
//!
//! Routes are kept in registration order. For each request a [`Dispatcher`]
//! walks that list with an explicit cursor:
//!
//! ```text
//!   cursor ──► route matches? ── no ──► cursor += 1 (implicit next)
//!                   │
//!                  yes
//!                   ▼
//!        handler(req, res, next)
//!                   │
//!     next.proceed() called? ── yes ──► cursor += 1, ready for the next step
//!                   │
//!                   no ──► chain halts
//! ```
//!
//! A cursor past the end of the list means nothing else will run; the
//! connection then answers 404 unless a response was already sent.

pub mod dispatch;
pub mod handler;
pub mod route;

pub use dispatch::{Dispatcher, Step};
pub use handler::{HandlerResult, Middleware, Next};
pub use route::{Route, RouteKind, match_pattern};
