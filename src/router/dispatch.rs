use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::router::handler::Next;
use crate::router::route::Route;

/// Outcome of one [`Dispatcher::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A handler ran
    Invoked,
    /// The route under the cursor did not match; the cursor moved on
    Skipped,
    /// The route matched but waits for the complete body
    Deferred,
    /// The handler failed; a 500 was produced and the chain halted
    Failed,
    /// No step was possible: the cursor is past the end, the chain halted,
    /// or the response was already sent
    Idle,
}

/// Cursor over the route list for one request.
#[derive(Debug)]
pub struct Dispatcher {
    cursor: usize,
    ready: bool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            ready: true,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// False once a handler returned without calling its continuation.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_exhausted(&self, routes: &[Route]) -> bool {
        self.cursor >= routes.len()
    }

    /// Whether [`Dispatcher::step`] could do anything right now.
    pub fn can_step(&self, routes: &[Route], res: &Response) -> bool {
        self.ready && !res.is_sent() && !self.is_exhausted(routes)
    }

    /// Stops the chain; later steps are no-ops.
    pub fn halt(&mut self) {
        self.ready = false;
    }

    /// Tries the route under the cursor.
    ///
    /// `body_ready` tells whether routes that need the whole body may run.
    /// Errors and panics from the handler are caught here and turned into
    /// a 500 response.
    pub fn step(
        &mut self,
        routes: &[Route],
        req: &mut Request,
        res: &mut Response,
        body_ready: bool,
    ) -> Step {
        if !self.ready || res.is_sent() {
            return Step::Idle;
        }
        let Some(route) = routes.get(self.cursor) else {
            return Step::Idle;
        };

        let Some(params) = route.matches(&req.method, req.path_only()) else {
            self.cursor += 1;
            return Step::Skipped;
        };

        if route.needs_body() && !body_ready {
            debug!(pattern = route.pattern(), "deferring route until body is complete");
            return Step::Deferred;
        }

        req.params.extend(params);
        self.ready = false;

        let mut next = Next::new();
        let handler = route.handler();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.call(req, res, &mut next)));

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(payload) => Some(panic_message(&*payload)),
        };

        if let Some(reason) = failure {
            error!(
                method = %req.method,
                path = %req.path,
                pattern = route.pattern(),
                error = %reason,
                "handler failed"
            );
            fail(res);
            return Step::Failed;
        }

        if next.invoked() {
            self.cursor += 1;
            self.ready = true;
        }

        Step::Invoked
    }
}

/// Answers 500 unless something already went out on the wire.
pub(crate) fn fail(res: &mut Response) {
    if res.is_sent() {
        return;
    }
    if res.is_head_written() {
        res.abandon();
        return;
    }

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    res.send_status(status.as_u16(), status.reason_phrase());
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
