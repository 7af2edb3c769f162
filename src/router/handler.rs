use std::sync::Arc;

use crate::http::request::Request;
use crate::http::response::Response;

/// What every handler returns. An `Err` becomes a 500 response.
pub type HandlerResult = anyhow::Result<()>;

/// Continuation handed to a middleware.
///
/// Calling [`Next::proceed`] lets the chain move on to the next route once
/// the middleware returns; not calling it ends the chain.
#[derive(Debug, Default)]
pub struct Next {
    invoked: bool,
}

impl Next {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proceed(&mut self) {
        self.invoked = true;
    }

    pub fn invoked(&self) -> bool {
        self.invoked
    }
}

/// A step in the chain: sees the request and response and decides whether
/// the chain continues.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: &mut Request, res: &mut Response, next: &mut Next) -> HandlerResult;
}

impl<F> Middleware for F
where
    F: Fn(&mut Request, &mut Response, &mut Next) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, req: &mut Request, res: &mut Response, next: &mut Next) -> HandlerResult {
        self(req, res, next)
    }
}

/// Adapts a `(req, res)` handler: the chain continues on its own when the
/// handler returns without having sent a response.
pub(crate) struct Terminal<F>(pub(crate) F);

impl<F> Middleware for Terminal<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, req: &mut Request, res: &mut Response, next: &mut Next) -> HandlerResult {
        (self.0)(req, res)?;
        if !res.is_sent() {
            next.proceed();
        }
        Ok(())
    }
}

/// Runs `handler` only if `middleware` called its continuation.
pub(crate) struct Chain {
    pub(crate) middleware: Arc<dyn Middleware>,
    pub(crate) handler: Arc<dyn Middleware>,
}

impl Middleware for Chain {
    fn call(&self, req: &mut Request, res: &mut Response, next: &mut Next) -> HandlerResult {
        let mut inner = Next::new();
        self.middleware.call(req, res, &mut inner)?;

        if inner.invoked() {
            self.handler.call(req, res, next)?;
        }
        Ok(())
    }
}
