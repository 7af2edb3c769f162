//! Route registration and serving.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use crate::config::Config;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::router::handler::{Chain, Terminal};
use crate::router::{HandlerResult, Middleware, Next, Route, RouteKind};
use crate::server::Server;
use crate::transport::{Acceptor, TcpAcceptor};

/// Read-only view of the application, shared by every request it serves.
#[derive(Debug, Default)]
pub struct AppHandle {
    config: Config,
    route_count: usize,
}

impl AppHandle {
    pub fn new(config: Config, route_count: usize) -> Self {
        Self {
            config,
            route_count,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }
}

/// An application: an ordered list of routes plus the settings to serve them.
///
/// ```no_run
/// use waypoint::App;
///
/// # async fn run() -> anyhow::Result<()> {
/// let mut app = App::new();
/// app.get("/home/:epic", |req, res| {
///     let epic = req.params.get("epic").unwrap_or("nobody");
///     res.send(format!("{epic}!"));
///     Ok(())
/// });
/// app.listen(8080).await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct App {
    routes: Vec<Route>,
    config: Config,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            routes: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Adds a handler for `method` on `path`. When the handler returns
    /// without sending, the chain moves on.
    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.push(RouteKind::Method(method), path, Arc::new(Terminal(handler)))
    }

    /// Adds a middleware for `method` on `path` that decides itself whether
    /// the chain continues.
    pub fn route_next<F>(&mut self, method: Method, path: &str, middleware: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response, &mut Next) -> HandlerResult + Send + Sync + 'static,
    {
        self.push(RouteKind::Method(method), path, Arc::new(middleware))
    }

    /// Adds `middleware` in front of `handler` on one route. The handler
    /// only runs if the middleware calls its continuation.
    pub fn route_chain<M, F>(&mut self, method: Method, path: &str, middleware: M, handler: F) -> &mut Self
    where
        M: Fn(&mut Request, &mut Response, &mut Next) -> HandlerResult + Send + Sync + 'static,
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        let chain = Chain {
            middleware: Arc::new(middleware),
            handler: Arc::new(Terminal(handler)),
        };
        self.push(RouteKind::Method(method), path, Arc::new(chain))
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn get_next<F>(&mut self, path: &str, middleware: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response, &mut Next) -> HandlerResult + Send + Sync + 'static,
    {
        self.route_next(Method::GET, path, middleware)
    }

    pub fn get_chain<M, F>(&mut self, path: &str, middleware: M, handler: F) -> &mut Self
    where
        M: Fn(&mut Request, &mut Response, &mut Next) -> HandlerResult + Send + Sync + 'static,
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route_chain(Method::GET, path, middleware, handler)
    }

    /// POST, PUT and PATCH handlers run once the whole body has arrived.
    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PATCH, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// Adds a middleware for every method on paths starting with `path`.
    pub fn use_at<F>(&mut self, path: &str, middleware: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response, &mut Next) -> HandlerResult + Send + Sync + 'static,
    {
        self.push(RouteKind::Use, path, Arc::new(middleware))
    }

    /// Adds a middleware for every request.
    pub fn use_all<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response, &mut Next) -> HandlerResult + Send + Sync + 'static,
    {
        self.use_at("", middleware)
    }

    fn push(&mut self, kind: RouteKind, path: &str, handler: Arc<dyn Middleware>) -> &mut Self {
        self.routes.push(Route::new(kind, path, handler));
        self
    }

    /// Freezes the route list. Nothing can be registered afterwards.
    pub fn build(self) -> Server {
        let handle = AppHandle::new(self.config, self.routes.len());
        Server::new(self.routes.into(), Arc::new(handle))
    }

    /// Serves on `0.0.0.0:port` until the process stops.
    pub async fn listen(self, port: u16) -> anyhow::Result<()> {
        self.listen_with(port, |_| {}).await
    }

    /// Like [`App::listen`], calling `on_ready` with the bound address first.
    pub async fn listen_with<F>(self, port: u16, on_ready: F) -> anyhow::Result<()>
    where
        F: FnOnce(SocketAddr),
    {
        let addr = format!("0.0.0.0:{port}");
        self.bind_and_serve(&addr, on_ready).await
    }

    /// Serves on the configured `listen_addr`.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr.clone();
        self.bind_and_serve(&addr, |_| {}).await
    }

    async fn bind_and_serve<F>(self, addr: &str, on_ready: F) -> anyhow::Result<()>
    where
        F: FnOnce(SocketAddr),
    {
        let acceptor = match TcpAcceptor::bind(addr).await {
            Ok(acceptor) => acceptor,
            Err(e) => {
                error!(addr, error = %e, "Failed to bind listener");
                return Err(e).with_context(|| format!("binding {addr}"));
            }
        };

        let local = acceptor.local_addr()?;
        info!("Listening on {}", local);
        on_ready(local);

        self.build().serve(acceptor).await
    }
}
