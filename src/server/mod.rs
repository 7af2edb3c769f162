//! Accepting connections and handing them to the request engine.

pub mod listener;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::app::AppHandle;
use crate::http::connection::Connection;
use crate::router::Route;
use crate::transport::{Acceptor, Transport};

/// A frozen application, cheap to clone into each connection task.
#[derive(Debug, Clone)]
pub struct Server {
    routes: Arc<[Route]>,
    app: Arc<AppHandle>,
}

impl Server {
    pub fn new(routes: Arc<[Route]>, app: Arc<AppHandle>) -> Self {
        Self { routes, app }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn app(&self) -> &Arc<AppHandle> {
        &self.app
    }

    /// Serves one request on `transport`, then closes it.
    pub async fn handle<T: Transport>(&self, transport: T, peer: Option<SocketAddr>) -> anyhow::Result<()> {
        let mut conn = Connection::new(transport, self.routes.clone(), self.app.clone());
        if let Some(peer) = peer {
            conn = conn.with_peer(peer);
        }
        conn.run().await
    }

    /// Accepts connections forever, one task per connection.
    pub async fn serve<A: Acceptor>(self, acceptor: A) -> anyhow::Result<()> {
        listener::run(acceptor, self).await
    }
}
