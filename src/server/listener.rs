use tracing::{info, warn};

use crate::server::Server;
use crate::transport::Acceptor;

pub async fn run<A: Acceptor>(mut acceptor: A, server: Server) -> anyhow::Result<()> {
    loop {
        let (conn, peer) = match acceptor.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.handle(conn, Some(peer)).await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
