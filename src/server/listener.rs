use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;
use crate::proxy::Gatekeeper;

/// Pause after a failed accept.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {}, forwarding to {}", cfg.listen_addr, cfg.target_url);

    serve(listener, Arc::new(Gatekeeper::from_config(cfg))).await
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, gatekeeper: Arc<Gatekeeper>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                // Back off so a persistent error (e.g. EMFILE) does not spin.
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", peer);

        let gatekeeper = Arc::clone(&gatekeeper);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, peer.to_string(), gatekeeper);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
