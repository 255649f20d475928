use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ServerError;
use crate::http::connection::{Connection, Handler};
use crate::storage::{BlobStore, FsBlobStore};

/// Pause after a failed `accept` so a persistent error (EMFILE) does not spin.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Binds `0.0.0.0:port` with `SO_REUSEADDR` and makes it passive.
pub fn listen(port: u16, backlog: u32) -> Result<TcpListener, ServerError> {
    let bind_err = |source| ServerError::Bind { port, source };

    let socket = TcpSocket::new_v4().map_err(bind_err)?;
    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket
        .bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .map_err(bind_err)?;
    let listener = socket.listen(backlog).map_err(bind_err)?;

    info!(port, backlog, "server socket created and put in passive mode");
    Ok(listener)
}

/// Accepts connections forever, serving each to completion before the
/// next `accept`. Per-connection failures, including a failed `accept`,
/// are logged and the loop carries on.
pub async fn accept_loop<S: BlobStore>(listener: TcpListener, handler: &Handler<S>) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("{}", ServerError::Accept(e));
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let conn = Connection::new(socket, peer);
        match conn.serve(handler).await {
            Ok(outcome) => tracing::debug!(%peer, ?outcome, "connection finished"),
            Err(e @ ServerError::Parse(_)) => warn!(%peer, error = %e, "request rejected"),
            Err(e) => error!(%peer, error = %e, "error while serving request"),
        }
    }
}

/// Listens on the configured port and serves static content from disk.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = listen(cfg.server.port, cfg.server.backlog)?;
    info!("Listening for connections at {}", listener.local_addr()?);

    let handler = Handler::from_config(cfg, FsBlobStore::new());
    accept_loop(listener, &handler).await;

    Ok(())
}
