//! Liveness endpoint for the hosting platform.
//!
//! `GET /` answers `running` and `GET /ping` answers `pong`. Not part of the
//! bot's command surface.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Routes served by the health server.
pub fn router() -> Router {
    Router::new()
        .route("/", get(|| async { "running" }))
        .route("/ping", get(|| async { "pong" }))
}

/// Bind `addr` and serve [`router`] in a background task.
///
/// Returns the bound address, which differs from `addr` when port 0 is used.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn spawn_health_server(
    addr: SocketAddr,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(addr = %local, "health server listening");

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            error!(error = %e, "health server error");
        }
    });
    Ok((local, handle))
}
