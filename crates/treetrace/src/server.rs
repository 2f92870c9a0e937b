//! HTTP server lifecycle.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::{build_router, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;

/// Open the database and serve the API until Ctrl-C or SIGTERM.
///
/// Expired sessions are pruned once at startup.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: Config, bind: Option<SocketAddr>) -> Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => config.bind_address()?,
    };

    let storage = Storage::open(config.database_path())?;
    storage.prune_expired_sessions()?;

    let app = build_router(AppState::new(storage, config));
    let listener = TcpListener::bind(addr).await?;
    info!("treetrace listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("treetrace stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}
