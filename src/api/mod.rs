//! Reference REST service implementing the configuration API contract.
//!
//! Lets the console run end to end without the production backend.

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{ConsoleError, Result};

/// Serve the API until ctrl-c
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| ConsoleError::InvalidInput(format!("invalid bind address '{}': {}", bind, e)))?;
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("config API listening on http://{}/api", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
