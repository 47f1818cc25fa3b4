//! Kanban Board Service
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: SQLite data access
//! - http: JSON handlers and router

pub mod config;
pub mod domain;
pub mod http;
pub mod repository;

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

pub use config::ServerArgs;
pub use http::{build_router, AppState, SharedState};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Domain(#[from] domain::DomainError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Logger(#[from] rolling_logger::LoggerError),
}

/// Serve the API on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Open the database, bind `args.addr` and serve until Ctrl+C
pub async fn run(args: ServerArgs) -> Result<(), ServerError> {
    let state = AppState::open(&args.db_path)?;
    let listener = TcpListener::bind(args.addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: args.addr,
            source,
        })?;

    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, db = %args.db_path.display(), "kanban server listening");

    serve(listener, state, shutdown_signal()).await?;
    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
