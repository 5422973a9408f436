//! # tg-server
//!
//! Axum server hosting the tokengate token endpoint.
//!
//! Routes:
//! - `POST /connect/token` for the `password` and `refresh_token` grants
//! - `/health`, `/health/live` and `/health/ready` probes
//! - `/` server information
//!
//! ## Usage
//!
//! ```ignore
//! use tg_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config)?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod providers;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tg_identity::{InMemoryIdentityStore, PasswordHasherService};
use tokio::net::TcpListener;

/// The tokengate server.
pub struct Server {
    config: ServerConfig,
    store: Arc<InMemoryIdentityStore>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// Loads users from `TG_USERS_FILE` when configured; otherwise starts
    /// with an empty store.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store = match &config.users_file {
            Some(path) => InMemoryIdentityStore::from_seed_file(
                path,
                PasswordHasherService::default(),
                config.lockout_policy(),
            )?,
            None => {
                tracing::warn!("TG_USERS_FILE is not set; starting with no users");
                InMemoryIdentityStore::new(PasswordHasherService::default(), config.lockout_policy())
            }
        };

        Ok(Self::with_identity_store(config, Arc::new(store)))
    }

    /// Creates a server over an existing identity store.
    #[must_use]
    pub const fn with_identity_store(config: ServerConfig, store: Arc<InMemoryIdentityStore>) -> Self {
        Self { config, store }
    }

    /// Runs the server.
    ///
    /// This binds the configured address and blocks until it receives a
    /// shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.config.bind_address().parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener until a shutdown signal.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let app = self.router()?;

        tracing::info!(
            addr = %listener.local_addr()?,
            issuer = %self.config.issuer,
            users = self.store.len(),
            "server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the identity store.
    #[must_use]
    pub fn identity_store(&self) -> &InMemoryIdentityStore {
        &self.store
    }

    /// Creates the router without starting the server.
    pub fn router(&self) -> anyhow::Result<Router> {
        let state = AppState::new(self.config.clone(), Arc::clone(&self.store))?;
        Ok(create_router(state))
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
