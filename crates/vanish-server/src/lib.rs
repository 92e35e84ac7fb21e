//! Vanish production server.
//!
//! Serves the [`vanish_core`] relay over HTTP/JSON with axum, using system
//! time and the in-memory mailbox store, and runs the expiry reclaimer
//! alongside the listener for the server's whole lifetime.
//!
//! # Components
//!
//! - [`Server`]: binds the listener, runs the router and the reclaimer
//! - [`routes::router`]: the five HTTP endpoints
//! - [`SystemEnv`]: production environment (real time)
//! - [`ServerConfig`]: bind address, limits, sweep interval

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod routes;
mod system_env;
pub mod wire;

use std::{future::Future, net::SocketAddr};

pub use config::{DEFAULT_BIND_ADDRESS, DEFAULT_MAX_BODY_BYTES, ServerConfig};
pub use error::{ApiError, NOT_FOUND_DETAIL, ServerError};
pub use system_env::SystemEnv;
use tokio::net::TcpListener;
use vanish_core::{Environment, MailboxStore, MemoryMailboxStore, RelayService};

/// Production Vanish server.
///
/// Owns the bound listener and the relay. Nothing is served until
/// [`run`](Self::run) or [`run_until`](Self::run_until).
pub struct Server<E = SystemEnv, S = MemoryMailboxStore>
where
    E: Environment,
    S: MailboxStore,
{
    listener: TcpListener,
    relay: RelayService<E, S>,
    config: ServerConfig,
}

impl Server {
    /// Bind a server with system time and an in-memory store.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with(SystemEnv::new(), MemoryMailboxStore::new(), config).await
    }
}

impl<E, S> Server<E, S>
where
    E: Environment,
    S: MailboxStore,
{
    /// Bind a server over a specific environment and store.
    pub async fn bind_with(env: E, store: S, config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let listener = TcpListener::bind(&config.bind_address).await?;
        let relay = RelayService::new(env, store, config.relay.clone());

        Ok(Self { listener, relay, config })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Relay served by this server. Clones share its state.
    pub fn relay(&self) -> &RelayService<E, S> {
        &self.relay
    }

    /// Serve until the process is killed.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// In-flight requests finish first, then the reclaimer is stopped and
    /// awaited.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = self.listener.local_addr()?;
        let reclaimer = self.relay.reclaimer(self.config.reclaimer.clone()).spawn();
        let app = routes::router(self.relay, self.config.max_body_bytes);

        tracing::info!(%local_addr, "relay listening");

        let served = axum::serve(self.listener, app).with_graceful_shutdown(shutdown).await;
        if let Err(e) = &served {
            tracing::error!(error = %e, "listener failed");
        }

        reclaimer.shutdown().await?;
        tracing::info!("relay stopped");

        Ok(served?)
    }
}
