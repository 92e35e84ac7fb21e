//! Vanish relay server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port with 10 s expiry sweeps
//! vanish-server --bind 0.0.0.0:8000
//!
//! # Sweep every second, accept ciphertexts up to 1 MiB
//! vanish-server --reclaim-interval-secs 1 --max-ciphertext-bytes 1048576 --max-body-bytes 1500000
//! ```

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vanish_core::{ReclaimerConfig, RelayConfig};
use vanish_server::{Server, ServerConfig};

/// Vanish relay server
#[derive(Parser, Debug)]
#[command(name = "vanish-server")]
#[command(about = "Ephemeral end-to-end encrypted message relay")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = vanish_server::DEFAULT_BIND_ADDRESS)]
    bind: String,

    /// Seconds between expiry sweeps
    #[arg(long, default_value = "10")]
    reclaim_interval_secs: u64,

    /// Largest accepted ciphertext, in bytes
    #[arg(long, default_value = "65536")]
    max_ciphertext_bytes: usize,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value = "262144")]
    max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Vanish relay starting");

    let config = ServerConfig {
        bind_address: args.bind,
        relay: RelayConfig { max_ciphertext_bytes: args.max_ciphertext_bytes },
        reclaimer: ReclaimerConfig { interval: Duration::from_secs(args.reclaim_interval_secs) },
        max_body_bytes: args.max_body_bytes,
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run_until(shutdown_signal()).await?;

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
