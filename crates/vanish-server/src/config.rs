//! Server configuration.

use vanish_core::{ReclaimerConfig, RelayConfig};

use crate::error::ServerError;

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default upper bound on an HTTP request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

/// Configuration for the production server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:8000")
    pub bind_address: String,
    /// Envelope validation limits
    pub relay: RelayConfig,
    /// Expiry sweep schedule
    pub reclaimer: ReclaimerConfig,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            relay: RelayConfig::default(),
            reclaimer: ReclaimerConfig::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Reject settings the server cannot run with.
    ///
    /// The body limit must leave room for the largest accepted ciphertext
    /// once base64-encoded.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.reclaimer.interval.is_zero() {
            return Err(ServerError::Config("reclaim interval must be positive".to_string()));
        }
        if self.relay.max_ciphertext_bytes == 0 {
            return Err(ServerError::Config("max ciphertext size must be positive".to_string()));
        }

        let encoded_ciphertext = self.relay.max_ciphertext_bytes.div_ceil(3) * 4;
        if self.max_body_bytes < encoded_ciphertext {
            return Err(ServerError::Config(format!(
                "max body of {} bytes cannot hold a {} byte ciphertext ({encoded_ciphertext} bytes as base64)",
                self.max_body_bytes, self.relay.max_ciphertext_bytes
            )));
        }

        Ok(())
    }
}
