//! Relay service.
//!
//! Binds the four relay operations (register, lookup, send, receive) to the
//! [`KeyDirectory`] and a [`MailboxStore`]. Pure logic, no I/O: the HTTP layer
//! decodes requests into these calls and encodes the results.
//!
//! The relay never verifies that a sender has a registered key and never looks
//! inside a ciphertext; deciding whether a message can be opened is the
//! recipient's job.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;

use crate::{
    env::Environment,
    envelope::{Envelope, EnvelopeId},
    error::RelayError,
    key_directory::{KeyDirectory, RegisterOutcome},
    mailbox::MailboxStore,
    reclaimer::{ExpiryReclaimer, ReclaimerConfig},
};

/// Longest accepted user, sender or recipient identifier, in bytes.
pub const MAX_ID_BYTES: usize = 256;

/// Default upper bound on a single ciphertext.
pub const DEFAULT_MAX_CIPHERTEXT_BYTES: usize = 64 * 1024;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Largest ciphertext accepted by `send`
    pub max_ciphertext_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { max_ciphertext_bytes: DEFAULT_MAX_CIPHERTEXT_BYTES }
    }
}

/// A message submitted for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    /// Claimed sender. Not authenticated.
    pub sender: String,
    /// Mailbox the envelope is queued in.
    pub recipient: String,
    /// Sealed payload.
    pub ciphertext: Bytes,
    /// Lifetime of the envelope if undelivered. `None` and `Some(0)` both
    /// mean the envelope only disappears on delivery.
    pub ttl_seconds: Option<u64>,
}

/// Storage status reported back to a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Envelope is queued for the recipient.
    Stored,
}

impl SendStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
        }
    }
}

/// Result of a successful `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    /// Identifier assigned to the stored envelope
    pub id: EnvelopeId,
    /// Always [`SendStatus::Stored`] on success
    pub status: SendStatus,
}

/// Relay façade over a key directory and a mailbox store.
///
/// Clone is cheap and shares all state: the store, the directory and the
/// envelope sequence counter.
#[derive(Clone)]
pub struct RelayService<E, S>
where
    E: Environment,
    S: MailboxStore,
{
    env: E,
    store: S,
    keys: KeyDirectory,
    config: RelayConfig,
    next_sequence: Arc<AtomicU64>,
}

impl<E, S> RelayService<E, S>
where
    E: Environment,
    S: MailboxStore,
{
    /// Create a relay with an empty key directory.
    pub fn new(env: E, store: S, config: RelayConfig) -> Self {
        Self {
            env,
            store,
            keys: KeyDirectory::new(),
            config,
            next_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register or overwrite a user's public-key credential.
    pub fn register(
        &self,
        user_id: &str,
        credential: Bytes,
    ) -> Result<RegisterOutcome, RelayError> {
        validate_id("user_id", user_id)?;
        if credential.is_empty() {
            return Err(RelayError::InvalidRequest("public key must not be empty".to_string()));
        }

        let outcome = self.keys.register(user_id, credential);
        tracing::debug!(user_id, ?outcome, "public key registered");

        Ok(outcome)
    }

    /// Credential registered for `user_id`.
    pub fn lookup(&self, user_id: &str) -> Result<Bytes, RelayError> {
        validate_id("user_id", user_id)?;
        Ok(self.keys.lookup(user_id)?.credential)
    }

    /// Queue a ciphertext for its recipient.
    pub fn send(&self, request: SendRequest) -> Result<SendReceipt, RelayError> {
        validate_id("sender", &request.sender)?;
        validate_id("recipient", &request.recipient)?;
        if request.ciphertext.is_empty() {
            return Err(RelayError::InvalidRequest("ciphertext must not be empty".to_string()));
        }
        if request.ciphertext.len() > self.config.max_ciphertext_bytes {
            return Err(RelayError::InvalidRequest(format!(
                "ciphertext is {} bytes, limit is {}",
                request.ciphertext.len(),
                self.config.max_ciphertext_bytes
            )));
        }

        let ttl = request.ttl_seconds.filter(|&secs| secs > 0).map(Duration::from_secs);

        // Stamped under the recipient's lock so sequence order is queue order.
        let id = self.store.append_with(&request.recipient, || {
            let created_at = self.env.wall_clock();
            Envelope {
                id: EnvelopeId::new(created_at, self.next_sequence.fetch_add(1, Ordering::Relaxed)),
                sender: request.sender,
                ciphertext: request.ciphertext,
                created_at,
                expire_at: ttl.map(|ttl| created_at.saturating_add(ttl)),
            }
        })?;

        tracing::debug!(recipient = %request.recipient, %id, ?ttl, "envelope stored");

        Ok(SendReceipt { id, status: SendStatus::Stored })
    }

    /// Take every deliverable envelope queued for `user_id`.
    ///
    /// Returned envelopes are gone from the store when this returns; expired
    /// ones found along the way are discarded. An unknown user gets an empty
    /// list.
    pub fn receive(&self, user_id: &str) -> Result<Vec<Envelope>, RelayError> {
        validate_id("user_id", user_id)?;

        let now = self.env.wall_clock();
        let drained = self.store.drain_deliverable(user_id, now)?;

        if !drained.deliverable.is_empty() || drained.expired > 0 {
            tracing::debug!(
                user_id,
                delivered = drained.deliverable.len(),
                expired = drained.expired,
                "mailbox drained"
            );
        }

        Ok(drained.deliverable)
    }

    /// Total envelopes waiting across all mailboxes.
    pub fn pending_count(&self) -> Result<usize, RelayError> {
        Ok(self.store.pending_count()?)
    }

    /// Reclaimer sweeping this relay's store with this relay's clock.
    pub fn reclaimer(&self, config: ReclaimerConfig) -> ExpiryReclaimer<E, S> {
        ExpiryReclaimer::new(self.env.clone(), self.store.clone(), config)
    }

    /// Mailbox store backing this relay.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Key directory backing this relay.
    pub fn keys(&self) -> &KeyDirectory {
        &self.keys
    }

    /// Environment (clock) used for envelope timestamps.
    pub fn env(&self) -> &E {
        &self.env
    }
}

fn validate_id(field: &str, value: &str) -> Result<(), RelayError> {
    if value.is_empty() {
        return Err(RelayError::InvalidRequest(format!("{field} must not be empty")));
    }
    if value.len() > MAX_ID_BYTES {
        return Err(RelayError::InvalidRequest(format!(
            "{field} exceeds {MAX_ID_BYTES} bytes"
        )));
    }
    Ok(())
}

impl<E, S> std::fmt::Debug for RelayService<E, S>
where
    E: Environment,
    S: MailboxStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("registered_keys", &self.keys.count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
