//! Public-key directory.
//!
//! In-memory mapping from user identifier to a registered public-key
//! credential. Credentials are opaque bytes to the relay. Re-registration
//! overwrites the previous credential (last write wins, no versioning) and
//! records persist for the process lifetime.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use thiserror::Error;

/// Errors from directory lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No credential registered for this user.
    #[error("no public key registered for {0}")]
    NotFound(String),
}

/// Outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// First credential for this user.
    Created,
    /// An existing credential was overwritten.
    Replaced,
}

/// Registered credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    /// Serialized public key, opaque to the relay.
    pub credential: Bytes,
}

/// In-memory key directory.
///
/// Thread-safe via `Arc<Mutex<_>>`. Clone shares the same underlying map. The
/// lock is never held together with a mailbox lock.
#[derive(Clone, Default)]
pub struct KeyDirectory {
    inner: Arc<Mutex<HashMap<String, KeyRecord>>>,
}

impl KeyDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite the credential for `user_id`.
    pub fn register(&self, user_id: &str, credential: Bytes) -> RegisterOutcome {
        let previous = self.records().insert(user_id.to_owned(), KeyRecord { credential });

        match previous {
            Some(_) => RegisterOutcome::Replaced,
            None => RegisterOutcome::Created,
        }
    }

    /// Credential registered for `user_id`.
    pub fn lookup(&self, user_id: &str) -> Result<KeyRecord, DirectoryError> {
        self.records()
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_owned()))
    }

    /// Number of registered users.
    pub fn count(&self) -> usize {
        self.records().len()
    }

    // A poisoned map is still consistent: insert and get are single calls.
    fn records(&self) -> MutexGuard<'_, HashMap<String, KeyRecord>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
