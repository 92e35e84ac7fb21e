//! Error types for relay operations.
//!
//! Only two failures are meant for callers: an unknown key and a malformed
//! request. Store refusals are internal and never leave a queue half-changed.

use thiserror::Error;

use crate::{key_directory::DirectoryError, mailbox::StoreError};

/// Errors returned by [`RelayService`](crate::RelayService) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Lookup of a user with no registered credential.
    #[error("public key not found for {0}")]
    NotFound(String),

    /// Request failed validation. Nothing was stored or removed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Mailbox store refused the operation. The queue is unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RelayError {
    /// Returns true if the caller sent something wrong and retrying the same
    /// request cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidRequest(_))
    }
}

impl From<DirectoryError> for RelayError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(user_id) => Self::NotFound(user_id),
        }
    }
}
