//! Mailbox store errors.

use thiserror::Error;

/// Errors returned by [`MailboxStore`](super::MailboxStore) operations.
///
/// A store operation that returns an error has not mutated any queue. Lock
/// contention is never an error: callers simply wait for the recipient's
/// mutex.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend refused the operation before applying it.
    ///
    /// The in-memory store never produces this; fault-injecting wrappers and
    /// non-memory backends do. The affected queue is unchanged.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
