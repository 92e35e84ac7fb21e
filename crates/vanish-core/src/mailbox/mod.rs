//! Mailbox storage abstraction.
//!
//! Trait-based abstraction over the per-recipient envelope queues. The trait
//! is synchronous (no async): every operation is a short critical section on
//! in-memory state, and the reclaimer and request handlers call it directly.

mod chaotic;
mod error;
mod memory;

pub use chaotic::ChaoticMailboxStore;
pub use error::StoreError;
pub use memory::MemoryMailboxStore;

use crate::{
    env::Timestamp,
    envelope::{Envelope, EnvelopeId},
};

/// Result of draining one recipient's mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drained {
    /// Envelopes handed to the caller, in insertion order.
    pub deliverable: Vec<Envelope>,
    /// Number of expired envelopes discarded by the same drain.
    pub expired: usize,
}

/// Storage for per-recipient envelope queues.
///
/// Must be Clone (shared by the relay façade and the reclaimer), Send + Sync
/// (request handlers run on many threads), and synchronous. Implementations
/// share internal state via Arc, so clones see the same mailboxes.
///
/// # Invariants
///
/// - Every operation either fully applies or returns an error without
///   mutating any queue.
/// - Each recipient's queue has exactly one mutual-exclusion domain, acquired
///   by `append`, `drain_deliverable` and `purge_expired` alike.
/// - No operation holds more than one recipient's exclusion at a time.
pub trait MailboxStore: Clone + Send + Sync + 'static {
    /// Build an envelope and append it to the tail of the recipient's queue.
    ///
    /// `build` runs inside the recipient's exclusive section, after every
    /// earlier append to that recipient has landed and before any later one
    /// starts. Anything `build` draws from a counter is therefore ordered the
    /// same way as the queue. It is not called when the store refuses the
    /// append.
    ///
    /// Creates the mailbox on first use. Concurrent appends for the same
    /// recipient are linearized; none is lost.
    fn append_with<F>(&self, recipient: &str, build: F) -> Result<EnvelopeId, StoreError>
    where
        F: FnOnce() -> Envelope;

    /// Append an already-built envelope to the tail of the recipient's queue.
    fn append(&self, recipient: &str, envelope: Envelope) -> Result<(), StoreError> {
        self.append_with(recipient, || envelope).map(|_| ())
    }

    /// Atomically take every envelope queued for `recipient`.
    ///
    /// The queue is swapped for an empty one inside a single exclusive
    /// section. Envelopes expired at `now` are discarded and counted; the rest
    /// are returned in insertion order. An append that acquires the exclusion
    /// after the swap appears only in a later drain.
    ///
    /// Draining a recipient that has no mailbox returns an empty result and
    /// does not create one.
    fn drain_deliverable(&self, recipient: &str, now: Timestamp) -> Result<Drained, StoreError>;

    /// Remove every envelope expired at `now`, across all mailboxes.
    ///
    /// Returns the number of envelopes removed. Mailboxes are visited one at a
    /// time.
    fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError>;

    /// Total number of queued envelopes across all mailboxes.
    ///
    /// Diagnostic only: the value may be stale as soon as it is returned.
    fn pending_count(&self) -> Result<usize, StoreError>;
}
