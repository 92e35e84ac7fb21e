//! Vanish relay core.
//!
//! Ephemeral message relay logic: a public-key directory and a mailbox store
//! that hands each stored ciphertext to its recipient exactly once and then
//! destroys it, with an optional TTL after which an undelivered envelope is
//! discarded unread. The relay never sees plaintext.
//!
//! # Components
//!
//! - [`MailboxStore`]: per-recipient envelope queues with atomic append and
//!   drain ([`MemoryMailboxStore`], plus [`ChaoticMailboxStore`] for fault
//!   injection)
//! - [`ExpiryReclaimer`]: background task evicting expired envelopes
//! - [`KeyDirectory`]: user id → public-key credential
//! - [`RelayService`]: register / lookup / send / receive façade
//! - [`Environment`]: clock abstraction so expiry is testable
//!
//! # Concurrency
//!
//! Each recipient's queue has its own mutex. Send, receive and the reclaimer
//! all mutate a queue only while holding that mutex, and nothing ever holds
//! two of them (or one plus the key directory's) at once.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod envelope;
pub mod error;
pub mod key_directory;
pub mod mailbox;
pub mod reclaimer;
pub mod relay;

pub use env::{Environment, Timestamp};
pub use envelope::{Envelope, EnvelopeId};
pub use error::RelayError;
pub use key_directory::{DirectoryError, KeyDirectory, KeyRecord, RegisterOutcome};
pub use mailbox::{ChaoticMailboxStore, Drained, MailboxStore, MemoryMailboxStore, StoreError};
pub use reclaimer::{
    DEFAULT_SWEEP_INTERVAL, ExpiryReclaimer, ReclaimerConfig, ReclaimerError, ReclaimerHandle,
};
pub use relay::{
    DEFAULT_MAX_CIPHERTEXT_BYTES, MAX_ID_BYTES, RelayConfig, RelayService, SendReceipt,
    SendRequest, SendStatus,
};
