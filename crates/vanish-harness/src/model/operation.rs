//! Operations for model-based testing.
//!
//! Operations represent every action a client or the reclaimer can take
//! against the relay. They are generated randomly by proptest and applied to
//! both the model and the real implementation.

use arbitrary::Arbitrary;

/// User identifier (u8 keeps the test space small).
pub type ModelUserId = u8;

/// Wire identifier for a model user.
pub fn user_name(user: ModelUserId) -> String {
    format!("user-{user}")
}

/// Operations that can be applied to the relay.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// User publishes (or replaces) a public key.
    Register {
        /// User registering.
        user: ModelUserId,
        /// Key content seed.
        key_seed: u8,
    },

    /// Look up a user's public key.
    Lookup {
        /// User being looked up.
        user: ModelUserId,
    },

    /// Queue a ciphertext for a recipient.
    Send {
        /// Claimed sender.
        sender: ModelUserId,
        /// Recipient mailbox.
        recipient: ModelUserId,
        /// Ciphertext content.
        content: SmallCiphertext,
        /// TTL in seconds. Zero means no TTL.
        ttl_seconds: u8,
    },

    /// Drain a user's mailbox.
    Receive {
        /// User receiving.
        user: ModelUserId,
    },

    /// Run one reclaimer sweep.
    Sweep,

    /// Advance the wall clock.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
}

/// Small ciphertext content for testing.
///
/// Compact representation so shrunk cases stay readable. Size class 0 expands
/// to an empty ciphertext, which the relay must reject.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallCiphertext {
    /// Content seed.
    pub seed: u8,
    /// Length hint (0-3 maps to empty/small/medium/large).
    pub size_class: u8,
}

impl SmallCiphertext {
    /// Expand to ciphertext bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len: u8 = match self.size_class % 4 {
            0 => 0,
            1 => 8,
            2 => 64,
            _ => 200,
        };

        (0..len).map(|i| self.seed.wrapping_add(i)).collect()
    }
}

/// A message as seen by its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    /// Claimed sender.
    pub sender: ModelUserId,
    /// Ciphertext bytes.
    pub ciphertext: Vec<u8>,
}

/// Result of applying an operation.
///
/// Used to compare model and real behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Key stored; `replaced` if one was already registered.
    Registered {
        /// A previous key was overwritten.
        replaced: bool,
    },

    /// Key returned by a lookup.
    Key(Vec<u8>),

    /// Envelope queued.
    Stored,

    /// Messages handed to the recipient, in send order.
    Delivered(Vec<ModelMessage>),

    /// Envelopes removed by a sweep.
    Swept(usize),

    /// Clock moved.
    Advanced,

    /// Operation rejected.
    Error(OperationError),
}

impl OperationResult {
    /// Returns true unless the operation was rejected.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Error(_))
    }
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Lookup of an unregistered user.
    NotFound,

    /// Request failed validation.
    InvalidRequest,
}
