//! Envelopes: the unit of mailbox storage.

use std::fmt;

use bytes::Bytes;

use crate::env::Timestamp;

/// Diagnostic identifier of a stored envelope.
///
/// Rendered as `msg-<created-millis>-<sequence>`. The sequence comes from a
/// relay-wide counter drawn inside the recipient's append, so sequences
/// strictly increase along any one recipient's queue and never repeat across
/// recipients. Identifiers are never used to address an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnvelopeId {
    created_at: Timestamp,
    sequence: u64,
}

impl EnvelopeId {
    /// Create an identifier from its creation time and sequence number.
    pub const fn new(created_at: Timestamp, sequence: u64) -> Self {
        Self { created_at, sequence }
    }

    /// Sequence number component.
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}-{}", self.created_at.as_millis(), self.sequence)
    }
}

/// One stored ciphertext plus its metadata.
///
/// The ciphertext is opaque: the relay never inspects or transforms it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Diagnostic identifier
    pub id: EnvelopeId,
    /// Sender identifier, opaque to the store
    pub sender: String,
    /// Encrypted payload
    pub ciphertext: Bytes,
    /// When the relay accepted the envelope
    pub created_at: Timestamp,
    /// When the envelope stops being deliverable. `None` never expires.
    pub expire_at: Option<Timestamp>,
}

impl Envelope {
    /// Envelope has expired at `now`.
    ///
    /// Expiry is inclusive: an envelope whose `expire_at` equals `now` is
    /// already expired.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expire_at.is_some_and(|expire_at| expire_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(expire_at: Option<u64>) -> Envelope {
        Envelope {
            id: EnvelopeId::new(Timestamp::from_millis(10), 1),
            sender: "alice".to_string(),
            ciphertext: Bytes::from_static(b"sealed"),
            created_at: Timestamp::from_millis(10),
            expire_at: expire_at.map(Timestamp::from_millis),
        }
    }

    #[test]
    fn id_display() {
        let id = EnvelopeId::new(Timestamp::from_millis(1_700_000_000_000), 42);
        assert_eq!(id.to_string(), "msg-1700000000000-42");
    }

    #[test]
    fn without_ttl_never_expires() {
        assert!(!envelope(None).is_expired(Timestamp::from_millis(u64::MAX)));
    }

    #[test]
    fn expiry_is_inclusive() {
        let env = envelope(Some(100));
        assert!(!env.is_expired(Timestamp::from_millis(99)));
        assert!(env.is_expired(Timestamp::from_millis(100)));
        assert!(env.is_expired(Timestamp::from_millis(101)));
    }
}
