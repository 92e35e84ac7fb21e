//! Reference relay.
//!
//! Straight-line model of the relay semantics: plain maps, no locks, time in
//! milliseconds since the start of the run. It is the oracle the real
//! `RelayService` is checked against.

use std::collections::BTreeMap;

use super::operation::{
    ModelMessage, ModelUserId, Operation, OperationError, OperationResult, SmallCiphertext,
};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Users with a registered key (sorted).
    pub registered: Vec<ModelUserId>,
    /// Queued envelope count per recipient, omitting empty mailboxes (sorted).
    pub queued: Vec<(ModelUserId, usize)>,
}

#[derive(Debug, Clone)]
struct PendingEnvelope {
    message: ModelMessage,
    expire_at_ms: Option<u64>,
}

impl PendingEnvelope {
    fn is_expired(&self, now_ms: u64) -> bool {
        self.expire_at_ms.is_some_and(|at| at <= now_ms)
    }
}

/// Model relay - the reference implementation.
#[derive(Debug, Clone, Default)]
pub struct ModelRelay {
    now_ms: u64,
    keys: BTreeMap<ModelUserId, Vec<u8>>,
    mailboxes: BTreeMap<ModelUserId, Vec<PendingEnvelope>>,
}

impl ModelRelay {
    /// Empty relay at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds elapsed since the start of the run.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Apply an operation and return its result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Register { user, key_seed } => {
                let replaced = self.keys.insert(*user, key_bytes(*key_seed)).is_some();
                OperationResult::Registered { replaced }
            },
            Operation::Lookup { user } => match self.keys.get(user) {
                Some(key) => OperationResult::Key(key.clone()),
                None => OperationResult::Error(OperationError::NotFound),
            },
            Operation::Send { sender, recipient, content, ttl_seconds } => {
                self.apply_send(*sender, *recipient, content, *ttl_seconds)
            },
            Operation::Receive { user } => self.apply_receive(*user),
            Operation::Sweep => OperationResult::Swept(self.apply_sweep()),
            Operation::AdvanceTime { millis } => {
                self.now_ms += u64::from(*millis);
                OperationResult::Advanced
            },
        }
    }

    fn apply_send(
        &mut self,
        sender: ModelUserId,
        recipient: ModelUserId,
        content: &SmallCiphertext,
        ttl_seconds: u8,
    ) -> OperationResult {
        let ciphertext = content.to_bytes();
        if ciphertext.is_empty() {
            return OperationResult::Error(OperationError::InvalidRequest);
        }

        let expire_at_ms = (ttl_seconds > 0).then(|| self.now_ms + u64::from(ttl_seconds) * 1000);
        self.mailboxes.entry(recipient).or_default().push(PendingEnvelope {
            message: ModelMessage { sender, ciphertext },
            expire_at_ms,
        });

        OperationResult::Stored
    }

    fn apply_receive(&mut self, user: ModelUserId) -> OperationResult {
        let now_ms = self.now_ms;
        let queued = self.mailboxes.get_mut(&user).map(std::mem::take).unwrap_or_default();

        let delivered = queued
            .into_iter()
            .filter(|envelope| !envelope.is_expired(now_ms))
            .map(|envelope| envelope.message)
            .collect();

        OperationResult::Delivered(delivered)
    }

    fn apply_sweep(&mut self) -> usize {
        let now_ms = self.now_ms;
        let mut removed = 0;
        for queue in self.mailboxes.values_mut() {
            let before = queue.len();
            queue.retain(|envelope| !envelope.is_expired(now_ms));
            removed += before - queue.len();
        }
        removed
    }

    /// Total envelopes still queued, expired or not.
    pub fn pending_count(&self) -> usize {
        self.mailboxes.values().map(Vec::len).sum()
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            registered: self.keys.keys().copied().collect(),
            queued: self
                .mailboxes
                .iter()
                .filter(|(_, queue)| !queue.is_empty())
                .map(|(user, queue)| (*user, queue.len()))
                .collect(),
        }
    }
}

/// Public key bytes for a key seed.
pub fn key_bytes(seed: u8) -> Vec<u8> {
    vec![0x04, seed, seed.wrapping_mul(31)]
}
