//! Fuzz target for the mailbox store under injected failures
//!
//! Drives a `MemoryMailboxStore` through `ChaoticMailboxStore` with random
//! appends, drains, purges and clock movement.
//!
//! # Strategy
//!
//! - Variable failure rates (0% to 90%)
//! - A handful of recipients so queues collide
//! - TTLs short enough to expire during the run
//!
//! # Invariants
//!
//! - No envelope is delivered twice
//! - No envelope is delivered at or after its expiry
//! - A failed operation leaves the inner store unchanged
//! - Every accepted envelope ends up delivered, expired-on-drain, purged, or
//!   still pending

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use vanish_core::{
    ChaoticMailboxStore, Envelope, EnvelopeId, MailboxStore, MemoryMailboxStore, Timestamp,
};

#[derive(Debug, Clone, Arbitrary)]
struct ChaosScenario {
    /// Seed for the chaotic store's RNG
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Sequence of operations to perform
    operations: Vec<ChaosOperation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum ChaosOperation {
    Append { recipient: u8, ttl_ms: Option<u16>, payload: Vec<u8> },
    Drain { recipient: u8 },
    Purge,
    Advance { millis: u16 },
}

fn recipient_name(recipient: u8) -> String {
    format!("user-{}", recipient % 4)
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = (scenario.failure_rate_tenth % 10) as f64 / 10.0;
    let inner = MemoryMailboxStore::new();
    let store = ChaoticMailboxStore::with_seed(inner.clone(), failure_rate, scenario.chaos_seed);

    let mut now = Timestamp::from_millis(1_000_000);
    let mut next_sequence = 0u64;
    let mut accepted = 0usize;
    let mut delivered = HashSet::new();
    let mut expired_on_drain = 0usize;
    let mut purged = 0usize;

    for op in scenario.operations {
        let before = inner.pending_count().expect("memory store never fails");

        match op {
            ChaosOperation::Append { recipient, ttl_ms, payload } => {
                let envelope = Envelope {
                    id: EnvelopeId::new(now, next_sequence),
                    sender: "fuzzer".to_string(),
                    ciphertext: Bytes::from(payload),
                    created_at: now,
                    expire_at: ttl_ms.map(|ms| now.saturating_add(std::time::Duration::from_millis(ms as u64))),
                };
                next_sequence += 1;

                match store.append(&recipient_name(recipient), envelope) {
                    Ok(()) => accepted += 1,
                    Err(_) => assert_eq!(inner.pending_count().unwrap(), before),
                }
            },

            ChaosOperation::Drain { recipient } => match store.drain_deliverable(&recipient_name(recipient), now) {
                Ok(drained) => {
                    for envelope in drained.deliverable {
                        assert!(!envelope.is_expired(now), "delivered expired envelope {}", envelope.id);
                        assert!(delivered.insert(envelope.id), "envelope {} delivered twice", envelope.id);
                    }
                    expired_on_drain += drained.expired;
                },
                Err(_) => assert_eq!(inner.pending_count().unwrap(), before),
            },

            ChaosOperation::Purge => match store.purge_expired(now) {
                Ok(removed) => purged += removed,
                Err(_) => assert_eq!(inner.pending_count().unwrap(), before),
            },

            ChaosOperation::Advance { millis } => {
                now = now.saturating_add(std::time::Duration::from_millis(millis as u64));
            },
        }
    }

    let pending = inner.pending_count().unwrap();
    assert_eq!(
        accepted,
        delivered.len() + expired_on_drain + purged + pending,
        "envelope accounting mismatch"
    );
});
