//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! relay behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelRelay     RealRelay       Compare
//!      (reference)   (RelayService)   Results
//! ```

use std::time::Duration;

use bytes::Bytes;
use proptest::prelude::*;
use vanish_core::{
    ExpiryReclaimer, MemoryMailboxStore, ReclaimerConfig, RegisterOutcome, RelayConfig,
    RelayError, RelayService, SendRequest,
};
use vanish_harness::{
    ModelMessage, ModelRelay, ModelUserId, ObservableState, Operation, OperationError,
    OperationResult, SimEnv, SmallCiphertext, key_bytes, user_name,
};

const NUM_USERS: u8 = 4;

/// Real system wrapper that mirrors `ModelRelay`'s interface.
struct RealRelay {
    env: SimEnv,
    relay: RelayService<SimEnv, MemoryMailboxStore>,
    reclaimer: ExpiryReclaimer<SimEnv, MemoryMailboxStore>,
}

impl RealRelay {
    fn new() -> Self {
        let env = SimEnv::new();
        let relay = RelayService::new(env.clone(), MemoryMailboxStore::new(), RelayConfig::default());
        let reclaimer = relay.reclaimer(ReclaimerConfig::default());

        Self { env, relay, reclaimer }
    }

    fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Register { user, key_seed } => {
                let key = Bytes::from(key_bytes(*key_seed));
                match self.relay.register(&user_name(*user), key) {
                    Ok(outcome) => OperationResult::Registered {
                        replaced: outcome == RegisterOutcome::Replaced,
                    },
                    Err(e) => error_result(&e),
                }
            },
            Operation::Lookup { user } => match self.relay.lookup(&user_name(*user)) {
                Ok(key) => OperationResult::Key(key.to_vec()),
                Err(e) => error_result(&e),
            },
            Operation::Send { sender, recipient, content, ttl_seconds } => {
                let request = SendRequest {
                    sender: user_name(*sender),
                    recipient: user_name(*recipient),
                    ciphertext: Bytes::from(content.to_bytes()),
                    ttl_seconds: Some(u64::from(*ttl_seconds)),
                };
                match self.relay.send(request) {
                    Ok(_) => OperationResult::Stored,
                    Err(e) => error_result(&e),
                }
            },
            Operation::Receive { user } => match self.relay.receive(&user_name(*user)) {
                Ok(envelopes) => OperationResult::Delivered(
                    envelopes
                        .into_iter()
                        .map(|e| ModelMessage {
                            sender: parse_user(&e.sender),
                            ciphertext: e.ciphertext.to_vec(),
                        })
                        .collect(),
                ),
                Err(e) => error_result(&e),
            },
            Operation::Sweep => match self.reclaimer.sweep() {
                Ok(removed) => OperationResult::Swept(removed),
                Err(e) => panic!("in-memory sweep failed: {e}"),
            },
            Operation::AdvanceTime { millis } => {
                self.env.advance(Duration::from_millis(u64::from(*millis)));
                OperationResult::Advanced
            },
        }
    }

    fn observable_state(&self) -> ObservableState {
        let users = 0..NUM_USERS;
        ObservableState {
            registered: users.clone().filter(|u| self.relay.lookup(&user_name(*u)).is_ok()).collect(),
            queued: users
                .map(|u| (u, self.relay.store().queued_for(&user_name(u))))
                .filter(|(_, n)| *n > 0)
                .collect(),
        }
    }
}

fn error_result(err: &RelayError) -> OperationResult {
    match err {
        RelayError::NotFound(_) => OperationResult::Error(OperationError::NotFound),
        RelayError::InvalidRequest(_) => OperationResult::Error(OperationError::InvalidRequest),
        RelayError::Store(e) => panic!("in-memory store failed: {e}"),
    }
}

fn parse_user(name: &str) -> ModelUserId {
    name.strip_prefix("user-").and_then(|n| n.parse().ok()).expect("model user name")
}

fn small_ciphertext_strategy() -> impl Strategy<Value = SmallCiphertext> {
    (any::<u8>(), 0..4u8).prop_map(|(seed, size_class)| SmallCiphertext { seed, size_class })
}

/// Strategy for generating operations over a small user set.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    let user = 0..NUM_USERS;
    let ttl_seconds = prop_oneof![Just(0u8), 1..5u8];

    prop_oneof![
        // Weight towards traffic
        1 => (user.clone(), any::<u8>())
            .prop_map(|(user, key_seed)| Operation::Register { user, key_seed }),
        1 => user.clone().prop_map(|user| Operation::Lookup { user }),
        5 => (user.clone(), user.clone(), small_ciphertext_strategy(), ttl_seconds).prop_map(
            |(sender, recipient, content, ttl_seconds)| Operation::Send {
                sender,
                recipient,
                content,
                ttl_seconds
            }
        ),
        3 => user.prop_map(|user| Operation::Receive { user }),
        1 => Just(Operation::Sweep),
        2 => (0..3_000u16).prop_map(|millis| Operation::AdvanceTime { millis }),
    ]
}

proptest! {
    /// Verify that operation results match between model and real implementation.
    #[test]
    fn prop_model_matches_real(ops in prop::collection::vec(operation_strategy(), 0..80)) {
        let mut model = ModelRelay::new();
        let mut real = RealRelay::new();

        for (i, op) in ops.iter().enumerate() {
            let model_result = model.apply(op);
            let real_result = real.apply(op);

            prop_assert_eq!(
                &model_result,
                &real_result,
                "Divergence at operation {}: {:?}",
                i,
                op
            );
        }

        prop_assert_eq!(model.observable_state(), real.observable_state());
        prop_assert_eq!(model.pending_count(), real.relay.pending_count().unwrap());
        prop_assert_eq!(
            Duration::from_millis(model.now_ms()),
            real.env.elapsed(),
            "Clock divergence"
        );
    }

    /// After a final sweep and a receive for every user, nothing is left.
    #[test]
    fn prop_everything_drains_eventually(ops in prop::collection::vec(operation_strategy(), 0..60)) {
        let mut real = RealRelay::new();
        for op in &ops {
            real.apply(op);
        }

        real.apply(&Operation::AdvanceTime { millis: 10_000 });
        real.apply(&Operation::Sweep);
        for user in 0..NUM_USERS {
            if let OperationResult::Delivered(messages) = real.apply(&Operation::Receive { user }) {
                prop_assert!(messages.iter().all(|m| !m.ciphertext.is_empty()));
            }
        }

        prop_assert_eq!(real.relay.pending_count().unwrap(), 0);
    }
}

#[test]
fn ttl_boundary_matches_model() {
    let ops = [
        Operation::Send {
            sender: 0,
            recipient: 1,
            content: SmallCiphertext { seed: 9, size_class: 1 },
            ttl_seconds: 1,
        },
        Operation::AdvanceTime { millis: 999 },
        Operation::Sweep,
        Operation::AdvanceTime { millis: 1 },
        Operation::Receive { user: 1 },
    ];

    let mut model = ModelRelay::new();
    let mut real = RealRelay::new();
    for op in &ops {
        assert_eq!(model.apply(op), real.apply(op), "{op:?}");
    }
    assert_eq!(model.pending_count(), 0);
}
