//! Deterministic test harness for the Vanish relay.
//!
//! [`SimEnv`] replaces the system clock with one that only moves when a test
//! advances it, so TTL expiry and reclaimer sweeps are reproducible.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the relay.
//! Operations are applied to both the model and the real implementation, and
//! their results are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;

pub use model::{
    ModelMessage, ModelRelay, ModelUserId, ObservableState, Operation, OperationError,
    OperationResult, SmallCiphertext, key_bytes, user_name,
};
pub use sim_env::{SIM_EPOCH, SimEnv};
