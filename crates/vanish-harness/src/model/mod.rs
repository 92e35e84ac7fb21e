//! Reference model for model-based testing.
//!
//! Operations are applied to both [`ModelRelay`] and a real `RelayService`;
//! their results and observable states must agree after every step.

mod operation;
mod relay;

pub use operation::{
    ModelMessage, ModelUserId, Operation, OperationError, OperationResult, SmallCiphertext,
    user_name,
};
pub use relay::{ModelRelay, ObservableState, key_bytes};
