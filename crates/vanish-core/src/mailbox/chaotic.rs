//! Chaotic mailbox wrapper for fault injection testing
//!
//! Store wrapper that randomly fails operations to test error handling and
//! recovery. Used for chaos testing to ensure the relay and the reclaimer
//! handle store failures gracefully.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use super::{Drained, MailboxStore, StoreError};
use crate::{
    env::Timestamp,
    envelope::{Envelope, EnvelopeId},
};

/// Chaotic store wrapper that randomly injects failures
///
/// Delegates to an underlying store but fails operations with the configured
/// probability. A failed operation never reaches the inner store, so it
/// leaves every queue untouched, matching the [`MailboxStore`] contract.
#[derive(Clone)]
pub struct ChaoticMailboxStore<S: MailboxStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operation counter
    operation_count: Arc<AtomicUsize>,
    /// Injected failure counter
    failure_count: Arc<AtomicUsize>,
}

/// Simple deterministic RNG for chaos injection
///
/// Linear congruential generator so chaos runs are reproducible with the same
/// seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: MailboxStore> ChaoticMailboxStore<S> {
    /// Create a new chaotic wrapper with a fixed seed
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
            failure_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of store operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Number of operations that were failed on purpose.
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Count the operation and decide whether it fails.
    fn inject(&self, operation: &str) -> Result<(), StoreError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let roll = self.rng.lock().unwrap_or_else(PoisonError::into_inner).next();
        if roll < self.failure_rate {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::Unavailable(format!(
                "chaotic failure injection during {operation}"
            )));
        }

        Ok(())
    }
}

impl<S: MailboxStore> MailboxStore for ChaoticMailboxStore<S> {
    fn append_with<F>(&self, recipient: &str, build: F) -> Result<EnvelopeId, StoreError>
    where
        F: FnOnce() -> Envelope,
    {
        self.inject("append")?;
        self.inner.append_with(recipient, build)
    }

    fn drain_deliverable(&self, recipient: &str, now: Timestamp) -> Result<Drained, StoreError> {
        self.inject("drain")?;
        self.inner.drain_deliverable(recipient, now)
    }

    fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError> {
        self.inject("purge")?;
        self.inner.purge_expired(now)
    }

    fn pending_count(&self) -> Result<usize, StoreError> {
        self.inject("count")?;
        self.inner.pending_count()
    }
}
