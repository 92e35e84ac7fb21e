//! Simulated environment with a manually driven wall clock.
//!
//! Expiry is decided by [`Environment::wall_clock`], which in `SimEnv` only
//! moves when a test calls [`SimEnv::advance`]. Sleeping and the monotonic
//! clock go through tokio's timer, so a runtime started with
//! `start_paused = true` controls the reclaimer's schedule independently.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use vanish_core::{Environment, Timestamp};

/// Wall-clock time every new `SimEnv` starts at (2023-11-14T22:13:20Z).
pub const SIM_EPOCH: Timestamp = Timestamp::from_millis(1_700_000_000_000);

/// Deterministic environment for tests.
///
/// Clones share the same clock.
#[derive(Debug, Clone)]
pub struct SimEnv {
    wall_clock_ms: Arc<AtomicU64>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment whose wall clock reads [`SIM_EPOCH`].
    pub fn new() -> Self {
        Self::starting_at(SIM_EPOCH)
    }

    /// Environment whose wall clock reads `start`.
    pub fn starting_at(start: Timestamp) -> Self {
        Self { wall_clock_ms: Arc::new(AtomicU64::new(start.as_millis())) }
    }

    /// Move the wall clock forward.
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.wall_clock_ms.fetch_add(millis, Ordering::AcqRel);
    }

    /// Wall-clock time elapsed since [`SIM_EPOCH`].
    pub fn elapsed(&self) -> Duration {
        self.wall_clock() - SIM_EPOCH
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn wall_clock(&self) -> Timestamp {
        Timestamp::from_millis(self.wall_clock_ms.load(Ordering::Acquire))
    }
}
