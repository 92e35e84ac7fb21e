//! Expiry reclaimer.
//!
//! Background task that periodically evicts envelopes whose TTL has elapsed,
//! independent of any receive call. It competes with request handlers for the
//! same per-recipient locks through [`MailboxStore::purge_expired`], so an
//! expired envelope is removed exactly once whichever side gets there first.
//!
//! The loop never stops on its own: a failed sweep is logged and the next one
//! runs after the regular interval. It stops only when its
//! [`ReclaimerHandle`] is shut down or dropped.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    env::Environment,
    mailbox::{MailboxStore, StoreError},
};

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Reclaimer configuration.
#[derive(Debug, Clone)]
pub struct ReclaimerConfig {
    /// Time between the end of one sweep and the start of the next.
    ///
    /// A tunable, not a correctness parameter: expired envelopes are never
    /// delivered regardless of how long they linger.
    pub interval: Duration,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_SWEEP_INTERVAL }
    }
}

/// Reclaimer errors.
#[derive(Error, Debug)]
pub enum ReclaimerError {
    /// One sweep failed. Isolated to that pass.
    #[error("expiry sweep failed: {0}")]
    Sweep(#[from] StoreError),

    /// The background task panicked or was aborted.
    #[error("reclaimer task failed: {0}")]
    Task(String),
}

/// Diagnostic tallies. Both are plain counters with no ordering against the
/// store, so every access is `Relaxed`.
#[derive(Default)]
struct SweepCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Periodic expiry sweeper over a [`MailboxStore`].
pub struct ExpiryReclaimer<E, S>
where
    E: Environment,
    S: MailboxStore,
{
    env: E,
    store: S,
    config: ReclaimerConfig,
}

impl<E, S> ExpiryReclaimer<E, S>
where
    E: Environment,
    S: MailboxStore,
{
    /// Create a reclaimer. Nothing runs until [`spawn`](Self::spawn).
    pub fn new(env: E, store: S, config: ReclaimerConfig) -> Self {
        Self { env, store, config }
    }

    /// Run a single sweep now. Returns the number of envelopes removed.
    pub fn sweep(&self) -> Result<usize, ReclaimerError> {
        let now = self.env.wall_clock();
        Ok(self.store.purge_expired(now)?)
    }

    /// Start the sweep loop on the current tokio runtime.
    ///
    /// Consumes the reclaimer, so one reclaimer can never run twice.
    pub fn spawn(self) -> ReclaimerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(SweepCounters::default());
        let task = tokio::spawn(self.run(shutdown_rx, Arc::clone(&counters)));

        ReclaimerHandle { shutdown: shutdown_tx, task, counters }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>, counters: Arc<SweepCounters>) {
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "expiry reclaimer started"
        );

        loop {
            tokio::select! {
                biased;
                // A shutdown signal and a dropped handle both end the loop.
                _ = shutdown.changed() => break,
                () = self.env.sleep(self.config.interval) => {},
            }

            let started = self.env.now();
            match self.sweep() {
                Ok(0) => tracing::debug!("no expired envelopes to reclaim"),
                Ok(removed) => {
                    let elapsed = self.env.now() - started;
                    tracing::info!(
                        removed,
                        elapsed_us = elapsed.as_micros() as u64,
                        "reclaimed expired envelopes"
                    );
                },
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %e, "expiry sweep failed, retrying next interval");
                },
            }
            counters.completed.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!("expiry reclaimer stopped");
    }
}

/// Handle to a running reclaimer task.
///
/// Dropping the handle stops the loop at its next wake-up; call
/// [`shutdown`](Self::shutdown) to stop it and wait for the task to finish.
pub struct ReclaimerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    counters: Arc<SweepCounters>,
}

impl ReclaimerHandle {
    /// Number of sweeps run so far, failed ones included.
    pub fn completed_sweeps(&self) -> u64 {
        self.counters.completed.load(Ordering::Relaxed)
    }

    /// Number of sweeps that failed.
    pub fn failed_sweeps(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// The task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop to stop and wait for it.
    ///
    /// A sweep already in progress completes first; no sweep starts after
    /// this returns.
    pub async fn shutdown(self) -> Result<(), ReclaimerError> {
        if self.shutdown.send(true).is_err() {
            tracing::debug!("expiry reclaimer already stopped");
        }

        self.task.await.map_err(|e| ReclaimerError::Task(e.to_string()))
    }
}

impl std::fmt::Debug for ReclaimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReclaimerHandle")
            .field("completed_sweeps", &self.completed_sweeps())
            .field("failed_sweeps", &self.failed_sweeps())
            .field("finished", &self.is_finished())
            .finish()
    }
}
