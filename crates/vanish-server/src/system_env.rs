//! Production Environment implementation using system time.
//!
//! `SystemEnv` is the production implementation of the Environment trait:
//! `std::time::Instant` for measuring work, `SystemTime` for envelope
//! timestamps, and tokio for sleeping between reclaimer sweeps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use vanish_core::{Environment, Timestamp};

/// Production environment using system time.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> Timestamp {
        // A clock set before 1970 reads as the epoch.
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::from_millis(u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
    }

    #[test]
    fn wall_clock_is_after_2020() {
        let env = SystemEnv::new();
        assert!(env.wall_clock() > Timestamp::from_millis(1_577_836_800_000));
    }

    #[tokio::test]
    async fn system_env_sleep_works() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(50)).await;
        let elapsed = env.now() - start;

        assert!(elapsed >= Duration::from_millis(50), "Sleep should wait at least 50ms");
    }
}
