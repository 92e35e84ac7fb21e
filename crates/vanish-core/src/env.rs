//! Environment abstraction for deterministic testing.
//!
//! Decouples relay logic from the system clock. Production code uses real
//! monotonic and wall-clock time; tests use a simulated clock that only moves
//! when told to, so TTL expiry can be exercised without waiting.

use std::{fmt, time::Duration};

/// Wall-clock instant in milliseconds since the Unix epoch.
///
/// Envelope creation and expiry times are expressed in this unit. It is
/// totally ordered, so expiry checks are plain comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Timestamp from milliseconds since the Unix epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Seconds since the Unix epoch, with millisecond precision.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Timestamp `duration` later, saturating at `u64::MAX` milliseconds.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

/// Elapsed time between two timestamps, zero if `rhs` is later.
impl std::ops::Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `wall_clock()` is the clock used for envelope creation and expiry; all
///   components sharing a store must share one environment
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use `tokio::time::Instant` so paused-clock tests control
    /// it.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic). Used for measuring work, never for expiry.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it is only used by the
    /// reclaimer loop.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Current wall-clock time.
    fn wall_clock(&self) -> Timestamp;
}
