//! Controller time for the Crossroads scheduler.
//!
//! The scheduler never reads the system clock itself. Every tick is handed
//! a [`Timestamp`]: a monotonic offset from the moment the controller
//! started. Deadlines are plain `>=` comparisons between timestamps.
//!
//! # Design Principles
//!
//! - Timestamps are [`Duration`]s since controller start, so ordering and
//!   arithmetic are exact (no float comparison).
//! - All arithmetic saturates; a timestamp never wraps.
//! - The [`Clock`] trait lets the control loop run against real time
//!   ([`MonotonicClock`]) or a deterministic test clock ([`ManualClock`]).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A point in controller time, measured from controller start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The controller start instant.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Timestamp from whole seconds since controller start.
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Timestamp from milliseconds since controller start.
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Timestamp from fractional seconds. Returns `None` for negative,
    /// non-finite, or out-of-range values.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        Duration::try_from_secs_f64(secs).ok().map(Self)
    }

    /// Milliseconds since controller start, saturating at `u64::MAX`.
    pub fn as_millis(self) -> u64 {
        u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX)
    }

    /// This timestamp shifted forward by `offset`, saturating.
    pub fn saturating_add(self, offset: Duration) -> Self {
        Self(self.0.saturating_add(offset))
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "t+{:.3}s", self.0.as_secs_f64())
    }
}

/// A source of controller time.
pub trait Clock: Send + Sync {
    /// Return the current controller time.
    ///
    /// Successive calls must be non-decreasing.
    fn now(&self) -> Timestamp;
}

/// Real monotonic time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock whose zero is the current instant.
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }
}

/// A deterministic clock that only moves when told to.
///
/// Optionally advances by a fixed step after every read, which lets the
/// control loop be exercised at full speed with a realistic time axis.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in nanoseconds since start.
    nanos: AtomicU64,
    /// Nanoseconds added after each [`Clock::now`] read.
    step_nanos: u64,
}

impl ManualClock {
    /// A clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: AtomicU64::new(duration_nanos(start.0)),
            step_nanos: 0,
        }
    }

    /// A clock at `start` that moves forward by `step` after every read.
    pub fn stepping(start: Timestamp, step: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(duration_nanos(start.0)),
            step_nanos: duration_nanos(step),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, at: Timestamp) {
        self.nanos.store(duration_nanos(at.0), Ordering::Release);
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by = duration_nanos(by);
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(by))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let step = self.step_nanos;
        let current = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(step))
            })
            .unwrap_or_else(|n| n);
        Timestamp(Duration::from_nanos(current))
    }
}

/// Nanoseconds in `d`, saturating at `u64::MAX` (about 584 years).
fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
