//! Clock abstractions: epoch-millisecond, monotonic-nanosecond, and
//! epoch-nanosecond time sources, plus cached and offset-derived variants
//! that amortize a slow system call across many readers.
//!
//! Built on `std::time::{Instant, SystemTime}`, preferring direct atomics
//! over trait-object indirection on any hot path — the cached clocks are
//! plain `Atomic*` cells, not `dyn Clock` objects.

mod snowflake;

pub use snowflake::SnowflakeIdGenerator;

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time in milliseconds since the Unix epoch.
pub trait EpochClock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn time_millis(&self) -> i64;
}

/// A source of monotonic (never-decreasing, epoch-agnostic) nanoseconds.
pub trait NanoClock: Send + Sync {
    /// Current monotonic time in nanoseconds. Only differences between two
    /// calls are meaningful; the absolute value has no epoch relationship.
    fn nanos(&self) -> u64;
}

/// A source of wall-clock time in nanoseconds since the Unix epoch.
pub trait EpochNanoClock: Send + Sync {
    /// Current time in nanoseconds since the Unix epoch.
    fn epoch_nanos(&self) -> i64;
}

/// Delegates directly to [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEpochClock;

impl EpochClock for SystemEpochClock {
    fn time_millis(&self) -> i64 {
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is after the Unix epoch")
            .as_millis() as i64
    }
}

fn process_start() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

/// Delegates to [`Instant`], measured relative to this process's start.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNanoClock;

impl NanoClock for SystemNanoClock {
    fn nanos(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation)]
        process_start().elapsed().as_nanos() as u64
    }
}

/// An [`EpochClock`] holding a timestamp some other thread updates via a
/// release-store, so many readers can each acquire-load it instead of making
/// a system call.
#[derive(Debug, Default)]
pub struct CachedEpochClock {
    millis: AtomicI64,
}

impl CachedEpochClock {
    /// Creates a clock reading `0` until the first [`CachedEpochClock::update`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            millis: AtomicI64::new(0),
        }
    }

    /// Publishes a new timestamp for subsequent readers.
    pub fn update(&self, millis: i64) {
        self.millis.store(millis, Ordering::Release);
    }
}

impl EpochClock for CachedEpochClock {
    fn time_millis(&self) -> i64 {
        self.millis.load(Ordering::Acquire)
    }
}

/// A [`NanoClock`] holding a timestamp some other thread updates via a
/// release-store.
#[derive(Debug, Default)]
pub struct CachedNanoClock {
    nanos: AtomicU64,
}

impl CachedNanoClock {
    /// Creates a clock reading `0` until the first [`CachedNanoClock::update`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    /// Publishes a new timestamp for subsequent readers.
    pub fn update(&self, nanos: u64) {
        self.nanos.store(nanos, Ordering::Release);
    }
}

impl NanoClock for CachedNanoClock {
    fn nanos(&self) -> u64 {
        self.nanos.load(Ordering::Acquire)
    }
}

/// An [`EpochNanoClock`] derived from an [`EpochClock`] (coarse, epoch-anchored)
/// and a [`NanoClock`] (fine-grained, monotonic but epoch-agnostic): it samples
/// the offset between the two by bracketing an epoch-millis read with
/// nano-clock reads immediately before and after, keeping the narrowest
/// bracket across `max_samples` attempts, then resamples after
/// `resample_interval` elapses to track wall-clock drift (NTP slew, etc).
pub struct OffsetEpochNanoClock<E, N> {
    epoch_clock: E,
    nano_clock: N,
    max_samples: usize,
    resample_interval: Duration,
    offset_nanos: AtomicI64,
    last_sample_nanos: AtomicU64,
}

impl<E: EpochClock, N: NanoClock> OffsetEpochNanoClock<E, N> {
    /// Builds the clock and takes its first offset sample immediately.
    #[must_use]
    pub fn new(epoch_clock: E, nano_clock: N, max_samples: usize, resample_interval: Duration) -> Self {
        let clock = Self {
            epoch_clock,
            nano_clock,
            max_samples: max_samples.max(1),
            resample_interval,
            offset_nanos: AtomicI64::new(0),
            last_sample_nanos: AtomicU64::new(0),
        };
        clock.resample();
        clock
    }

    fn resample(&self) {
        let mut best_window = u64::MAX;
        let mut best_offset = 0i64;
        for _ in 0..self.max_samples {
            let n0 = self.nano_clock.nanos();
            let ms = self.epoch_clock.time_millis();
            let n1 = self.nano_clock.nanos();
            let window = n1.saturating_sub(n0);
            if window < best_window {
                best_window = window;
                let mid_nanos = n0 + window / 2;
                #[allow(clippy::cast_possible_wrap)]
                let epoch_nanos = ms.saturating_mul(1_000_000);
                best_offset = epoch_nanos - i64::try_from(mid_nanos).unwrap_or(i64::MAX);
            }
        }
        self.offset_nanos.store(best_offset, Ordering::Release);
        self.last_sample_nanos.store(self.nano_clock.nanos(), Ordering::Release);
    }

    /// Samples taken since construction that produced the currently cached offset.
    #[must_use]
    pub fn cached_offset_nanos(&self) -> i64 {
        self.offset_nanos.load(Ordering::Acquire)
    }
}

impl<E: EpochClock, N: NanoClock> EpochNanoClock for OffsetEpochNanoClock<E, N> {
    fn epoch_nanos(&self) -> i64 {
        let last = self.last_sample_nanos.load(Ordering::Acquire);
        let now = self.nano_clock.nanos();
        if Duration::from_nanos(now.saturating_sub(last)) > self.resample_interval {
            self.resample();
        }
        let offset = self.offset_nanos.load(Ordering::Acquire);
        i64::try_from(now).unwrap_or(i64::MAX).saturating_add(offset)
    }
}
