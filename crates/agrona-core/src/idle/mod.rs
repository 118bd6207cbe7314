//! Idle strategies for duty-cycle loops: how an [`crate::agent::Agent`] or
//! `AgentRunner` waits when a work cycle produced nothing.
//!
//! `BackoffIdleStrategy`'s state machine generalizes the familiar two-phase
//! `spin_loop` then `thread::yield_now` backoff into four explicit states
//! (`NotIdle → Spinning → Yielding → Parking`), adding `thread::park_timeout`
//! for the parking phase.

use crossbeam_utils::CachePadded;
use std::hint;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A strategy for waiting when a duty cycle observes no work.
///
/// `idle(work_count)` only actually waits when `work_count == 0`;
/// [`IdleStrategy::idle_once`] forces a wait unconditionally (the
/// `idle()`-with-no-argument overload in the reference API this is modeled
/// on becomes a provided method here, since Rust has no overloading).
pub trait IdleStrategy: Send {
    /// Idles if `work_count == 0`; otherwise a no-op that also resets any
    /// accumulated backoff state, since observed work means the caller is
    /// not idle.
    fn idle(&mut self, work_count: usize);

    /// Forces exactly one idle step regardless of work count.
    fn idle_once(&mut self) {
        self.idle(0);
    }

    /// Clears any accumulated backoff state back to its initial phase.
    fn reset(&mut self);

    /// A short, stable name for this strategy (for logging/metrics).
    fn alias(&self) -> &'static str;
}

/// Never waits; `idle` always returns immediately. Appropriate only when an
/// `Agent`'s `do_work` never legitimately returns zero for long.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpIdleStrategy;

impl IdleStrategy for NoOpIdleStrategy {
    fn idle(&mut self, _work_count: usize) {}
    fn reset(&mut self) {}
    fn alias(&self) -> &'static str {
        "noop"
    }
}

/// Spins on a CPU hint with no yielding; lowest latency, highest CPU cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinIdleStrategy;

impl IdleStrategy for BusySpinIdleStrategy {
    fn idle(&mut self, work_count: usize) {
        if work_count == 0 {
            hint::spin_loop();
        }
    }
    fn reset(&mut self) {}
    fn alias(&self) -> &'static str {
        "busy_spin"
    }
}

/// Yields to the OS scheduler instead of spinning.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldingIdleStrategy;

impl IdleStrategy for YieldingIdleStrategy {
    fn idle(&mut self, work_count: usize) {
        if work_count == 0 {
            thread::yield_now();
        }
    }
    fn reset(&mut self) {}
    fn alias(&self) -> &'static str {
        "yielding"
    }
}

/// Parks the thread for a fixed duration when idle.
#[derive(Debug, Clone, Copy)]
pub struct SleepingIdleStrategy {
    duration: Duration,
}

impl SleepingIdleStrategy {
    /// Creates a strategy that parks for `duration` on every idle call.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IdleStrategy for SleepingIdleStrategy {
    fn idle(&mut self, work_count: usize) {
        if work_count == 0 {
            thread::park_timeout(self.duration);
        }
    }
    fn reset(&mut self) {}
    fn alias(&self) -> &'static str {
        "sleeping"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackoffState {
    NotIdle,
    Spinning,
    Yielding,
    Parking,
}

/// A progressive wait: spin, then yield, then park with exponentially
/// increasing duration up to a cap. Resets to `NotIdle` the moment any work
/// is observed.
pub struct BackoffIdleStrategy {
    max_spins: u64,
    max_yields: u64,
    min_park: Duration,
    max_park: Duration,
    state: CachePadded<BackoffState>,
    count: CachePadded<u64>,
    current_park: CachePadded<Duration>,
}

impl BackoffIdleStrategy {
    /// Creates a strategy that spins up to `max_spins` times, then yields up
    /// to `max_yields` times, then parks starting at `min_park` and doubling
    /// (capped at `max_park`) on every subsequent idle call.
    #[must_use]
    pub fn new(max_spins: u64, max_yields: u64, min_park: Duration, max_park: Duration) -> Self {
        Self {
            max_spins,
            max_yields,
            min_park,
            max_park,
            state: CachePadded::new(BackoffState::NotIdle),
            count: CachePadded::new(0),
            current_park: CachePadded::new(min_park),
        }
    }
}

impl IdleStrategy for BackoffIdleStrategy {
    fn idle(&mut self, work_count: usize) {
        if work_count > 0 {
            self.reset();
            return;
        }
        match *self.state {
            BackoffState::NotIdle => {
                *self.state = BackoffState::Spinning;
                *self.count = 1;
                hint::spin_loop();
            }
            BackoffState::Spinning => {
                hint::spin_loop();
                *self.count += 1;
                if *self.count > self.max_spins {
                    *self.state = BackoffState::Yielding;
                    *self.count = 0;
                }
            }
            BackoffState::Yielding => {
                thread::yield_now();
                *self.count += 1;
                if *self.count > self.max_yields {
                    *self.state = BackoffState::Parking;
                    *self.current_park = self.min_park;
                }
            }
            BackoffState::Parking => {
                thread::park_timeout(*self.current_park);
                let doubled = self.current_park.saturating_mul(2);
                *self.current_park = doubled.min(self.max_park);
            }
        }
    }

    fn reset(&mut self) {
        *self.state = BackoffState::NotIdle;
        *self.count = 0;
        *self.current_park = self.min_park;
    }

    fn alias(&self) -> &'static str {
        "backoff"
    }
}

/// The four wait modes a [`ControllableIdleStrategy`] can be steered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ControlledStatus {
    /// Return immediately.
    NoOp = 0,
    /// Spin on a CPU hint.
    BusySpin = 1,
    /// Yield to the scheduler.
    Yield = 2,
    /// Park for a fixed duration.
    Park = 3,
}

impl ControlledStatus {
    fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::BusySpin,
            2 => Self::Yield,
            3 => Self::Park,
            _ => Self::NoOp,
        }
    }
}

/// An idle strategy whose behavior is steered at runtime by an external
/// `AtomicI32` status indicator, re-read on every call. Lets an operator (or
/// a supervising agent) dial a hot loop's aggressiveness up or down live.
pub struct ControllableIdleStrategy {
    status: Arc<AtomicI32>,
    park_duration: Duration,
}

impl ControllableIdleStrategy {
    /// Creates a strategy reading `status` on every `idle` call, parking for
    /// `park_duration` while the status reads [`ControlledStatus::Park`].
    #[must_use]
    pub fn new(status: Arc<AtomicI32>, park_duration: Duration) -> Self {
        Self { status, park_duration }
    }

    /// A handle to the shared status indicator, for a controller to update.
    #[must_use]
    pub fn status_handle(&self) -> Arc<AtomicI32> {
        Arc::clone(&self.status)
    }
}

impl IdleStrategy for ControllableIdleStrategy {
    fn idle(&mut self, work_count: usize) {
        if work_count > 0 {
            return;
        }
        match ControlledStatus::from_i32(self.status.load(Ordering::Relaxed)) {
            ControlledStatus::NoOp => {}
            ControlledStatus::BusySpin => hint::spin_loop(),
            ControlledStatus::Yield => thread::yield_now(),
            ControlledStatus::Park => thread::park_timeout(self.park_duration),
        }
    }

    fn reset(&mut self) {}

    fn alias(&self) -> &'static str {
        "controllable"
    }
}
