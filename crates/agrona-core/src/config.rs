//! Process-wide configuration and per-queue sizing configuration.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global toggle for `AtomicBuffer` bounds checking. Enabled by default.
static BOUNDS_CHECKS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Global toggle for strict alignment checking on `byte[]`-backed buffers.
/// Defaults to `true`: ordered/atomic access on a misaligned index is refused
/// rather than left to hardware-dependent behavior.
static STRICT_ALIGNMENT_CHECKS: AtomicBool = AtomicBool::new(true);

/// Returns whether `AtomicBuffer` accessors currently validate index and length.
#[must_use]
pub fn bounds_checks_enabled() -> bool {
    BOUNDS_CHECKS_ENABLED.load(Ordering::Relaxed)
}

/// Enables or disables bounds checking process-wide.
///
/// Disabling this removes a safety net relied on by every `AtomicBuffer`
/// consumer; only do so once a release build has been validated with checks
/// enabled.
pub fn set_bounds_checks_enabled(enabled: bool) {
    BOUNDS_CHECKS_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Returns whether ordered/atomic/CAS access requires width-aligned indices.
#[must_use]
pub fn strict_alignment_checks_enabled() -> bool {
    STRICT_ALIGNMENT_CHECKS.load(Ordering::Relaxed)
}

/// Enables or disables strict alignment checking process-wide.
///
/// With strict checks disabled, a misaligned ordered access on a `byte[]`-backed
/// buffer is hardware-dependent rather than a defined error.
pub fn set_strict_alignment_checks_enabled(enabled: bool) {
    STRICT_ALIGNMENT_CHECKS.store(enabled, Ordering::Relaxed);
}

/// Sizing and feature configuration for a bounded array queue.
///
/// One `Config` (capacity + max producers + metrics toggle) covers all three
/// queue variants; MPMC and SPSC simply ignore `max_producers`.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    capacity_pow2: u32,
    max_producers: usize,
    /// Whether to track send/receive/batch counters (adds a handful of atomic
    /// stores per batch; see [`crate::queue::Metrics`]).
    pub enable_metrics: bool,
}

/// A ring sized for high throughput: 64K slots, metrics disabled.
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(16, 8, false);

/// A ring sized for low latency: 1K slots, metrics enabled for observability.
pub const LOW_LATENCY_CONFIG: Config = Config::new(10, 1, true);

impl Config {
    /// Creates a configuration with capacity `2^capacity_pow2` slots.
    #[must_use]
    pub const fn new(capacity_pow2: u32, max_producers: usize, enable_metrics: bool) -> Self {
        Self {
            capacity_pow2,
            max_producers,
            enable_metrics,
        }
    }

    /// Number of slots in the ring; always a power of two.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        1usize << self.capacity_pow2
    }

    /// Mask used to wrap a monotonic sequence number into a slot index.
    #[must_use]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }

    /// Maximum number of producers an `Mpsc`/`Mpmc` may register.
    #[must_use]
    pub const fn max_producers(&self) -> usize {
        self.max_producers
    }
}

impl Default for Config {
    fn default() -> Self {
        // 64K slots, single producer, metrics off.
        Self::new(16, 1, false)
    }
}
