//! Snowflake-style unique id generator.
//!
//! A single packed `AtomicU64` CAS loop: no trait-object indirection on the
//! hot path, with a spin-wait for the sequence-saturation case where the
//! generator must wait for the next millisecond.

use super::EpochClock;
use crate::error::SnowflakeError;
use std::hint;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generates 64-bit, roughly time-sortable, globally-unique ids from a
/// `[timestamp | nodeId | sequence]` bit layout.
///
/// The packed CAS word stores `[timestamp | 0-filled nodeId slot | sequence]`
/// — `nodeId` is constant per generator and OR'd in only on the successful
/// return path, so incrementing the sequence can never accidentally bleed
/// into the node-id bits.
pub struct SnowflakeIdGenerator<C> {
    node_id_bits: u32,
    sequence_bits: u32,
    node_id: u64,
    timestamp_offset_ms: i64,
    clock: C,
    packed: AtomicU64,
}

impl<C: EpochClock> SnowflakeIdGenerator<C> {
    /// Builds a generator, validating the bit budget and node id range.
    ///
    /// # Errors
    /// Returns [`SnowflakeError::InvalidConfig`] if `node_id_bits +
    /// sequence_bits > 22`, if `node_id` does not fit in `node_id_bits`, or
    /// if `timestamp_offset_ms` is negative or later than the clock's
    /// current reading.
    pub fn new(
        node_id_bits: u32,
        sequence_bits: u32,
        node_id: u64,
        timestamp_offset_ms: i64,
        clock: C,
    ) -> Result<Self, SnowflakeError> {
        if node_id_bits + sequence_bits > 22 {
            return Err(SnowflakeError::InvalidConfig(
                "nodeIdBits + sequenceBits must be <= 22",
            ));
        }
        let max_node_id = (1u64 << node_id_bits) - 1;
        if node_id > max_node_id {
            return Err(SnowflakeError::InvalidConfig(
                "nodeId must be in [0, 2^nodeIdBits - 1]",
            ));
        }
        if timestamp_offset_ms < 0 {
            return Err(SnowflakeError::InvalidConfig("timestampOffsetMs must be >= 0"));
        }
        if timestamp_offset_ms > clock.time_millis() {
            return Err(SnowflakeError::InvalidConfig(
                "timestampOffsetMs must be <= now()",
            ));
        }

        Ok(Self {
            node_id_bits,
            sequence_bits,
            node_id,
            timestamp_offset_ms,
            clock,
            packed: AtomicU64::new(0),
        })
    }

    fn timestamp_shift(&self) -> u32 {
        self.node_id_bits + self.sequence_bits
    }

    fn max_sequence(&self) -> u64 {
        (1u64 << self.sequence_bits) - 1
    }

    /// Relative timestamp (current epoch millis minus `timestamp_offset_ms`).
    ///
    /// # Errors
    /// Propagates if the underlying subtraction would be negative; callers
    /// see this surfaced as [`SnowflakeError::ClockWentBackwards`] from
    /// [`SnowflakeIdGenerator::next_id`] instead, since a negative relative
    /// timestamp can only mean the clock moved backwards relative to
    /// `timestamp_offset_ms` itself.
    fn relative_now(&self) -> u64 {
        let now = self.clock.time_millis();
        u64::try_from(now - self.timestamp_offset_ms).unwrap_or(0)
    }

    /// Generates the next id, spin-waiting internally if the current
    /// millisecond's sequence space is exhausted.
    ///
    /// # Errors
    /// Returns [`SnowflakeError::ClockWentBackwards`] if the clock ever
    /// reports a relative timestamp earlier than the last id generated.
    pub fn next_id(&self) -> Result<i64, SnowflakeError> {
        let shift = self.timestamp_shift();
        let max_sequence = self.max_sequence();

        loop {
            let old = self.packed.load(Ordering::Acquire);
            let old_ts = old >> shift;
            let now = self.relative_now();

            if now > old_ts {
                let candidate = now << shift;
                if self
                    .packed
                    .compare_exchange(old, candidate, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return Ok(self.finish(candidate));
                }
            } else if now == old_ts {
                let sequence = old & max_sequence;
                if sequence < max_sequence {
                    let candidate = old + 1;
                    if self
                        .packed
                        .compare_exchange(old, candidate, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return Ok(self.finish(candidate));
                    }
                } else {
                    hint::spin_loop();
                }
            } else {
                #[allow(clippy::cast_possible_wrap)]
                return Err(SnowflakeError::ClockWentBackwards {
                    now: now as i64,
                    last: old_ts as i64,
                });
            }
        }
    }

    fn finish(&self, candidate: u64) -> i64 {
        #[allow(clippy::cast_possible_wrap)]
        ((candidate | (self.node_id << self.sequence_bits)) as i64)
    }
}
