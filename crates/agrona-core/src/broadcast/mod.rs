//! Single-transmitter, multi-receiver broadcast buffer.
//!
//! One transmitter publishes fixed-slot records to any number of
//! unsynchronized receivers; a receiver that falls too far behind is told so
//! (loss) rather than allowed to block the transmitter. A seqlock-ring
//! design: a `write_seq` claim, a per-reader cursor, and overrun recovery
//! when a reader is lapped.
//!
//! # Record layout
//! Each of `num_slots` fixed-size slots holds:
//! ```text
//! sequenceIndicator: i64   (offset 0)
//! length:            i32   (offset 8)
//! typeId:            i32   (offset 12)
//! payload:           [u8]  (offset 16, up to record_size - 16 bytes)
//! ```
//! A trailer immediately after the last slot holds:
//! ```text
//! latestCounter:     i64   (offset 0)
//! recordSize:        i32   (offset 8)
//! ```

use crate::buffer::AtomicBuffer;
use crate::error::BroadcastError;
use crate::handler::{ControlledAction, ControlledMessageHandler, MessageHandler};
use std::sync::atomic::{fence, Ordering};

/// Bytes occupied by `sequenceIndicator`, `length`, and `typeId` at the start
/// of every slot.
pub const RECORD_HEADER_LENGTH: usize = 16;
/// Bytes occupied by the trailer (`latestCounter` + `recordSize`, padded to 8).
pub const TRAILER_LENGTH: usize = 16;

const TRAILER_RECORD_SIZE_OFFSET: usize = 8;

fn slot_layout(total_capacity: usize, record_size: usize) -> Result<(usize, usize, usize), BroadcastError> {
    if record_size < RECORD_HEADER_LENGTH || record_size % 8 != 0 {
        return Err(BroadcastError::InvalidRecordSize(record_size));
    }
    if total_capacity < TRAILER_LENGTH {
        return Err(BroadcastError::InvalidCapacity {
            capacity: total_capacity,
            record_size,
        });
    }
    let capacity = total_capacity - TRAILER_LENGTH;
    let num_slots = capacity / record_size.max(1);
    if capacity == 0 || capacity % record_size != 0 || !num_slots.is_power_of_two() {
        return Err(BroadcastError::InvalidCapacity { capacity, record_size });
    }
    Ok((capacity, num_slots, num_slots - 1))
}

/// The single writer side of a broadcast buffer.
///
/// Not `Sync`: exactly one thread (or one `Transmitter` handle) may publish
/// into a given buffer. Construct one `Transmitter` per buffer and share its
/// memory with receivers via [`AtomicBuffer`] views over the same region.
pub struct Transmitter<'a> {
    buffer: AtomicBuffer<'a>,
    record_size: usize,
    mask: usize,
    latest_counter_offset: usize,
    next: u64,
}

impl<'a> Transmitter<'a> {
    /// Initializes `buffer` as a fresh broadcast buffer with slots of
    /// `record_size` bytes (including the 16-byte record header) and takes
    /// ownership of it as the transmitter.
    ///
    /// # Errors
    /// Returns [`BroadcastError::InvalidRecordSize`] if `record_size` is not
    /// a multiple of 8 bytes or too small to hold the header, or
    /// [`BroadcastError::InvalidCapacity`] if `buffer.capacity()` minus the
    /// trailer is not an exact power-of-two multiple of `record_size`.
    pub fn new(buffer: AtomicBuffer<'a>, record_size: usize) -> Result<Self, BroadcastError> {
        let (capacity, _num_slots, mask) = slot_layout(buffer.capacity(), record_size)?;
        let latest_counter_offset = capacity;
        buffer.put_i32_plain(latest_counter_offset + TRAILER_RECORD_SIZE_OFFSET, record_size as i32)?;
        buffer.put_i64_release(latest_counter_offset, 0)?;
        Ok(Self {
            buffer,
            record_size,
            mask,
            latest_counter_offset,
            next: 0,
        })
    }

    /// Maximum payload length this buffer's slots can hold.
    #[must_use]
    pub fn max_payload_length(&self) -> usize {
        self.record_size - RECORD_HEADER_LENGTH
    }

    /// The sequence number that will be assigned to the next transmission.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next
    }

    /// Broadcasts one record: claims a slot, writes the header and payload,
    /// then commits.
    ///
    /// # Errors
    /// Returns [`BroadcastError::InvalidTypeId`] if `type_id < 1`, or
    /// [`BroadcastError::PayloadTooLarge`] if `payload.len()` exceeds
    /// [`Transmitter::max_payload_length`].
    pub fn transmit(&mut self, type_id: i32, payload: &[u8]) -> Result<(), BroadcastError> {
        if type_id < 1 {
            return Err(BroadcastError::InvalidTypeId(type_id));
        }
        let max = self.max_payload_length();
        if payload.len() > max {
            return Err(BroadcastError::PayloadTooLarge {
                length: payload.len(),
                max,
                record_size: self.record_size,
            });
        }

        let s = self.next;
        let idx = (s as usize) & self.mask;
        let slot_offset = idx * self.record_size;

        // 1. Claim the slot: mark it in-flight for sequence `s`.
        self.buffer.put_i64_opaque(slot_offset, s as i64)?;
        // 2. Release fence: the claim above must be visible before the
        //    payload writes that follow.
        fence(Ordering::Release);
        // 3. Write length, typeId, payload.
        #[allow(clippy::cast_possible_truncation)]
        self.buffer.put_i32_plain(slot_offset + 8, payload.len() as i32)?;
        self.buffer.put_i32_plain(slot_offset + 12, type_id)?;
        self.buffer.put_bytes(slot_offset + RECORD_HEADER_LENGTH, payload)?;
        // 4. Commit: publish the record as readable at sequence `s`.
        #[allow(clippy::cast_possible_wrap)]
        self.buffer.put_i64_release(slot_offset, s.wrapping_add(1) as i64)?;
        // 5. Advance the trailer so new receivers can tail-follow.
        #[allow(clippy::cast_possible_wrap)]
        self.buffer
            .put_i64_release(self.latest_counter_offset, s.wrapping_add(1) as i64)?;

        self.next = s.wrapping_add(1);
        Ok(())
    }

    /// Opens a second view over this transmitter's underlying memory, for
    /// handing to a [`Receiver`] in the same process.
    ///
    /// # Safety
    /// The returned buffer aliases this transmitter's storage; it must be
    /// dropped (or otherwise stop being used) before `self` is, and only
    /// [`Receiver`]'s read-only access pattern may be performed through it.
    #[must_use]
    pub unsafe fn shared_view(&self) -> AtomicBuffer<'a> {
        let (ptr, len) = unsafe { self.buffer.raw_parts() };
        unsafe { AtomicBuffer::wrap_ptr(ptr, len) }
    }
}

/// One outcome of [`Receiver::receive_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A record was available; `offset`/`length` locate its payload in the
    /// underlying buffer and must be read before any further call to
    /// `receive_next`, then confirmed with [`Receiver::validate`].
    Available {
        /// Byte offset of the payload (past the record header).
        offset: usize,
        /// Payload length in bytes.
        length: usize,
        /// Application-assigned message type.
        type_id: i32,
    },
    /// No new record has been published since the last call.
    NotAvailable,
    /// The transmitter lapped this receiver; the payload is the number of
    /// records skipped, and the cursor has been repositioned to the newest
    /// record this receiver can still see — not the oldest, which the
    /// transmitter has already overwritten.
    Lost(u64),
}

/// One reader of a broadcast buffer. Not `Sync`: each reader owns its cursor
/// and must not be shared across threads without external synchronization.
pub struct Receiver<'a> {
    buffer: AtomicBuffer<'a>,
    record_size: usize,
    mask: usize,
    latest_counter_offset: usize,
    next_record: u64,
    lost_count: u64,
    pending_validation: Option<(usize, u64)>,
}

impl<'a> Receiver<'a> {
    /// Opens `buffer` (already initialized by a [`Transmitter`]) as a reader,
    /// tail-following: the cursor starts at the transmitter's current
    /// position, so the receiver only observes records published from now on.
    ///
    /// # Errors
    /// Returns [`BroadcastError::InvalidCapacity`] if the trailer's recorded
    /// `recordSize` does not evenly divide the buffer into a power-of-two
    /// number of slots.
    pub fn new(buffer: AtomicBuffer<'a>) -> Result<Self, BroadcastError> {
        let total = buffer.capacity();
        if total < TRAILER_LENGTH {
            return Err(BroadcastError::InvalidCapacity {
                capacity: total,
                record_size: 0,
            });
        }
        let trailer_record_size_offset_guess = total.saturating_sub(TRAILER_LENGTH);
        let record_size =
            buffer.get_i32_plain(trailer_record_size_offset_guess + TRAILER_RECORD_SIZE_OFFSET)? as usize;
        let (_capacity, _num_slots, mask) = slot_layout(total, record_size)?;
        let latest_counter_offset = trailer_record_size_offset_guess;
        let next_record = buffer.get_i64_acquire(latest_counter_offset)? as u64;

        Ok(Self {
            buffer,
            record_size,
            mask,
            latest_counter_offset,
            next_record,
            lost_count: 0,
            pending_validation: None,
        })
    }

    /// Total records this receiver has determined it missed.
    #[must_use]
    pub fn lost_count(&self) -> u64 {
        self.lost_count
    }

    /// This receiver's current cursor (sequence number of the next record it
    /// expects to read).
    #[must_use]
    pub fn next_record(&self) -> u64 {
        self.next_record
    }

    /// Attempts to read the next record.
    ///
    /// On [`ReceiveOutcome::Available`], the caller must copy out the
    /// payload (e.g. via [`Receiver::copy_payload`]) and then call
    /// [`Receiver::validate`] before trusting it: the transmitter may have
    /// lapped and overwritten the slot mid-read.
    pub fn receive_next(&mut self) -> ReceiveOutcome {
        let idx = (self.next_record as usize) & self.mask;
        let slot_offset = idx * self.record_size;
        let seq = self
            .buffer
            .get_i64_acquire(slot_offset)
            .expect("slot_offset computed from validated layout is always in range") as u64;
        let expected = self.next_record.wrapping_add(1);

        if seq == expected {
            let length = self
                .buffer
                .get_i32_plain(slot_offset + 8)
                .expect("slot_offset computed from validated layout is always in range") as usize;
            let type_id = self
                .buffer
                .get_i32_plain(slot_offset + 12)
                .expect("slot_offset computed from validated layout is always in range");
            self.pending_validation = Some((slot_offset, expected));
            self.next_record = expected;
            ReceiveOutcome::Available {
                offset: slot_offset + RECORD_HEADER_LENGTH,
                length,
                type_id,
            }
        } else if seq > expected {
            let lost = (seq - 1) - self.next_record;
            self.lost_count += lost;
            self.next_record = seq.wrapping_sub(1);
            self.pending_validation = None;
            ReceiveOutcome::Lost(lost)
        } else {
            ReceiveOutcome::NotAvailable
        }
    }

    /// Copies `length` bytes of the most recently received payload at
    /// `offset` into `dst`. Intended to be called between
    /// [`Receiver::receive_next`] and [`Receiver::validate`].
    ///
    /// # Errors
    /// Returns [`BroadcastError::Buffer`] if `offset + dst.len()` is out of range.
    pub fn copy_payload(&self, offset: usize, dst: &mut [u8]) -> Result<(), BroadcastError> {
        self.buffer.get_bytes(offset, dst)?;
        Ok(())
    }

    /// Confirms the record most recently exposed by [`Receiver::receive_next`]
    /// was not overwritten by the transmitter while it was being read.
    ///
    /// Returns `false` (rather than panicking) if called with no pending
    /// record, or after a [`ReceiveOutcome::Lost`]/`NotAvailable` result.
    pub fn validate(&self) -> bool {
        let Some((slot_offset, expected)) = self.pending_validation else {
            return false;
        };
        fence(Ordering::Acquire);
        let seq = self
            .buffer
            .get_i64_opaque(slot_offset)
            .expect("slot_offset computed from validated layout is always in range") as u64;
        seq == expected
    }

    /// Jumps this receiver's cursor to the transmitter's current position,
    /// recording every skipped transmission as lost. Useful when a receiver
    /// has been idle and wants to resynchronize without replaying a long
    /// loss sequence one record at a time.
    pub fn keep_up_with_transmitter(&mut self) {
        let latest = self
            .buffer
            .get_i64_acquire(self.latest_counter_offset)
            .expect("latest_counter_offset computed from validated layout is always in range")
            as u64;
        if latest > self.next_record {
            self.lost_count += latest - self.next_record;
            self.next_record = latest;
        }
        self.pending_validation = None;
    }

    /// Delivers up to `limit` available records to `handler`, one call to
    /// [`MessageHandler::on_message`] per record.
    ///
    /// Each record is copied into a scratch buffer and confirmed with
    /// [`Receiver::validate`] before `handler` sees it; a record the
    /// transmitter overwrote mid-copy is silently skipped rather than handed
    /// to `handler` half-written. A [`ReceiveOutcome::Lost`] gap is also
    /// skipped (it still counts toward [`Receiver::lost_count`]). Stops
    /// early on [`ReceiveOutcome::NotAvailable`].
    ///
    /// Returns the number of records delivered to `handler`.
    pub fn receive_handled<H>(&mut self, limit: usize, handler: &mut H) -> usize
    where
        H: for<'h> MessageHandler<'h>,
    {
        let mut delivered = 0;
        let mut scratch = Vec::new();
        while delivered < limit {
            match self.receive_next() {
                ReceiveOutcome::Available { offset, length, type_id } => {
                    scratch.resize(length, 0);
                    if self.copy_payload(offset, &mut scratch).is_ok() && self.validate() {
                        handler.on_message(type_id, &scratch, 0, length);
                        delivered += 1;
                    }
                }
                ReceiveOutcome::Lost(_) => {}
                ReceiveOutcome::NotAvailable => break,
            }
        }
        delivered
    }

    /// Drives a controlled read loop off `handler`, mapping each
    /// [`ControlledAction`] it returns onto cursor advancement:
    ///
    /// - `Continue`: the message is consumed; keep reading.
    /// - `Break`: the message is consumed; stop reading after it.
    /// - `Commit`: the message is consumed for accounting purposes, but the
    ///   cursor is rewound so the next call re-reads the same record —
    ///   useful for peeking without losing the message.
    /// - `Abort`: stop immediately; the cursor (and loss count) are rewound
    ///   to their state before this record was read, as if `receive_next`
    ///   had not been called.
    ///
    /// As in [`Receiver::receive_handled`], a record is copied and validated
    /// before `handler` sees it, and a record that fails validation or a
    /// [`ReceiveOutcome::Lost`] gap is skipped without invoking `handler`.
    ///
    /// Returns the number of records delivered to `handler`.
    pub fn receive_controlled<H>(&mut self, limit: usize, handler: &mut H) -> usize
    where
        H: for<'h> ControlledMessageHandler<'h>,
    {
        let mut delivered = 0;
        let mut scratch = Vec::new();
        while delivered < limit {
            let before_next_record = self.next_record;
            let before_lost_count = self.lost_count;
            let before_pending = self.pending_validation;

            match self.receive_next() {
                ReceiveOutcome::Available { offset, length, type_id } => {
                    scratch.resize(length, 0);
                    if self.copy_payload(offset, &mut scratch).is_err() || !self.validate() {
                        continue;
                    }
                    match handler.on_message(type_id, &scratch, 0, length) {
                        ControlledAction::Continue => {
                            delivered += 1;
                        }
                        ControlledAction::Break => {
                            delivered += 1;
                            break;
                        }
                        ControlledAction::Commit => {
                            delivered += 1;
                            self.next_record = before_next_record;
                            self.lost_count = before_lost_count;
                            self.pending_validation = before_pending;
                        }
                        ControlledAction::Abort => {
                            self.next_record = before_next_record;
                            self.lost_count = before_lost_count;
                            self.pending_validation = before_pending;
                            break;
                        }
                    }
                }
                ReceiveOutcome::Lost(_) => {}
                ReceiveOutcome::NotAvailable => break,
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A transmitter and its receivers need two live `AtomicBuffer`s over one
    // allocation; tests leak the backing storage to get a `'static` region
    // rather than threading lifetimes through a helper. Production callers
    // get the same effect via `Transmitter::shared_view` or separate mmap
    // opens of the same file.
    fn leaked_buffer(total: usize) -> AtomicBuffer<'static> {
        let storage: &'static mut [u8] = Box::leak(vec![0u8; total].into_boxed_slice());
        unsafe { AtomicBuffer::wrap_slice(storage) }
    }

    #[test]
    fn transmit_receive_round_trip() {
        let record_size = 32;
        let num_slots = 4;
        let buf = leaked_buffer(num_slots * record_size + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, record_size).unwrap();
        let rx_buf = unsafe { tx.shared_view() };
        let mut rx = Receiver::new(rx_buf).unwrap();

        tx.transmit(7, b"hello").unwrap();

        match rx.receive_next() {
            ReceiveOutcome::Available { offset, length, type_id } => {
                assert_eq!(type_id, 7);
                assert_eq!(length, 5);
                let mut dst = [0u8; 5];
                rx.copy_payload(offset, &mut dst).unwrap();
                assert!(rx.validate());
                assert_eq!(&dst, b"hello");
            }
            other => panic!("expected Available, got {other:?}"),
        }
        assert_eq!(rx.receive_next(), ReceiveOutcome::NotAvailable);
    }

    #[test]
    fn rejects_type_id_below_one() {
        let buf = leaked_buffer(4 * 32 + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, 32).unwrap();
        assert_eq!(tx.transmit(0, b"x"), Err(BroadcastError::InvalidTypeId(0)));
    }

    #[test]
    fn rejects_oversized_payload() {
        let buf = leaked_buffer(4 * 32 + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, 32).unwrap();
        let payload = vec![0u8; 17]; // max is 32 - 16 = 16
        assert_eq!(
            tx.transmit(1, &payload),
            Err(BroadcastError::PayloadTooLarge {
                length: 17,
                max: 16,
                record_size: 32,
            })
        );
    }

    #[test]
    fn rejects_non_power_of_two_slot_count() {
        let buf = leaked_buffer(3 * 32 + TRAILER_LENGTH); // 3 slots, not pow2
        assert!(matches!(
            Transmitter::new(buf, 32),
            Err(BroadcastError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn slow_receiver_detects_loss() {
        let record_size = 32;
        let num_slots = 2;
        let buf = leaked_buffer(num_slots * record_size + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, record_size).unwrap();
        let rx_buf = unsafe { tx.shared_view() };
        let mut rx = Receiver::new(rx_buf).unwrap();

        // Lap the 2-slot ring completely before the receiver reads anything.
        for i in 0..5u8 {
            tx.transmit(1, &[i]).unwrap();
        }

        match rx.receive_next() {
            ReceiveOutcome::Lost(n) => assert!(n > 0, "expected at least one lost record"),
            other => panic!("expected Lost, got {other:?}"),
        }
        assert!(rx.lost_count() > 0);
    }

    #[test]
    fn keep_up_with_transmitter_jumps_cursor_and_counts_loss() {
        let record_size = 32;
        let num_slots = 4;
        let buf = leaked_buffer(num_slots * record_size + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, record_size).unwrap();
        let rx_buf = unsafe { tx.shared_view() };
        let mut rx = Receiver::new(rx_buf).unwrap();

        for i in 0..3u8 {
            tx.transmit(1, &[i]).unwrap();
        }
        rx.keep_up_with_transmitter();
        assert_eq!(rx.next_record(), 3);
        assert_eq!(rx.lost_count(), 3);
        assert_eq!(rx.receive_next(), ReceiveOutcome::NotAvailable);
    }

    struct RecordingHandler {
        seen: Vec<(i32, Vec<u8>)>,
    }

    impl<'a> MessageHandler<'a> for RecordingHandler {
        fn on_message(&mut self, type_id: i32, buffer: &'a [u8], offset: usize, length: usize) {
            self.seen.push((type_id, buffer[offset..offset + length].to_vec()));
        }
    }

    #[test]
    fn receive_handled_delivers_every_available_record() {
        let record_size = 32;
        let num_slots = 4;
        let buf = leaked_buffer(num_slots * record_size + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, record_size).unwrap();
        let rx_buf = unsafe { tx.shared_view() };
        let mut rx = Receiver::new(rx_buf).unwrap();

        tx.transmit(1, b"a").unwrap();
        tx.transmit(2, b"bb").unwrap();
        tx.transmit(3, b"ccc").unwrap();

        let mut handler = RecordingHandler { seen: Vec::new() };
        let delivered = rx.receive_handled(10, &mut handler);

        assert_eq!(delivered, 3);
        assert_eq!(
            handler.seen,
            vec![
                (1, b"a".to_vec()),
                (2, b"bb".to_vec()),
                (3, b"ccc".to_vec()),
            ]
        );
    }

    struct StopAfterSecond {
        seen: Vec<i32>,
    }

    impl<'a> ControlledMessageHandler<'a> for StopAfterSecond {
        fn on_message(&mut self, type_id: i32, _buffer: &'a [u8], _offset: usize, _length: usize) -> ControlledAction {
            self.seen.push(type_id);
            if self.seen.len() == 2 {
                ControlledAction::Break
            } else {
                ControlledAction::Continue
            }
        }
    }

    #[test]
    fn receive_controlled_stops_on_break() {
        let record_size = 32;
        let num_slots = 4;
        let buf = leaked_buffer(num_slots * record_size + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, record_size).unwrap();
        let rx_buf = unsafe { tx.shared_view() };
        let mut rx = Receiver::new(rx_buf).unwrap();

        tx.transmit(1, b"a").unwrap();
        tx.transmit(2, b"b").unwrap();
        tx.transmit(3, b"c").unwrap();

        let mut handler = StopAfterSecond { seen: Vec::new() };
        let delivered = rx.receive_controlled(10, &mut handler);

        assert_eq!(delivered, 2);
        assert_eq!(handler.seen, vec![1, 2]);
        // The third record is still there for a later call.
        assert_eq!(rx.receive_next(), ReceiveOutcome::Available { offset: 3 * record_size + RECORD_HEADER_LENGTH, length: 1, type_id: 3 });
    }

    struct AlwaysCommit {
        calls: usize,
    }

    impl<'a> ControlledMessageHandler<'a> for AlwaysCommit {
        fn on_message(&mut self, _type_id: i32, _buffer: &'a [u8], _offset: usize, _length: usize) -> ControlledAction {
            self.calls += 1;
            if self.calls < 3 {
                ControlledAction::Commit
            } else {
                ControlledAction::Break
            }
        }
    }

    #[test]
    fn receive_controlled_commit_rereads_same_record() {
        let record_size = 32;
        let num_slots = 4;
        let buf = leaked_buffer(num_slots * record_size + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, record_size).unwrap();
        let rx_buf = unsafe { tx.shared_view() };
        let mut rx = Receiver::new(rx_buf).unwrap();

        tx.transmit(1, b"a").unwrap();

        let before = rx.next_record();
        let mut handler = AlwaysCommit { calls: 0 };
        let delivered = rx.receive_controlled(10, &mut handler);

        assert_eq!(delivered, 3);
        assert_eq!(handler.calls, 3);
        // The first two calls rewound (Commit); the final Break consumed the
        // record for good, so the cursor ends one past where it started.
        assert_eq!(rx.next_record(), before.wrapping_add(1));
    }

    struct AbortImmediately;

    impl<'a> ControlledMessageHandler<'a> for AbortImmediately {
        fn on_message(&mut self, _type_id: i32, _buffer: &'a [u8], _offset: usize, _length: usize) -> ControlledAction {
            ControlledAction::Abort
        }
    }

    #[test]
    fn receive_controlled_abort_rewinds_cursor() {
        let record_size = 32;
        let num_slots = 4;
        let buf = leaked_buffer(num_slots * record_size + TRAILER_LENGTH);
        let mut tx = Transmitter::new(buf, record_size).unwrap();
        let rx_buf = unsafe { tx.shared_view() };
        let mut rx = Receiver::new(rx_buf).unwrap();

        tx.transmit(1, b"a").unwrap();
        let before = rx.next_record();

        let delivered = rx.receive_controlled(10, &mut AbortImmediately);

        assert_eq!(delivered, 0);
        assert_eq!(rx.next_record(), before);
        assert_eq!(rx.receive_next(), ReceiveOutcome::Available { offset: RECORD_HEADER_LENGTH, length: 1, type_id: 1 });
    }
}
