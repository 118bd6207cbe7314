//! Single-producer, single-consumer bounded array queue.
//!
//! Cached sequence numbers avoid cross-core traffic on the hot path,
//! `UnsafeCell`-backed single-writer cache fields, `Box<[MaybeUninit<T>]>`
//! storage, and `crossbeam_utils::CachePadded` to keep the producer and
//! consumer cursors on separate cache lines.

use crate::config::Config;
use crate::error::QueueError;
use crate::queue::common::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_initialized_read,
    debug_assert_monotonic, Metrics, MetricsSnapshot,
};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A bounded single-producer/single-consumer queue.
///
/// `offer`/`poll` move one element at a time. `reserve`/`Reservation`
/// additionally expose a zero-copy batch path for callers who want to
/// amortize the release-store over many elements at once.
#[repr(C)]
pub struct Spsc<T> {
    tail: CachePadded<AtomicU64>,
    cached_head: CachePadded<UnsafeCell<u64>>,

    head: CachePadded<AtomicU64>,
    cached_tail: CachePadded<UnsafeCell<u64>>,

    closed: AtomicBool,
    metrics: Metrics,
    config: Config,

    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
}

// SAFETY: all shared mutation goes through the atomic head/tail protocol;
// `cached_head`/`cached_tail` are written only by the producer/consumer
// respectively, and `buffer` slots are exclusively owned by whichever side
// currently holds them per the head/tail window.
unsafe impl<T: Send> Send for Spsc<T> {}
unsafe impl<T: Send> Sync for Spsc<T> {}

impl<T> Spsc<T> {
    /// Creates a new queue with `config.capacity()` slots (rounded to a power of two).
    #[must_use]
    pub fn new(config: Config) -> Self {
        let capacity = config.capacity();
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, MaybeUninit::uninit);

        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            cached_head: CachePadded::new(UnsafeCell::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            cached_tail: CachePadded::new(UnsafeCell::new(0)),
            closed: AtomicBool::new(false),
            metrics: Metrics::new(),
            config,
            buffer: UnsafeCell::new(buffer.into_boxed_slice()),
        }
    }

    /// Number of slots in this queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// An estimate of the number of queued elements; not linearizable with
    /// concurrent `offer`/`poll`; treat the result as an estimate.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn size(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// True if no elements are currently queued. Not a linearizable
    /// guarantee against a concurrent producer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Relaxed)
    }

    /// True if the queue is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.size() >= self.capacity()
    }

    /// Marks the queue closed; producers should stop offering once closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// True once [`Spsc::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Attempts to enqueue one element. Returns `false` if the queue is full.
    #[allow(clippy::cast_possible_truncation)]
    pub fn offer(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);

        // SAFETY: `cached_head` has exactly one writer, this producer.
        let cached_head = unsafe { *self.cached_head.get() };
        if tail.wrapping_sub(cached_head) as usize >= self.capacity() {
            let head = self.head.load(Ordering::Acquire);
            // SAFETY: single-writer field, see above.
            unsafe { *self.cached_head.get() = head };
            if tail.wrapping_sub(head) as usize >= self.capacity() {
                return false;
            }
        }

        let idx = (tail as usize) & self.mask();
        // SAFETY: `idx` is within bounds; this slot lies beyond the
        // consumer's current `head`, so only the producer touches it until
        // the release-store below publishes it.
        unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[idx] = MaybeUninit::new(value);
        }

        let new_tail = tail.wrapping_add(1);
        let head = self.head.load(Ordering::Relaxed);
        debug_assert_bounded_count!(new_tail.wrapping_sub(head) as usize, self.capacity());
        debug_assert_monotonic!("tail", tail, new_tail);

        self.tail.store(new_tail, Ordering::Release);
        if self.config.enable_metrics {
            self.metrics.add_messages_sent(1);
        }
        true
    }

    /// Attempts to dequeue one element. Returns `None` if the queue is empty.
    #[allow(clippy::cast_possible_truncation)]
    pub fn poll(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        // SAFETY: `cached_tail` has exactly one writer, this consumer.
        let mut cached_tail = unsafe { *self.cached_tail.get() };
        if head == cached_tail {
            cached_tail = self.tail.load(Ordering::Acquire);
            // SAFETY: single-writer field, see above.
            unsafe { *self.cached_tail.get() = cached_tail };
            if head == cached_tail {
                return None;
            }
        }

        let idx = (head as usize) & self.mask();
        debug_assert_initialized_read!(head, head, cached_tail);
        // SAFETY: slot `idx` was published by the producer's release-store
        // of `tail`, observed here via the acquire-load above; only the
        // consumer reads it, and `assume_init_read` transfers ownership out
        // before `head` advances past it.
        let value = unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[idx].assume_init_read()
        };

        let new_head = head.wrapping_add(1);
        debug_assert_head_not_past_tail!(new_head, cached_tail);
        debug_assert_monotonic!("head", head, new_head);
        self.head.store(new_head, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_messages_received(1);
        }
        Some(value)
    }

    /// Enqueues `value`, returning [`QueueError::Full`] if there is no room.
    ///
    /// # Errors
    /// Returns [`QueueError::Full`] if the queue has no free slots.
    pub fn add(&self, value: T) -> Result<(), QueueError> {
        if self.offer(value) {
            Ok(())
        } else {
            Err(QueueError::Full)
        }
    }

    /// Dequeues one element, returning [`QueueError::Empty`] if none is available.
    ///
    /// # Errors
    /// Returns [`QueueError::Empty`] if the queue has no elements.
    pub fn remove(&self) -> Result<T, QueueError> {
        self.poll().ok_or(QueueError::Empty)
    }

    /// Reserves up to `n` contiguous slots for zero-copy writing.
    ///
    /// The returned [`Reservation`] may hold fewer than `n` slots if the
    /// request would otherwise wrap past the end of the backing array;
    /// check [`Reservation::len`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn reserve(&self, n: usize) -> Option<Reservation<'_, T>> {
        if n == 0 || n > self.capacity() {
            return None;
        }

        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: single-writer field.
        let cached_head = unsafe { *self.cached_head.get() };
        let space = self
            .capacity()
            .saturating_sub(tail.wrapping_sub(cached_head) as usize);

        if space >= n {
            return Some(self.make_reservation(tail, n));
        }

        let head = self.head.load(Ordering::Acquire);
        // SAFETY: single-writer field; the acquire-load above synchronizes
        // with the consumer's release-store of `head`.
        unsafe { *self.cached_head.get() = head };
        let space = self.capacity().saturating_sub(tail.wrapping_sub(head) as usize);
        if space < n {
            return None;
        }
        Some(self.make_reservation(tail, n))
    }

    fn make_reservation(&self, tail: u64, n: usize) -> Reservation<'_, T> {
        let mask = self.mask();
        let idx = (tail as usize) & mask;
        let contiguous = n.min(self.capacity() - idx);
        // SAFETY: slots `[idx, idx + contiguous)` lie beyond the consumer's
        // current `head`; only this producer writes them until `commit`
        // publishes the new `tail`.
        let slice = unsafe {
            let buffer = &mut *self.buffer.get();
            &mut buffer[idx..idx + contiguous]
        };
        Reservation::new(slice, self)
    }

    pub(crate) fn commit_internal(&self, n: usize) {
        let tail = self.tail.load(Ordering::Relaxed);
        let new_tail = tail.wrapping_add(n as u64);
        let head = self.head.load(Ordering::Relaxed);
        debug_assert_bounded_count!(new_tail.wrapping_sub(head) as usize, self.capacity());
        debug_assert_monotonic!("tail", tail, new_tail);
        self.tail.store(new_tail, Ordering::Release);
        if self.config.enable_metrics {
            self.metrics.add_messages_sent(n as u64);
            self.metrics.add_batches_sent(1);
        }
    }

    /// Drains all currently available elements through `handler`, advancing
    /// `head` once at the end instead of once per element.
    ///
    /// Returns the number of elements handled.
    #[allow(clippy::cast_possible_truncation)]
    pub fn drain<F>(&self, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let avail = tail.wrapping_sub(head) as usize;
        if avail == 0 {
            return 0;
        }

        let mask = self.mask();
        let mut pos = head;
        while pos != tail {
            debug_assert_initialized_read!(pos, head, tail);
            let idx = (pos as usize) & mask;
            // SAFETY: slots in `[head, tail)` were published by the
            // producer's release-store of `tail`; only the consumer reads
            // them before `head` advances.
            let item = unsafe {
                let buffer = &mut *self.buffer.get();
                buffer[idx].assume_init_read()
            };
            handler(item);
            pos = pos.wrapping_add(1);
        }

        self.head.store(tail, Ordering::Release);
        if self.config.enable_metrics {
            self.metrics.add_messages_received(avail as u64);
            self.metrics.add_batches_received(1);
        }
        avail
    }

    /// Drains up to `limit` elements through `handler`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn drain_to<F>(&self, limit: usize, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        if limit == 0 {
            return 0;
        }
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let avail = tail.wrapping_sub(head) as usize;
        if avail == 0 {
            return 0;
        }

        let to_consume = avail.min(limit);
        let mask = self.mask();
        let mut pos = head;
        let mut count = 0;
        while count < to_consume {
            debug_assert_initialized_read!(pos, head, tail);
            let idx = (pos as usize) & mask;
            // SAFETY: see `drain`.
            let item = unsafe {
                let buffer = &mut *self.buffer.get();
                buffer[idx].assume_init_read()
            };
            handler(item);
            pos = pos.wrapping_add(1);
            count += 1;
        }

        self.head.store(head.wrapping_add(count as u64), Ordering::Release);
        if self.config.enable_metrics {
            self.metrics.add_messages_received(count as u64);
            self.metrics.add_batches_received(1);
        }
        count
    }

    /// Returns a snapshot of this queue's metrics, or the default (all
    /// zeroes) snapshot if metrics were never enabled.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl<T> Drop for Spsc<T> {
    fn drop(&mut self) {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let count = tail.wrapping_sub(head) as usize;
        if count == 0 {
            return;
        }
        let mask = self.mask();
        let buffer = self.buffer.get_mut();
        for i in 0..count {
            let idx = (head as usize).wrapping_add(i) & mask;
            // SAFETY: slots `[head, tail)` hold initialized elements that
            // were never consumed; drop them in place exactly once.
            unsafe { ptr::drop_in_place(buffer[idx].as_mut_ptr()) };
        }
    }
}

/// A zero-copy reservation of contiguous slots for batched writes into a [`Spsc`].
pub struct Reservation<'a, T> {
    slice: &'a mut [MaybeUninit<T>],
    queue: &'a Spsc<T>,
}

impl<'a, T> Reservation<'a, T> {
    fn new(slice: &'a mut [MaybeUninit<T>], queue: &'a Spsc<T>) -> Self {
        Self { slice, queue }
    }

    /// The reserved slots, to be initialized with `MaybeUninit::write`.
    pub fn as_mut_slice(&mut self) -> &mut [MaybeUninit<T>] {
        self.slice
    }

    /// Number of slots actually reserved (may be less than requested).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    /// True if this reservation holds no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Publishes all reserved slots to the consumer.
    pub fn commit(self) {
        let len = self.slice.len();
        self.commit_n(len);
    }

    /// Publishes the first `n` reserved slots to the consumer.
    ///
    /// # Panics
    /// Panics if `n` exceeds the number of reserved slots.
    pub fn commit_n(self, n: usize) {
        assert!(n <= self.slice.len(), "cannot commit more than reserved");
        self.queue.commit_internal(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_poll_round_trip() {
        let q = Spsc::<u64>::new(Config::new(2, 1, false));
        assert!(q.offer(1));
        assert!(q.offer(2));
        assert!(q.offer(3));
        assert!(q.offer(4));
        assert!(!q.offer(5), "4-slot queue should be full after 4 offers");
        assert_eq!(q.poll(), Some(1));
        assert_eq!(q.poll(), Some(2));
        assert!(q.offer(5));
        assert_eq!(q.poll(), Some(3));
        assert_eq!(q.poll(), Some(4));
        assert_eq!(q.poll(), Some(5));
        assert_eq!(q.poll(), None);
    }

    #[test]
    fn add_remove_use_queue_error() {
        let q = Spsc::<u64>::new(Config::new(1, 1, false));
        q.add(1).unwrap();
        assert!(matches!(q.add(2).unwrap_err(), QueueError::Full));
        assert_eq!(q.remove().unwrap(), 1);
        assert!(matches!(q.remove().unwrap_err(), QueueError::Empty));
    }

    #[test]
    fn drain_consumes_everything_with_one_head_store() {
        let q = Spsc::<u64>::new(Config::new(4, 1, false));
        for i in 0..10 {
            q.offer(i);
        }
        let mut sum = 0;
        let n = q.drain(|v| sum += v);
        assert_eq!(n, 10);
        assert_eq!(sum, 45);
        assert!(q.is_empty());
    }

    #[test]
    fn drain_to_respects_limit() {
        let q = Spsc::<u64>::new(Config::new(4, 1, false));
        for i in 0..10 {
            q.offer(i);
        }
        let mut seen = Vec::new();
        let n = q.drain_to(3, |v| seen.push(v));
        assert_eq!(n, 3);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(q.size(), 7);
    }

    #[test]
    fn reservation_batches_a_release_store() {
        let q = Spsc::<u64>::new(Config::new(4, 1, false));
        if let Some(mut r) = q.reserve(4) {
            let slice = r.as_mut_slice();
            for (i, slot) in slice.iter_mut().enumerate() {
                slot.write(i as u64 * 10);
            }
            r.commit();
        }
        assert_eq!(q.size(), 4);
        assert_eq!(q.poll(), Some(0));
        assert_eq!(q.poll(), Some(10));
    }

    #[test]
    fn drop_releases_unconsumed_elements() {
        use std::sync::atomic::AtomicUsize;
        static DROPS: AtomicUsize = AtomicUsize::new(0);
        struct Counted;
        impl Drop for Counted {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }
        DROPS.store(0, Ordering::SeqCst);
        {
            let q = Spsc::<Counted>::new(Config::new(2, 1, false));
            q.offer(Counted);
            q.offer(Counted);
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn metrics_disabled_by_default_yields_zero_snapshot() {
        let q = Spsc::<u64>::new(Config::new(2, 1, false));
        q.offer(1);
        assert_eq!(q.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn metrics_enabled_counts_sends_and_receives() {
        let q = Spsc::<u64>::new(Config::new(2, 1, true));
        q.offer(1);
        q.offer(2);
        q.poll();
        let snap = q.metrics();
        assert_eq!(snap.messages_sent, 2);
        assert_eq!(snap.messages_received, 1);
    }
}
