//! Many-producer, many-consumer bounded array queue: Dmitry Vyukov's
//! sequenced bounded queue.
//!
//! A `try_claim`/CAS/`Acquire`/`Release` design: a per-slot sequence tag
//! (`seq == tail` to claim a write, `seq == head + 1` to claim a read,
//! `sequences[idx] = head + capacity` to recycle a slot) instead of a
//! separate completion tracker.

use crate::config::Config;
use crate::error::QueueError;
use crate::queue::common::{Metrics, MetricsSnapshot};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A bounded multi-producer/multi-consumer queue, wait-free per operation
/// (bounded CAS retries under contention) and linearizable with respect to
/// successful CAS order.
pub struct Mpmc<T> {
    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
    sequences: Box<[AtomicU64]>,
    tail: CachePadded<AtomicU64>,
    head: CachePadded<AtomicU64>,
    closed: AtomicBool,
    metrics: Metrics,
    config: Config,
}

unsafe impl<T: Send> Send for Mpmc<T> {}
unsafe impl<T: Send> Sync for Mpmc<T> {}

impl<T> Mpmc<T> {
    /// Creates a new queue with `config.capacity()` slots.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let capacity = config.capacity();
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, MaybeUninit::uninit);
        let sequences = (0..capacity).map(|i| AtomicU64::new(i as u64)).collect();

        Self {
            buffer: UnsafeCell::new(buffer.into_boxed_slice()),
            sequences,
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            closed: AtomicBool::new(false),
            metrics: Metrics::new(),
            config,
        }
    }

    /// Number of slots in this queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// An estimate of the number of queued elements, double-reading `head`
    /// to bound a racing consumer.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn size(&self) -> usize {
        loop {
            let head_before = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            let head_after = self.head.load(Ordering::Acquire);
            if head_before == head_after {
                let estimate = tail.wrapping_sub(head_before) as i64;
                return estimate.clamp(0, self.capacity() as i64) as usize;
            }
        }
    }

    /// Marks the queue closed; producers should stop offering once closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// True once [`Mpmc::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Attempts to enqueue one element. Returns `false` if the queue is full.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn offer(&self, value: T) -> bool {
        let mut value = Some(value);
        let mask = self.mask();
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            let idx = (tail as usize) & mask;
            let seq = self.sequences[idx].load(Ordering::Acquire);
            let diff = seq as i64 - tail as i64;

            if diff == 0 {
                if self
                    .tail
                    .compare_exchange_weak(tail, tail.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    // SAFETY: winning this CAS is the unique claim on slot
                    // `idx` for this production cycle; the sequence
                    // release-store below is what makes it visible to a
                    // consumer.
                    unsafe {
                        let buffer = &mut *self.buffer.get();
                        buffer[idx] = MaybeUninit::new(value.take().unwrap());
                    }
                    self.sequences[idx].store(tail.wrapping_add(1), Ordering::Release);
                    if self.config.enable_metrics {
                        self.metrics.add_messages_sent(1);
                    }
                    return true;
                }
            } else if diff < 0 {
                return false;
            }
            // diff > 0: another producer already advanced this slot's
            // sequence past `tail`; reload and retry.
        }
    }

    /// Attempts to dequeue one element. Returns `None` if the queue is empty.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn poll(&self) -> Option<T> {
        let mask = self.mask();
        loop {
            let head = self.head.load(Ordering::Relaxed);
            let idx = (head as usize) & mask;
            let seq = self.sequences[idx].load(Ordering::Acquire);
            let diff = seq as i64 - (head.wrapping_add(1)) as i64;

            if diff == 0 {
                if self
                    .head
                    .compare_exchange_weak(head, head.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    // SAFETY: winning this CAS is the unique claim on slot
                    // `idx` for this consumption cycle; the acquire-load of
                    // `seq` above synchronized with the producer's
                    // release-store that published it.
                    let item = unsafe {
                        let buffer = &mut *self.buffer.get();
                        buffer[idx].assume_init_read()
                    };
                    self.sequences[idx]
                        .store(head.wrapping_add(self.capacity() as u64), Ordering::Release);
                    if self.config.enable_metrics {
                        self.metrics.add_messages_received(1);
                    }
                    return Some(item);
                }
            } else if diff < 0 {
                return None;
            }
        }
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

    /// Repeatedly polls, handing each element to `handler`, up to `limit` or
    /// the first empty observation.
    pub fn drain<F>(&self, limit: usize, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        let mut count = 0;
        while count < limit {
            match self.poll() {
                Some(value) => {
                    handler(value);
                    count += 1;
                }
                None => break,
            }
        }
        if self.config.enable_metrics && count > 0 {
            self.metrics.add_batches_received(1);
        }
        count
    }

    /// Returns a snapshot of this queue's metrics, or the default (zeroed)
    /// snapshot if metrics were never enabled.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl<T> Drop for Mpmc<T> {
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
            // SAFETY: slots claimed-but-unconsumed in `[head, tail)` hold
            // initialized elements (an in-flight concurrent offer/poll
            // cannot race `Drop`, since `Drop` requires exclusive `&mut self`).
            unsafe { std::ptr::drop_in_place(buffer[idx].as_mut_ptr()) };
        }
    }
}
