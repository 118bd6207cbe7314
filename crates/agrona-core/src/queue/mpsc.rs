//! Many-producer, single-consumer bounded array queue.
//!
//! A shared-ring CAS design: producers race a CAS on a single `tail`, and a
//! per-slot `ready` flag lets the consumer distinguish "not yet published"
//! from "empty" the way a null-sentinel array would, without requiring `T`
//! to have a null representation.
//!
//! Producer registration is a `fetch_add`-then-check-then-`fetch_sub`-rollback
//! against `config.max_producers()`, gating how many [`Producer`] handles may
//! exist concurrently.

use crate::config::Config;
use crate::error::QueueError;
use crate::queue::common::{
    debug_assert_bounded_count, debug_assert_monotonic, Metrics, MetricsSnapshot,
};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// A bounded multi-producer/single-consumer queue.
pub struct Mpsc<T> {
    tail: AtomicU64,
    head: AtomicU64,
    ready: Box<[AtomicBool]>,
    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
    producer_count: AtomicUsize,
    closed: AtomicBool,
    metrics: Metrics,
    config: Config,
}

unsafe impl<T: Send> Send for Mpsc<T> {}
unsafe impl<T: Send> Sync for Mpsc<T> {}

impl<T> Mpsc<T> {
    /// Creates a new queue with `config.capacity()` slots and
    /// `config.max_producers()` registrable producer slots.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let capacity = config.capacity();
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, MaybeUninit::uninit);
        let ready = (0..capacity).map(|_| AtomicBool::new(false)).collect();

        Self {
            tail: AtomicU64::new(0),
            head: AtomicU64::new(0),
            ready,
            buffer: UnsafeCell::new(buffer.into_boxed_slice()),
            producer_count: AtomicUsize::new(0),
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

    #[allow(clippy::cast_possible_truncation)]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// An estimate of the number of queued elements: `tail - head`,
    /// double-reading `head` to bound a racing consumer.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn size(&self) -> usize {
        loop {
            let head_before = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            let head_after = self.head.load(Ordering::Acquire);
            if head_before == head_after {
                let estimate = tail.wrapping_sub(head_before) as usize;
                return estimate.min(self.capacity());
            }
        }
    }

    /// True if the queue currently holds no elements. Not linearizable
    /// against a concurrent producer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let idx = (self.head.load(Ordering::Relaxed) as usize) & self.mask();
        !self.ready[idx].load(Ordering::Acquire)
    }

    /// Marks the queue closed; producers should stop offering once closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// True once [`Mpsc::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Registers a new producer handle, failing if `config.max_producers()`
    /// handles are already registered or the queue is closed.
    ///
    /// # Errors
    /// Returns [`QueueError::Full`] if the producer limit is reached, or
    /// [`QueueError::InvalidArgument`] if the queue is closed.
    pub fn register(&self) -> Result<Producer<'_, T>, QueueError> {
        if self.is_closed() {
            return Err(QueueError::InvalidArgument("queue is closed"));
        }
        let id = self.producer_count.fetch_add(1, Ordering::SeqCst);
        if id >= self.config.max_producers() {
            self.producer_count.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Full);
        }
        Ok(Producer { queue: self })
    }

    /// Attempts to enqueue one element via CAS on `tail`. Returns `false` if full.
    #[allow(clippy::cast_possible_truncation)]
    pub fn offer(&self, value: T) -> bool {
        let mut value = Some(value);
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            let head = self.head.load(Ordering::Acquire);
            if tail.wrapping_sub(head) as usize >= self.capacity() {
                return false;
            }
            if self
                .tail
                .compare_exchange_weak(tail, tail.wrapping_add(1), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                let idx = (tail as usize) & self.mask();
                // SAFETY: this producer alone owns slot `idx` after winning
                // the CAS on `tail`, until the `ready` release-store below
                // publishes it to the consumer.
                unsafe {
                    let buffer = &mut *self.buffer.get();
                    buffer[idx] = MaybeUninit::new(value.take().unwrap());
                }
                debug_assert_monotonic!("tail", tail, tail.wrapping_add(1));
                self.ready[idx].store(true, Ordering::Release);
                if self.config.enable_metrics {
                    self.metrics.add_messages_sent(1);
                }
                return true;
            }
        }
    }

    /// Dequeues one element. Returns `None` if the slot at `head` has not
    /// been published yet, even if `tail > head` — a producer may have
    /// claimed the slot but not yet written it.
    #[allow(clippy::cast_possible_truncation)]
    pub fn poll(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let idx = (head as usize) & self.mask();
        if !self.ready[idx].load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: `ready[idx]` observed `true` via an acquire-load that
        // synchronizes with the producer's release-store after writing the
        // slot; only this (single) consumer reads it.
        let value = unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[idx].assume_init_read()
        };
        self.ready[idx].store(false, Ordering::Release);
        let new_head = head.wrapping_add(1);
        debug_assert_bounded_count!(
            self.tail.load(Ordering::Relaxed).wrapping_sub(new_head) as usize,
            self.capacity()
        );
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

    /// Dequeues one element, returning [`QueueError::Empty`] if none is ready.
    ///
    /// # Errors
    /// Returns [`QueueError::Empty`] if no element is currently published.
    pub fn remove(&self) -> Result<T, QueueError> {
        self.poll().ok_or(QueueError::Empty)
    }

    /// Repeatedly polls, handing each element to `handler`, storing `head`
    /// once per element to keep the producer-visible cache line warm.
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

impl<T> Drop for Mpsc<T> {
    fn drop(&mut self) {
        let mask = self.mask();
        let buffer = self.buffer.get_mut();
        for (idx, ready) in self.ready.iter().enumerate() {
            if *ready.get_mut() {
                // SAFETY: `ready[idx]` true means this slot holds an
                // initialized, unconsumed element.
                unsafe { std::ptr::drop_in_place(buffer[idx & mask].as_mut_ptr()) };
            }
        }
    }
}

/// A registered producer handle for an [`Mpsc`] queue.
///
/// Dropping the handle releases its slot against `config.max_producers()`.
pub struct Producer<'a, T> {
    queue: &'a Mpsc<T>,
}

impl<T> Producer<'_, T> {
    /// Offers one element through the owning queue.
    pub fn offer(&self, value: T) -> bool {
        self.queue.offer(value)
    }
}

impl<T> Drop for Producer<'_, T> {
    fn drop(&mut self) {
        self.queue.producer_count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_poll_round_trip() {
        let q = Mpsc::<u64>::new(Config::new(2, 4, false));
        assert!(q.offer(1));
        assert!(q.offer(2));
        assert_eq!(q.poll(), Some(1));
        assert_eq!(q.poll(), Some(2));
        assert_eq!(q.poll(), None);
    }

    #[test]
    fn queue_rejects_offers_past_capacity() {
        let q = Mpsc::<u64>::new(Config::new(1, 1, false));
        assert!(q.offer(1));
        assert!(q.offer(2));
        assert!(!q.offer(3));
    }

    #[test]
    fn two_producers_interleave_without_loss() {
        use std::sync::Arc;
        use std::thread;

        let q = Arc::new(Mpsc::<u64>::new(Config::new(10, 2, false)));
        let q1 = Arc::clone(&q);
        let q2 = Arc::clone(&q);

        let t1 = thread::spawn(move || {
            for i in 0..500u64 {
                while !q1.offer(i) {
                    std::hint::spin_loop();
                }
            }
        });
        let t2 = thread::spawn(move || {
            for i in 500..1000u64 {
                while !q2.offer(i) {
                    std::hint::spin_loop();
                }
            }
        });
        t1.join().unwrap();
        t2.join().unwrap();

        let mut received = Vec::new();
        while received.len() < 1000 {
            if let Some(v) = q.poll() {
                received.push(v);
            }
        }
        received.sort_unstable();
        assert_eq!(received, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn register_respects_max_producers() {
        let q = Mpsc::<u64>::new(Config::new(2, 1, false));
        let p1 = q.register().unwrap();
        assert!(matches!(q.register().unwrap_err(), QueueError::Full));
        drop(p1);
        assert!(q.register().is_ok());
    }

    #[test]
    fn drain_stops_at_limit_or_first_gap() {
        let q = Mpsc::<u64>::new(Config::new(4, 1, false));
        q.offer(1);
        q.offer(2);
        q.offer(3);
        let mut seen = Vec::new();
        let n = q.drain(2, |v| seen.push(v));
        assert_eq!(n, 2);
        assert_eq!(seen, vec![1, 2]);
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
            let q = Mpsc::<Counted>::new(Config::new(2, 1, false));
            q.offer(Counted);
            q.offer(Counted);
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
    }
}
