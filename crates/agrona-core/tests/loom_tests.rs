//! Loom-based concurrency tests for the SPSC cursor protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores thread interleavings to find concurrency bugs
//! that only show up under specific scheduling. It replaces `std`'s atomics
//! and thread primitives with its own instrumented versions, so it cannot run
//! against the real `Spsc` directly (that type is built on `std::sync`
//! unconditionally); instead this models the same cached-cursor protocol
//! implemented in `queue::spsc` at a capacity small enough for loom's state
//! space to stay tractable.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::cell::UnsafeCell;

/// Single-producer single-consumer cursor protocol under test: a producer
/// advances `tail` with a release-store after writing a slot; a consumer
/// advances `head` with a release-store after reading one.
struct LoomSpsc {
    /// Written only by the producer.
    tail: AtomicU64,
    /// Written only by the consumer.
    head: AtomicU64,
    buffer: UnsafeCell<[u64; 4]>,
    capacity: usize,
}

unsafe impl Send for LoomSpsc {}
unsafe impl Sync for LoomSpsc {}

impl LoomSpsc {
    fn new() -> Self {
        Self {
            tail: AtomicU64::new(0),
            head: AtomicU64::new(0),
            buffer: UnsafeCell::new([0; 4]),
            capacity: 4,
        }
    }

    fn mask(&self) -> usize {
        self.capacity - 1
    }

    fn push(&self, value: u64) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        let space = self.capacity.saturating_sub((tail - head) as usize);
        if space == 0 {
            return false;
        }

        let idx = (tail as usize) & self.mask();

        // SAFETY: space > 0, so this slot lies beyond the consumer's head.
        unsafe {
            (*self.buffer.get())[idx] = value;
        }

        self.tail.store(tail + 1, Ordering::Release);
        true
    }

    fn pop(&self) -> Option<u64> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let idx = (head as usize) & self.mask();

        // SAFETY: tail > head, so this slot holds a published value.
        let value = unsafe { (*self.buffer.get())[idx] };

        self.head.store(head + 1, Ordering::Release);
        Some(value)
    }
}

/// Basic push/pop under loom's exhaustive interleaving exploration.
#[test]
fn loom_spsc_basic() {
    loom::model(|| {
        let ring = Arc::new(LoomSpsc::new());
        let ring2 = Arc::clone(&ring);

        let producer = thread::spawn(move || {
            ring2.push(42);
            ring2.push(43);
        });

        let consumer = thread::spawn(move || {
            let mut received = Vec::new();
            for _ in 0..10 {
                if let Some(v) = ring.pop() {
                    received.push(v);
                }
                if received.len() == 2 {
                    break;
                }
                loom::thread::yield_now();
            }
            received
        });

        producer.join().unwrap();
        let received = consumer.join().unwrap();

        if received.len() >= 2 {
            assert_eq!(received[0], 42);
            assert_eq!(received[1], 43);
        }
    });
}

/// A full queue rejects `push` until the consumer frees a slot.
#[test]
fn loom_spsc_full_ring() {
    loom::model(|| {
        let ring = Arc::new(LoomSpsc::new());
        let ring2 = Arc::clone(&ring);

        assert!(ring.push(1));
        assert!(ring.push(2));
        assert!(ring.push(3));
        assert!(ring.push(4));
        assert!(!ring.push(5));

        let consumer = thread::spawn(move || ring2.pop());

        let value = consumer.join().unwrap();
        assert_eq!(value, Some(1));

        assert!(ring.push(5));
    });
}

/// Concurrent producer/consumer never yields more received items than sent.
#[test]
fn loom_spsc_concurrent() {
    loom::model(|| {
        let ring = Arc::new(LoomSpsc::new());
        let ring_producer = Arc::clone(&ring);
        let ring_consumer = Arc::clone(&ring);

        let sent = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(AtomicUsize::new(0));

        let sent_clone = Arc::clone(&sent);
        let received_clone = Arc::clone(&received);

        let producer = thread::spawn(move || {
            if ring_producer.push(100) {
                sent_clone.fetch_add(1, Ordering::SeqCst);
            }
            if ring_producer.push(200) {
                sent_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        let consumer = thread::spawn(move || {
            for _ in 0..4 {
                if ring_consumer.pop().is_some() {
                    received_clone.fetch_add(1, Ordering::SeqCst);
                }
                loom::thread::yield_now();
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();

        let s = sent.load(Ordering::SeqCst);
        let r = received.load(Ordering::SeqCst);
        assert!(r <= s, "received {} but only sent {}", r, s);
    });
}

/// Verifies the cached-cursor fast-path/slow-path refresh pattern used by
/// `offer`/`poll`: a cache miss falls back to an acquire-load of the other
/// side's cursor before giving up.
#[test]
fn loom_cached_cursor_refresh() {
    loom::model(|| {
        let tail = Arc::new(AtomicU64::new(0));
        let head = Arc::new(AtomicU64::new(0));

        let cached_head = Arc::new(AtomicU64::new(0));
        let cached_tail = Arc::new(AtomicU64::new(0));

        let tail_p = Arc::clone(&tail);
        let head_p = Arc::clone(&head);
        let cached_head_p = Arc::clone(&cached_head);

        let tail_c = Arc::clone(&tail);
        let head_c = Arc::clone(&head);
        let cached_tail_c = Arc::clone(&cached_tail);

        // Producer: consults cached_head, refreshes from head on a cache miss.
        let producer = thread::spawn(move || {
            let t = tail_p.load(Ordering::Relaxed);

            let ch = cached_head_p.load(Ordering::Relaxed);
            let space = 4usize.saturating_sub((t.wrapping_sub(ch)) as usize);

            if space == 0 {
                let h = head_p.load(Ordering::Acquire);
                cached_head_p.store(h, Ordering::Relaxed);
            }

            tail_p.store(t + 1, Ordering::Release);
        });

        // Consumer: consults cached_tail, refreshes from tail on a cache miss.
        let consumer = thread::spawn(move || {
            let h = head_c.load(Ordering::Relaxed);

            let ct = cached_tail_c.load(Ordering::Relaxed);
            let avail = ct.wrapping_sub(h) as usize;

            if avail == 0 {
                let t = tail_c.load(Ordering::Acquire);
                cached_tail_c.store(t, Ordering::Relaxed);
            }

            head_c.store(h + 1, Ordering::Release);
        });

        producer.join().unwrap();
        consumer.join().unwrap();

        assert_eq!(tail.load(Ordering::SeqCst), 1);
        assert_eq!(head.load(Ordering::SeqCst), 1);
    });
}
