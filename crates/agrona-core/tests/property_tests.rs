//! Property-based tests for the bounded queues: the same size/ordering
//! invariants checked as unit tests alongside the implementation, run here
//! against randomized operation sequences.

use agrona_core::config::Config;
use agrona_core::queue::{Mpmc, Spsc};
use proptest::prelude::*;
use std::mem::MaybeUninit;

proptest! {
    /// Size never exceeds capacity after any sequence of offers/polls.
    #[test]
    fn spsc_size_never_exceeds_capacity(
        writes in 0usize..200,
        reads in 0usize..200,
    ) {
        let queue = Spsc::<u64>::new(Config::default());
        let capacity = queue.capacity();

        for i in 0..writes {
            queue.offer(i as u64);
            prop_assert!(queue.size() <= capacity);
        }
        for _ in 0..reads {
            queue.poll();
            prop_assert!(queue.size() <= capacity);
        }
    }
}

proptest! {
    /// `size()` tracks successful offers and polls exactly for a single-threaded caller.
    #[test]
    fn spsc_size_matches_offer_poll_accounting(
        ops in prop::collection::vec(prop::bool::ANY, 1..100),
    ) {
        let queue = Spsc::<u64>::new(Config::default());
        let mut expected = 0usize;

        for (i, is_write) in ops.into_iter().enumerate() {
            if is_write {
                if queue.offer(i as u64) {
                    expected += 1;
                }
            } else if queue.poll().is_some() {
                expected -= 1;
            }
            prop_assert_eq!(queue.size(), expected);
        }
    }
}

proptest! {
    /// Elements come out in the order they went in (single producer, single consumer).
    #[test]
    fn spsc_preserves_fifo_order(writes in 1usize..500) {
        let queue = Spsc::<u64>::new(Config::new(10, 1, false));
        let capacity = queue.capacity();
        let actual_writes = writes.min(capacity);

        for i in 0..actual_writes {
            prop_assert!(queue.offer(i as u64));
        }
        for expected in 0..actual_writes {
            prop_assert_eq!(queue.poll(), Some(expected as u64));
        }
        prop_assert_eq!(queue.poll(), None);
    }
}

proptest! {
    /// A batch `reserve` never returns more slots than requested or than are free.
    #[test]
    fn spsc_reserve_is_bounded_by_request_and_available_space(
        request_size in 1usize..100,
        pre_fill in 0usize..50,
    ) {
        let queue = Spsc::<u64>::new(Config::new(6, 1, false));
        let capacity = queue.capacity();

        let actual_fill = pre_fill.min(capacity);
        for i in 0..actual_fill {
            queue.offer(i as u64);
        }

        let available = capacity - queue.size();
        if let Some(mut reservation) = queue.reserve(request_size) {
            let got = reservation.len();
            prop_assert!(got <= request_size);
            prop_assert!(got <= available);
            prop_assert!(got > 0);
            for slot in reservation.as_mut_slice() {
                *slot = MaybeUninit::new(0);
            }
            reservation.commit();
        }
    }
}

proptest! {
    /// MPMC never loses or duplicates elements across several producers feeding one consumer.
    #[test]
    fn mpmc_single_threaded_offer_poll_preserves_all_elements(
        writes in 0usize..300,
    ) {
        let queue = Mpmc::<u64>::new(Config::new(9, 2, false));
        let capacity = queue.capacity();
        let actual_writes = writes.min(capacity);

        let mut sent = Vec::new();
        for i in 0..actual_writes {
            prop_assert!(queue.offer(i as u64));
            sent.push(i as u64);
        }

        let mut received = Vec::new();
        while let Some(v) = queue.poll() {
            received.push(v);
        }
        prop_assert_eq!(sent, received);
    }
}
