use agrona_core::config::Config;
use agrona_core::queue::Spsc;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

fn main() {
    println!("agrona-core Zero-Copy Example");
    println!("==============================\n");

    // High-throughput configuration: metrics disabled, large capacity.
    let config = Config::new(
        16,    // 64K slots
        1,     // single producer
        false, // metrics disabled for max performance
    );

    let queue = Arc::new(Spsc::<[u64; 8]>::new(config));

    const BATCHES: usize = 10_000;
    const BATCH_SIZE: usize = 100;
    const TOTAL: usize = BATCHES * BATCH_SIZE;

    println!("Configuration:");
    println!("  Queue capacity: {} slots", queue.capacity());
    println!("  Batches: {BATCHES}");
    println!("  Batch size: {BATCH_SIZE}");
    println!("  Total items: {TOTAL}\n");

    let start = Instant::now();

    let producer_queue = Arc::clone(&queue);
    let producer = thread::spawn(move || {
        let mut sent = 0usize;
        for _batch in 0..BATCHES {
            let mut batch_sent = 0;
            while batch_sent < BATCH_SIZE {
                let remaining = BATCH_SIZE - batch_sent;
                if let Some(mut reservation) = producer_queue.reserve(remaining) {
                    let slice = reservation.as_mut_slice();

                    // Write directly into the queue's backing storage; no
                    // intermediate allocation or copy.
                    for (i, slot) in slice.iter_mut().enumerate() {
                        let value = (sent + i) as u64;
                        *slot = MaybeUninit::new([value; 8]);
                    }

                    let n = slice.len();
                    sent += n;
                    batch_sent += n;
                    reservation.commit();
                } else {
                    thread::yield_now();
                }
            }
        }
    });

    let mut total = 0usize;
    while total < TOTAL {
        let consumed = queue.drain_to(10_000, |item| {
            let _ = item[0]; // touch the data
        });

        total += consumed;
        if consumed == 0 {
            thread::yield_now();
        }
    }

    producer.join().unwrap();
    let duration = start.elapsed();

    let items_per_sec = total as f64 / duration.as_secs_f64();
    let bytes_per_sec = items_per_sec * 64.0; // 64 bytes per item

    println!("Results:");
    println!("  Items consumed: {total}");
    println!("  Duration: {duration:.2?}");
    println!("  Throughput: {:.2} million items/sec", items_per_sec / 1_000_000.0);
    println!("  Bandwidth: {:.2} GB/sec", bytes_per_sec / 1_000_000_000.0);
}
