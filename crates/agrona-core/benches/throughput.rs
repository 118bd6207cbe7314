use agrona_core::config::Config;
use agrona_core::queue::{Mpmc, Spsc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

const MSG_PER_PRODUCER: u64 = 2_000_000;

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(MSG_PER_PRODUCER));

    group.bench_function("single_producer_consumer", |b| {
        b.iter(|| {
            let queue = Arc::new(Spsc::<u64>::new(Config::new(16, 1, false)));

            let producer_queue = Arc::clone(&queue);
            let producer = thread::spawn(move || {
                let mut sent = 0u64;
                while sent < MSG_PER_PRODUCER {
                    if producer_queue.offer(sent) {
                        sent += 1;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0u64;
            while received < MSG_PER_PRODUCER {
                if let Some(value) = queue.poll() {
                    black_box(value);
                    received += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
            producer.join().unwrap();
        });
    });

    group.finish();
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    group.throughput(Throughput::Elements(MSG_PER_PRODUCER));

    for producers in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(producers), &producers, |b, &producers| {
            b.iter(|| {
                let queue = Arc::new(Mpmc::<u64>::new(Config::new(16, producers, false)));
                let per_producer = MSG_PER_PRODUCER / producers as u64;
                let received = Arc::new(AtomicU64::new(0));

                let handles: Vec<_> = (0..producers)
                    .map(|_| {
                        let q = Arc::clone(&queue);
                        thread::spawn(move || {
                            let mut sent = 0u64;
                            while sent < per_producer {
                                if q.offer(sent) {
                                    sent += 1;
                                } else {
                                    std::hint::spin_loop();
                                }
                            }
                        })
                    })
                    .collect();

                let total = per_producer * producers as u64;
                while received.load(Ordering::Relaxed) < total {
                    if let Some(value) = queue.poll() {
                        black_box(value);
                        received.fetch_add(1, Ordering::Relaxed);
                    } else {
                        std::hint::spin_loop();
                    }
                }
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spsc, bench_mpmc);
criterion_main!(benches);
