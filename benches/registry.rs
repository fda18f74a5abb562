use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use seat_booking::registry::SeatRegistry;
use std::thread;

fn uncontended(c: &mut Criterion) {
    let registry = SeatRegistry::new(1024);
    c.bench_function("book_cancel_single_thread", |b| {
        b.iter(|| {
            for seat in 1..=1024 {
                registry.try_book(black_box(seat), "bench").ok();
                registry.try_cancel(black_box(seat), "bench").ok();
            }
        })
    });
}

fn contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_single_seat");
    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let registry = SeatRegistry::new(1);
                thread::scope(|s| {
                    for i in 0..threads {
                        let registry = &registry;
                        s.spawn(move || registry.try_book(1, &format!("owner-{i}")).is_ok());
                    }
                });
            })
        });
    }
    group.finish();
}

fn snapshot(c: &mut Criterion) {
    let registry = SeatRegistry::new(256);
    for seat in (1..=256).step_by(3) {
        registry.try_book(seat, "bench").ok();
    }
    c.bench_function("snapshot_256", |b| b.iter(|| black_box(registry.snapshot())));
}

criterion_group!(benches, uncontended, contended, snapshot);
criterion_main!(benches);
