use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use syncmap::*;

fn criterion_benchmark(c: &mut Criterion) {
    let count = 1 << 20;
    c.bench_with_input(
        BenchmarkId::new("store_into_syncmap", count),
        &count,
        |b, &count| {
            b.iter(|| {
                let map = SyncMap::with_capacity(1 << 15);
                for i in 0..count {
                    map.store(i, i);
                }
            })
        },
    );

    c.bench_with_input(
        BenchmarkId::new("store_into_syncmap_exclusive", count),
        &count,
        |b, &count| {
            b.iter(|| {
                let map = SyncMap::with_capacity(1 << 15);
                map.run_exclusive(|locked| {
                    for i in 0..count {
                        locked.store(i, i);
                    }
                });
            })
        },
    );

    let map = (0..1 << 15).map(|i| (i, i)).collect::<SyncMap<u32, u32>>();
    c.bench_function("load_from_syncmap", |b| {
        b.iter(|| {
            for i in 0..1 << 15 {
                std::hint::black_box(map.load(&i));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
