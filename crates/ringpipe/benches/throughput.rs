//! Ring throughput benchmarks: item-at-a-time vs straight-run bulk transfer.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringpipe::ByteRing;

fn bench_single_item(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_item");
    for capacity in [64usize, 2048] {
        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let ring = ByteRing::new(capacity).unwrap();
                b.iter(|| {
                    for i in 0..capacity {
                        ring.write(i as u8);
                    }
                    let mut sum = 0u64;
                    while let Some(b) = ring.read() {
                        sum = sum.wrapping_add(u64::from(b));
                    }
                    sum
                });
            },
        );
    }
    group.finish();
}

fn bench_straight_runs(c: &mut Criterion) {
    let mut group = c.benchmark_group("straight_runs");
    for capacity in [64usize, 2048] {
        group.throughput(Throughput::Bytes(capacity as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let ring = ByteRing::new(capacity).unwrap();
                let data = vec![0xA5u8; capacity];
                let mut out = vec![0u8; capacity];
                b.iter(|| {
                    ring.write_from(&data);
                    ring.read_into(&mut out);
                    out[capacity - 1]
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_single_item, bench_straight_runs);
criterion_main!(benches);
