//! CRC-A throughput benchmark.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rfcore_core::crc::crc_a;

fn bench_crc_a_sizes(c: &mut Criterion) {
    let sizes: &[usize] = &[4, 16, 64, 256, 1024];
    let mut group = c.benchmark_group("crc_a");

    for &size in sizes {
        let data = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("crc_a", size), &size, |b, _| {
            b.iter(|| black_box(crc_a(black_box(&data))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_crc_a_sizes);
criterion_main!(benches);
