//! Bitsliced Crypto-1 clock round throughput, the hardnested brute force's
//! inner loop (`spec.md` §4.9 phase F).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rfcore_hardnested::bitslice::BitSlicedState;

fn bench_bitsliced_clock_round(c: &mut Criterion) {
    let odds: Vec<u32> = (0..64).map(|i| (i * 97 + 13) & 0x00FF_FFFF).collect();
    let evens: Vec<u32> = (0..64).map(|i| (i * 71 + 29) & 0x00FF_FFFF).collect();
    let input = vec![0u64];

    c.bench_function("crypto1_bitslice_clock_64lane", |b| {
        b.iter_batched(
            || BitSlicedState::pack(64, &odds, &evens),
            |mut state| {
                black_box(state.clock(black_box(&input)));
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_bitsliced_clock_round);
criterion_main!(benches);
