//! Benchmarks for the sift-core interval algebra.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sift_core::{coalesce, diff, top_k, RankInterval};

fn striped(offset: usize, stride: usize, count: usize) -> Vec<RankInterval> {
    (0..count)
        .map(|i| RankInterval::new(offset + i * stride, offset + i * stride + stride / 2))
        .collect()
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval/diff");

    for count in [4, 64, 1024] {
        let old = striped(0, 10, count);
        let new = striped(3, 10, count);
        group.bench_with_input(
            BenchmarkId::new("striped", count),
            &(old, new),
            |b, (old, new)| b.iter(|| diff(black_box(old), black_box(new))),
        );
    }

    group.finish();
}

fn bench_coalesce(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval/coalesce");

    for count in [16, 256] {
        let raw: Vec<RankInterval> = (0..count)
            .map(|i| RankInterval::new((i * 7919) % 4096, (i * 7919) % 4096 + 20))
            .collect();
        group.bench_with_input(BenchmarkId::new("scattered", count), &raw, |b, raw| {
            b.iter(|| coalesce(black_box(raw.clone())))
        });
    }

    group.finish();
}

fn bench_top_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("select/top_k");

    let items: Vec<i64> = (0..10_000).map(|i| (i * 2654435761u64 as i64) % 100_000).collect();
    for k in [8, 128] {
        group.bench_with_input(BenchmarkId::new("10k", k), &k, |b, &k| {
            b.iter(|| top_k(black_box(&items), k, |a, b| a.cmp(b)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff, bench_coalesce, bench_top_k);
criterion_main!(benches);
