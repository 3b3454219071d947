use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use adtape::{grad, record};

#[path = "common/mod.rs"]
mod common;
use common::*;

fn bench_reverse_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_gradient");
    for n in [2, 10, 100, 1000] {
        let x = make_input(n);

        group.bench_with_input(BenchmarkId::new("f64_eval", n), &x, |b, x| {
            b.iter(|| black_box(rosenbrock_f64(black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_record_and_rev", n), &x, |b, x| {
            b.iter(|| black_box(grad(rosenbrock, black_box(x))))
        });

        let (tape, _) = record(rosenbrock, &x).unwrap();
        group.bench_with_input(BenchmarkId::new("rosenbrock_reuse_tape", n), &x, |b, x| {
            b.iter(|| black_box(tape.gradient(black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_fd", n), &x, |b, x| {
            b.iter(|| black_box(finite_diff_gradient(rosenbrock_f64, x, 1e-7)))
        });

        group.bench_with_input(BenchmarkId::new("rastrigin_record_and_rev", n), &x, |b, x| {
            b.iter(|| black_box(grad(rastrigin, black_box(x))))
        });
    }
    group.finish();
}

fn bench_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("recording");
    for n in [10, 100, 1000] {
        let x = make_input(n);
        group.bench_with_input(BenchmarkId::new("rosenbrock", n), &x, |b, x| {
            b.iter(|| black_box(record(rosenbrock, black_box(x))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reverse_gradient, bench_recording);
criterion_main!(benches);
