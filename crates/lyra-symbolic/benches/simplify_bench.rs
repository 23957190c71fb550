//! Performance benchmarks for symbolic simplification and matrix inversion
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lyra_symbolic::{Expr, SymArray, Symbol};

fn diagonal_metric(n: usize) -> SymArray {
    let r = Expr::sym("r");
    let theta = Expr::sym("theta");
    SymArray::from_fn(&[n, n], |idx| {
        if idx[0] != idx[1] {
            return Expr::zero();
        }
        match idx[0] {
            0 => -(1 - 2 * Expr::sym("M") / r.clone()),
            1 => (1 - 2 * Expr::sym("M") / r.clone()).recip(),
            2 => r.powi(2),
            _ => r.powi(2) * theta.sin().powi(2),
        }
    })
}

// ===== Simplification Benchmarks =====

fn bench_simplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplify");
    let x = Symbol::new("x");
    let theta = Expr::sym("theta");

    group.bench_function("rational_cancellation", |b| {
        let e = (x.expr().powi(4) - 1) / (x.expr().powi(2) + 1);
        b.iter(|| black_box(&e).simplify());
    });

    group.bench_function("pythagorean", |b| {
        let e = theta.sin().powi(4) + 2 * theta.sin().powi(2) * theta.cos().powi(2) + theta.cos().powi(4);
        b.iter(|| black_box(&e).simplify());
    });

    group.finish();
}

// ===== Matrix Benchmarks =====

fn bench_inverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_inverse");
    for n in [2usize, 3, 4] {
        let g = diagonal_metric(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &g, |b, g| {
            b.iter(|| g.inverse());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_simplify, bench_inverse);
criterion_main!(benches);
