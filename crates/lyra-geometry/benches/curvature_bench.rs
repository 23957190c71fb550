//! Performance benchmarks for connection and curvature derivation
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lyra_geometry::{TensorSpace, UpdateRequest, U};
use lyra_symbolic::{symbols, Expr, SymArray};

fn sphere_metric(n: usize) -> (Vec<lyra_symbolic::Symbol>, SymArray) {
    let names: Vec<String> = (0..n).map(|i| format!("th{i}")).collect();
    let coords = symbols(&names.join(" "));
    let mut entries = Vec::with_capacity(n);
    let mut factor = Expr::one();
    for c in &coords {
        entries.push(factor.clone());
        factor = factor * c.expr().sin().powi(2);
    }
    (coords, SymArray::diagonal(entries))
}

fn schwarzschild() -> (Vec<lyra_symbolic::Symbol>, SymArray) {
    let coords = symbols("t r theta phi");
    let r = coords[1].expr();
    let theta = coords[2].expr();
    let f = 1 - 2 * Expr::sym("M") / r.clone();
    let metric = SymArray::diagonal(vec![
        -f.clone(),
        f.recip(),
        r.powi(2),
        r.powi(2) * theta.sin().powi(2),
    ]);
    (coords, metric)
}

// ===== Update Benchmarks =====

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    group.sample_size(10);
    for n in [2usize, 3] {
        let (coords, metric) = sphere_metric(n);
        group.bench_with_input(BenchmarkId::new("sphere", n), &metric, |b, metric| {
            b.iter(|| {
                TensorSpace::builder(coords.clone())
                    .metric(black_box(metric.clone()))
                    .build()
            });
        });
    }
    let (coords, metric) = schwarzschild();
    group.bench_function("schwarzschild_geometry", |b| {
        b.iter(|| {
            let mut space = TensorSpace::new(coords.clone());
            space.set_metric(metric.clone(), None).ok();
            space.update(&UpdateRequest::geometry())
        });
    });
    group.finish();
}

// ===== Covariant Derivative Benchmarks =====

fn bench_nabla(c: &mut Criterion) {
    let mut group = c.benchmark_group("nabla");
    let (coords, metric) = sphere_metric(3);
    let space = TensorSpace::builder(coords)
        .metric(metric)
        .build()
        .expect("sphere space");
    for rank in [1usize, 2] {
        let t = space.generic("V", vec![U; rank]).expect("generic tensor");
        group.bench_with_input(BenchmarkId::from_parameter(rank), &t, |b, t| {
            b.iter(|| space.nabla(black_box(t)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_update, bench_nabla);
criterion_main!(benches);
