//! Benchmarks for vector algebra.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use sparse_alphabet::vector::{AcceleratorKind, DenseVector, SparseVector, dot_product};

const DOMAIN: usize = 100_000;

fn random_sparse(rng: &mut impl Rng, present: usize) -> SparseVector {
    let pairs: Vec<(usize, f64)> = (0..present)
        .map(|_| (rng.gen_range(0..DOMAIN), rng.gen_range(-1.0..1.0)))
        .collect();
    SparseVector::from_pairs(&pairs).unwrap()
}

fn bench_dense_dot(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let a = DenseVector::from_vec((0..DOMAIN).map(|_| rng.gen_range(-1.0..1.0)).collect());
    let b = DenseVector::from_vec((0..DOMAIN).map(|_| rng.gen_range(-1.0..1.0)).collect());

    c.bench_function("dot_dense_100k", |bench| {
        bench.iter(|| black_box(dot_product(&a, &b)))
    });
}

fn bench_sparse_dot(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let short = random_sparse(&mut rng, 200);
    let long = random_sparse(&mut rng, 20_000);
    let array = long.clone().with_accelerator(AcceleratorKind::Array);
    let hash = long.clone().with_accelerator(AcceleratorKind::Hash);
    array.index_vector();
    hash.index_vector();

    c.bench_function("dot_sparse_200x20k_search", |bench| {
        bench.iter(|| black_box(dot_product(&short, &long)))
    });
    c.bench_function("dot_sparse_200x20k_array", |bench| {
        bench.iter(|| black_box(dot_product(&short, &array)))
    });
    c.bench_function("dot_sparse_200x20k_hash", |bench| {
        bench.iter(|| black_box(dot_product(&short, &hash)))
    });
}

fn bench_sparse_dense_dot(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let sparse = random_sparse(&mut rng, 1_000);
    let dense = DenseVector::from_vec((0..DOMAIN).map(|_| rng.gen_range(-1.0..1.0)).collect());

    c.bench_function("dot_sparse_1k_dense_100k", |bench| {
        bench.iter(|| black_box(dot_product(&sparse, &dense)))
    });
}

fn bench_accelerator_build(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let v = random_sparse(&mut rng, 20_000);

    c.bench_function("build_array_accelerator_20k", |bench| {
        bench.iter(|| {
            let indexed = v.clone().with_accelerator(AcceleratorKind::Array);
            indexed.index_vector();
            black_box(indexed)
        })
    });
    c.bench_function("build_hash_accelerator_20k", |bench| {
        bench.iter(|| {
            let indexed = v.clone().with_accelerator(AcceleratorKind::Hash);
            indexed.index_vector();
            black_box(indexed)
        })
    });
}

fn bench_incremental_add(c: &mut Criterion) {
    c.bench_function("append_sorted_10k", |bench| {
        bench.iter(|| {
            let mut v = SparseVector::empty(0);
            for i in 0..10_000 {
                v.add(i * 3, 1.0).unwrap();
            }
            black_box(v)
        })
    });
}

criterion_group!(
    benches,
    bench_dense_dot,
    bench_sparse_dot,
    bench_sparse_dense_dot,
    bench_accelerator_build,
    bench_incremental_add
);
criterion_main!(benches);
