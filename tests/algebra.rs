//! Cross-representation algebra tests.
//!
//! These check the properties every vector representation must share:
//! dot-product symmetry against a dense reference, accelerator
//! transparency, the sorted-index invariant, and the infinity rules.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sparse_alphabet::alphabet::SymbolTable;
use sparse_alphabet::config::{AlgebraConfig, KernelChoice};
use sparse_alphabet::feature::{FeatureSelection, FeatureVector};
use sparse_alphabet::symbol::Entry;
use sparse_alphabet::vector::{
    AcceleratorKind, DenseVector, MatrixN, SparseVector, Vector, dot_product, dot_product_with,
};

const DOMAIN: usize = 64;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn random_pairs(rng: &mut StdRng, present: usize) -> Vec<(usize, f64)> {
    (0..present)
        .map(|_| (rng.gen_range(0..DOMAIN), rng.gen_range(-4.0..4.0)))
        .collect()
}

/// Every representation of the same logical content.
fn representations(pairs: &[(usize, f64)]) -> Vec<(&'static str, Box<dyn Vector>)> {
    let plain = SparseVector::from_pairs(pairs).unwrap();
    let mut dense = vec![0.0; DOMAIN];
    for &(i, v) in pairs {
        dense[i] += v;
    }
    let array: Box<dyn Vector> = Box::new(plain.clone().with_accelerator(AcceleratorKind::Array));
    let hash: Box<dyn Vector> = Box::new(plain.clone().with_accelerator(AcceleratorKind::Hash));
    let materialized: Box<dyn Vector> = Box::new(DenseVector::from_vec(dense.clone()));
    let dense_layout: Box<dyn Vector> = Box::new(SparseVector::dense(dense));
    let plain: Box<dyn Vector> = Box::new(plain);
    vec![
        ("array", array),
        ("hash", hash),
        ("dense", materialized),
        ("dense-layout", dense_layout),
        ("plain", plain),
    ]
}

fn reference_dot(a: &dyn Vector, b: &dyn Vector) -> f64 {
    (0..DOMAIN).map(|i| a.value(i) * b.value(i)).sum()
}

#[test]
fn dot_product_symmetric_across_all_pairings() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let left = representations(&random_pairs(&mut rng, 12));
        let right = representations(&random_pairs(&mut rng, 30));
        for (ln, a) in &left {
            for (rn, b) in &right {
                let ab = dot_product(a.as_ref(), b.as_ref());
                let ba = dot_product(b.as_ref(), a.as_ref());
                let expected = reference_dot(a.as_ref(), b.as_ref());
                assert!((ab - ba).abs() < 1e-9, "{ln} x {rn}: {ab} vs {ba}");
                assert!((ab - expected).abs() < 1e-9, "{ln} x {rn}: {ab} vs {expected}");
            }
        }
    }
}

#[test]
fn binary_vectors_against_every_representation() {
    let mut rng = StdRng::seed_from_u64(5);
    let indices: Vec<usize> = (0..10).map(|_| rng.gen_range(0..DOMAIN)).collect();
    let binary = SparseVector::binary(indices).unwrap();
    let accelerated = binary.clone().with_accelerator(AcceleratorKind::Hash);
    for (name, other) in representations(&random_pairs(&mut rng, 25)) {
        let expected = reference_dot(&binary, other.as_ref());
        for b in [&binary, &accelerated] {
            let got = dot_product(b, other.as_ref());
            assert!((got - expected).abs() < 1e-9, "binary x {name}");
            assert!((dot_product(other.as_ref(), b) - expected).abs() < 1e-9);
        }
    }
}

#[test]
fn generic_and_detected_kernels_agree() {
    let mut rng = StdRng::seed_from_u64(9);
    let a = DenseVector::from_vec((0..1_001).map(|_| rng.gen_range(-1.0..1.0)).collect());
    let b = DenseVector::from_vec((0..1_001).map(|_| rng.gen_range(-1.0..1.0)).collect());
    let generic = AlgebraConfig {
        kernel: KernelChoice::Generic,
        ..Default::default()
    };
    let auto = AlgebraConfig::default();
    let x = dot_product_with(generic.dense_kernel(), &a, &b);
    let y = dot_product_with(auto.dense_kernel(), &a, &b);
    assert!((x - y).abs() < 1e-9);
}

#[test]
fn configured_kernel_drives_dense_updates() {
    let mut rng = StdRng::seed_from_u64(11);
    let values: Vec<f64> = (0..257).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let other = DenseVector::from_vec((0..257).map(|_| rng.gen_range(-1.0..1.0)).collect());
    let generic = AlgebraConfig {
        kernel: KernelChoice::Generic,
        ..Default::default()
    };
    let kernel = generic.dense_kernel();

    let mut configured = DenseVector::from_vec(values.clone());
    configured.plus_equals_with(kernel, &other, 0.5).unwrap();
    configured.times_equals_with(kernel, -2.0);
    let mut detected = DenseVector::from_vec(values.clone());
    detected.plus_equals(&other, 0.5).unwrap();
    detected.times_equals(-2.0);
    for i in 0..values.len() {
        assert!((configured.value(i) - detected.value(i)).abs() < 1e-12);
    }
    let expected: f64 = configured.values().iter().sum();
    assert!((configured.sum_with(kernel) - expected).abs() < 1e-9);
    assert!((configured.sum_with(kernel) - detected.sum()).abs() < 1e-9);

    let mut m = MatrixN::from_values(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let ones = MatrixN::from_values(&[2, 3], vec![1.0; 6]).unwrap();
    m.plus_equals_with(kernel, &ones, 2.0).unwrap();
    assert_eq!(m.values(), &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    assert!(m.plus_equals_with(kernel, &MatrixN::new(&[3, 2]), 1.0).is_err());
}

#[test]
fn plus_equals_sparse_is_representation_transparent() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..20 {
        let base = random_pairs(&mut rng, 20);
        let other_pairs = random_pairs(&mut rng, 20);
        let factor = rng.gen_range(-2.0..2.0);

        let mut results = Vec::new();
        for kind in [AcceleratorKind::None, AcceleratorKind::Array, AcceleratorKind::Hash] {
            for (_, other) in representations(&other_pairs) {
                let mut v = SparseVector::from_pairs(&base).unwrap().with_accelerator(kind);
                v.plus_equals_sparse(other.as_ref(), factor).unwrap();
                results.push(v);
            }
        }
        let first = &results[0];
        for r in &results[1..] {
            assert_eq!(r.indices(), first.indices());
            for (x, y) in r.values().unwrap().iter().zip(first.values().unwrap()) {
                assert!((x - y).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn sparse_invariant_under_mixed_mutation() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut v = SparseVector::from_pairs(&random_pairs(&mut rng, 15))
        .unwrap()
        .with_accelerator(AcceleratorKind::Array);
    for step in 0..200 {
        match step % 3 {
            0 => v.add(rng.gen_range(0..DOMAIN * 2), 1.0).unwrap(),
            1 => {
                let other = SparseVector::from_pairs(&random_pairs(&mut rng, 5)).unwrap();
                v.plus_equals_sparse(&other, 0.5).unwrap();
            }
            _ => {
                let index = v.index_at_location(rng.gen_range(0..v.num_locations()));
                v.column_plus_equals(index, 1.0).unwrap();
            }
        }
        let indices = v.indices().unwrap();
        assert!(indices.windows(2).all(|w| w[0] < w[1]), "step {step}");
        assert_eq!(v.size(), v.size().max(indices.last().unwrap() + 1));
    }
}

#[test]
fn infinity_scenario_on_every_accelerator() {
    for kind in [AcceleratorKind::None, AcceleratorKind::Array, AcceleratorKind::Hash] {
        let mut a = SparseVector::from_pairs(&[(2, f64::INFINITY)])
            .unwrap()
            .with_accelerator(kind);
        let b = SparseVector::from_pairs(&[(2, f64::NEG_INFINITY)]).unwrap();
        a.plus_equals_sparse(&b, 1.0).unwrap();
        assert_eq!(a.value(2), 0.0, "{kind}");
    }

    let mut d = DenseVector::from_vec(vec![0.0, 0.0, f64::INFINITY]);
    d.plus_equals_sparse(&SparseVector::from_pairs(&[(2, f64::NEG_INFINITY)]).unwrap(), 1.0)
        .unwrap();
    assert_eq!(d.value(2), 0.0);
}

#[test]
fn implicit_zero_times_infinity_contributes_nothing() {
    let inf = SparseVector::from_pairs(&[(1, f64::INFINITY), (4, 2.0)]).unwrap();
    for (name, other) in representations(&[(4, 3.0), (9, 1.0)]) {
        let got = dot_product(&inf, other.as_ref());
        assert_eq!(got, 6.0, "{name}");
        assert_eq!(dot_product(other.as_ref(), &inf), 6.0, "{name}");
    }
}

#[test]
fn frozen_table_scenario() {
    let table = SymbolTable::new();
    for name in ["a", "b", "c"] {
        table.lookup(name, true).unwrap();
    }
    assert_eq!(table.lookup("b", false).unwrap(), Some(1));
    assert_eq!(table.lookup("d", false).unwrap(), None);
    table.freeze();
    assert_eq!(table.lookup("e", true).unwrap(), None);
    assert_eq!(table.size(), 3);
}

#[test]
fn shared_table_growth_is_visible_to_every_holder() {
    let table = Arc::new(SymbolTable::new());
    let mut fv = FeatureVector::from_entries(Arc::clone(&table), &[Entry::from("w1")], None).unwrap();
    table.lookup("w2", true).unwrap();
    let selection = FeatureSelection::all(Arc::clone(&table));
    assert_eq!(selection.cardinality(), 2);
    fv.add(&Entry::from("w3"), 1.0).unwrap();
    assert_eq!(table.size(), 3);
    assert_eq!(fv.value_of(&Entry::from("w2")).unwrap(), 0.0);
}

#[test]
fn configured_vectors_behave_like_plain_ones() {
    let config = AlgebraConfig::from_toml_str("default_accelerator = \"auto\"\n").unwrap();
    let mut rng = StdRng::seed_from_u64(23);
    let pairs = random_pairs(&mut rng, 10);
    let plain = SparseVector::from_pairs(&pairs).unwrap();
    let configured = plain.clone().with_config(&config);
    assert_ne!(configured.accelerator(), AcceleratorKind::None);
    for i in 0..DOMAIN {
        assert_eq!(configured.value(i), plain.value(i));
    }
}
