//! Benchmarks for one evaluation of each training objective
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{DMatrix, DVector};
use riemannscore_core::{batch::Batch, random::PrngKey, test_utils::LinearScoreModel};
use riemannscore_losses::{
    DsmConfig, DsmLoss, IsmConfig, IsmLoss, LossFunction, MoserConfig, MoserLoss,
};
use riemannscore_manifolds::{Euclidean, Sphere};
use riemannscore_sde::{Brownian, BrownianConfig, UniformDistribution};

fn sphere_batch(n: usize) -> Batch<f64> {
    Batch::new(vec![DVector::from_vec(vec![0.0, 0.0, 1.0]); n])
}

fn benchmark_flat_space(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_space");
    let model = LinearScoreModel;

    for &dim in &[2, 16, 64] {
        let sde = Brownian::new(Euclidean::new(dim).unwrap(), BrownianConfig::<f64>::default()).unwrap();
        let params = DMatrix::<f64>::identity(dim, dim) * -0.5;
        let batch = Batch::new(vec![DVector::zeros(dim); 128]);

        let dsm = DsmLoss::new(&sde, &model, DsmConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("dsm", dim), &dim, |b, _| {
            b.iter(|| dsm.loss(PrngKey::new(0), black_box(&params), (), black_box(&batch)))
        });

        let ism = IsmLoss::new(&sde, &model, IsmConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("ism", dim), &dim, |b, _| {
            b.iter(|| ism.loss(PrngKey::new(0), black_box(&params), (), black_box(&batch)))
        });
    }

    group.finish();
}

fn benchmark_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("sphere");
    group.sample_size(20);

    let sphere = Sphere::new(3).unwrap();
    let sde = Brownian::new(sphere.clone(), BrownianConfig::<f64>::default()).unwrap();
    let base = UniformDistribution::new(sphere.clone());
    let model = LinearScoreModel;
    let params = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    for &n in &[8, 64] {
        let batch = sphere_batch(n);

        let dsm = DsmLoss::new(&sde, &model, DsmConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("dsm_integrated", n), &n, |b, _| {
            b.iter(|| dsm.loss(PrngKey::new(1), black_box(&params), (), black_box(&batch)))
        });

        let moser = MoserLoss::new(&sphere, &base, &model, MoserConfig::<f64>::new().with_k(256)).unwrap();
        group.bench_with_input(BenchmarkId::new("moser", n), &n, |b, _| {
            b.iter(|| moser.loss(PrngKey::new(1), black_box(&params), (), black_box(&batch)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_flat_space, benchmark_sphere);
criterion_main!(benches);
