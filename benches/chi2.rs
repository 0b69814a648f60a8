use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use imgdb::chi2::chi2_distance;
use imgdb::signature::bit_signature;
use rand::prelude::*;

fn random_feature(rng: &mut impl Rng, len: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..len).map(|_| rng.random()).collect();
    let sum: f32 = v.iter().sum();
    v.iter_mut().for_each(|x| *x /= sum);
    v
}

fn bench_chi2(c: &mut Criterion) {
    let mut group = c.benchmark_group("Chi2");
    let mut rng = rand::rng();
    let a = random_feature(&mut rng, 512);
    let b = random_feature(&mut rng, 512);

    group.throughput(Throughput::Elements(512));
    group.bench_function("chi2_512", |bench| {
        bench.iter(|| chi2_distance(black_box(&a), black_box(&b)));
    });
    group.finish();
}

fn bench_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("Signature");
    let mut rng = rand::rng();
    let a = random_feature(&mut rng, 512);

    group.throughput(Throughput::Elements(512));
    group.bench_function("bit_signature_512", |bench| {
        bench.iter(|| bit_signature(black_box(&a)));
    });
    group.finish();
}

criterion_group!(benches, bench_chi2, bench_signature);
criterion_main!(benches);
