use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput, BenchmarkId};
use orbitcount::*;
use configuration::{Canonicalizer, Configuration};
use group::{derive, Tolerance};
use symmetry::point_group;

use rand::Rng;

fn canonicalization(c: &mut Criterion) {
    let mut bench_group = c.benchmark_group("canonicalization");

    for name in ["reduced", "first", "second"] {
        let coordinates = sites::by_name(name).unwrap();
        let group = derive(&point_group::d4h(), &coordinates, &Tolerance::default()).unwrap();
        let n = group.site_count();

        let mut rng = rand::thread_rng();
        let samples: Vec<Configuration> = (0..256)
            .map(|_| Configuration(rng.gen::<u64>() & (u64::MAX >> (64 - n))))
            .collect();
        let canonicalizer = Canonicalizer::new(group.permutations());

        bench_group.throughput(Throughput::Elements(samples.len() as u64));
        bench_group.bench_with_input(
            BenchmarkId::new("naive", n),
            &samples,
            |b, samples| b.iter(|| samples.iter().map(|c| c.canonical(black_box(group.permutations()))).max())
        );
        bench_group.bench_with_input(
            BenchmarkId::new("inverse tables", n),
            &samples,
            |b, samples| b.iter(|| samples.iter().map(|&c| canonicalizer.canonical(black_box(c))).max())
        );
    }
}

fn parallel_enumeration(c: &mut Criterion) {
    let mut bench_group = c.benchmark_group("enumeration");
    bench_group.sample_size(10);

    let coordinates = sites::first_sphere();
    let group = derive(&point_group::d4h(), &coordinates, &Tolerance::default()).unwrap();

    for k in [3, 5, 7] {
        let total = combination::binomial(14, k);
        bench_group.throughput(Throughput::Elements(total));
        bench_group.bench_with_input(
            BenchmarkId::new("single worker", k),
            &k,
            |b, &k| b.iter(|| enumeration::enumerate(14, black_box(k), &group, u64::MAX, Some(1)).unwrap())
        );
        bench_group.bench_with_input(
            BenchmarkId::new("all workers", k),
            &k,
            |b, &k| b.iter(|| enumeration::enumerate(14, black_box(k), &group, u64::MAX, None).unwrap())
        );
    }
}

criterion_group!(benches, canonicalization, parallel_enumeration);
criterion_main!(benches);
