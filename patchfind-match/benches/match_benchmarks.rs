use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use patchfind_core::{Descriptors, MatchConfig, MatchStrategy};
use patchfind_match::kdforest::KdForest;
use patchfind_match::DescriptorMatcher;

/// Deterministic pseudo-random unit-range table
fn create_table(rows: usize, dim: usize, seed: u32) -> Descriptors {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    let flat = (0..rows * dim)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as f32 / u32::MAX as f32
        })
        .collect();
    Descriptors::from_flat(dim, flat).unwrap()
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_descriptors");
    group.sample_size(10);

    for &rows in &[500usize, 2000, 8000] {
        let scene = create_table(rows, 128, 1);
        let target = create_table(rows / 4, 128, 2);
        for strategy in [MatchStrategy::KdForest, MatchStrategy::BruteForce] {
            let matcher = DescriptorMatcher::new(MatchConfig {
                strategy,
                ..MatchConfig::default()
            })
            .unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", strategy), rows),
                &(matcher, &target, &scene),
                |b, (m, t, s)| b.iter(|| black_box(m.match_descriptors(black_box(t), black_box(s)).unwrap())),
            );
        }
    }

    group.finish();
}

fn bench_forest_build(c: &mut Criterion) {
    let scene = create_table(8000, 128, 3);
    c.bench_function("kdforest_build_8000x128", |b| {
        b.iter(|| black_box(KdForest::build(black_box(&scene), 4, 0x5eed).n_trees()))
    });
}

criterion_group!(benches, bench_strategies, bench_forest_build);
criterion_main!(benches);
