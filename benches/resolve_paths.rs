use criterion::{black_box, criterion_group, criterion_main, Criterion};
use issuefix::context::detect_repository_type;
use issuefix::fix::resolve::best_match;

fn synthetic_paths(file_count: usize) -> Vec<String> {
    (0..file_count)
        .map(|i| format!("src/feature_{:03}/file_{:05}.rs", i % 120, i))
        .collect()
}

fn bench_best_match(c: &mut Criterion) {
    let paths = synthetic_paths(2_000);

    c.bench_function("best_match_exact_2k", |b| {
        b.iter(|| best_match(black_box("src/feature_042/file_01242.rs"), black_box(&paths)))
    });

    c.bench_function("best_match_typo_2k", |b| {
        b.iter(|| best_match(black_box("src/featur_042/fle_01242.rs"), black_box(&paths)))
    });

    c.bench_function("best_match_miss_2k", |b| {
        b.iter(|| best_match(black_box("docs/architecture/overview.md"), black_box(&paths)))
    });
}

fn bench_repository_type(c: &mut Criterion) {
    let mut paths = synthetic_paths(10_000);
    paths.push("go.mod".to_string());

    c.bench_function("detect_repository_type_10k", |b| {
        b.iter(|| detect_repository_type(black_box(&paths)))
    });
}

criterion_group!(benches, bench_best_match, bench_repository_type);
criterion_main!(benches);
