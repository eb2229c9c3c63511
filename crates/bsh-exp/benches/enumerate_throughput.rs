use bsh_exp::{stable_hash_string, SweepPlan, SweepSpace};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn wide_space() -> SweepSpace {
    SweepSpace::new(
        (8..40).collect(),
        vec![256, 512, 1024, 2048, 4096],
        vec![1, 2, 4, 8, 16, 32, 64],
        vec![10_000, 50_000, 100_000, 500_000, 1_000_000],
    )
}

fn bench_enumerate(c: &mut Criterion) {
    let space = wide_space();
    c.bench_function("enumerate_points", |b| {
        b.iter(|| black_box(&space).points().fold(0u64, |acc, p| acc ^ p.total_ops))
    });
    c.bench_function("random_access_points", |b| {
        b.iter(|| (0..space.len()).filter_map(|idx| space.point(black_box(idx))).count())
    });
}

fn bench_plan_hash(c: &mut Criterion) {
    let plan = SweepPlan {
        space: wide_space(),
        ..SweepPlan::default()
    };
    c.bench_function("plan_hash", |b| {
        b.iter(|| stable_hash_string(black_box(&plan)).expect("hash"))
    });
}

criterion_group!(benches, bench_enumerate, bench_plan_hash);
criterion_main!(benches);
