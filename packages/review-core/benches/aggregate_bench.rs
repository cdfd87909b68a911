//! Benchmark suite for review-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use review_core::{estimate_boundaries, summarize, ReviewScores, YearScope};

fn sample_reviews(n: usize) -> Vec<ReviewScores> {
    (0..n)
        .map(|i| {
            let r = (i % 5) as u8 + 1;
            ReviewScores {
                difficulty: Some(r),
                usefulness: Some(6 - r),
                workload: Some(r),
                material_relevance: Some(3),
                exam_predictability: if i % 3 == 0 { None } else { Some(r) },
                attendance: Some(if i % 2 == 0 { 1 } else { 5 }),
                grading_fairness: if i % 4 == 0 { None } else { Some(r) },
                ..Default::default()
            }
        })
        .collect()
}

fn bench_summarize(c: &mut Criterion) {
    let reviews = sample_reviews(1_000);
    c.bench_function("summarize/1000", |b| b.iter(|| summarize(black_box(&reviews))));
}

fn bench_heuristic_boundaries(c: &mut Criterion) {
    c.bench_function("estimate_boundaries/heuristic", |b| {
        b.iter(|| estimate_boundaries(&[], YearScope::All, black_box(Some(2.4))))
    });
}

criterion_group!(benches, bench_summarize, bench_heuristic_boundaries);
criterion_main!(benches);
