use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rubricon_core::align::{align, DEFAULT_FUZZY_CUTOFF};
use rubricon_core::rubric::{distribute_proportionally, Rubric};
use rubricon_core::traits::{OracleReply, OracleScoreEntry};

fn rubric_of(n: usize) -> Rubric {
    Rubric::from_pairs((0..n).map(|i| (format!("Criterion {i}"), 5u32))).unwrap()
}

fn bench_distribute(c: &mut Criterion) {
    let mut group = c.benchmark_group("distribute_proportionally");

    for &n in &[3usize, 10, 50] {
        let rubric = rubric_of(n);
        let award = rubric.total_possible() as f64 * 0.63;
        group.bench_function(format!("items={n}"), |b| {
            b.iter(|| distribute_proportionally(black_box(award), black_box(&rubric)))
        });
    }

    group.finish();
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");

    for &n in &[3usize, 10, 50] {
        let rubric = rubric_of(n);
        // Misspelled names force the fuzzy path on every criterion.
        let reply = OracleReply {
            total: None,
            criteria: (0..n)
                .map(|i| OracleScoreEntry {
                    criterion: format!("Critreion {i}"),
                    score: 3.0,
                })
                .collect(),
            uncertainty: None,
            feedback: None,
        };
        group.bench_function(format!("fuzzy,items={n}"), |b| {
            b.iter(|| align(black_box(&rubric), black_box(&reply), DEFAULT_FUZZY_CUTOFF))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_distribute, bench_align);
criterion_main!(benches);
