//! Performance benchmarks for the checkpoint store.

use checkpoint_store::filter::diff;
use checkpoint_store::{evaluate, Settings, Store, StoreConfig, VersionStore};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

fn document(lines: usize, seed: usize) -> String {
    (0..lines)
        .map(|i| format!("line {} of document {}\n", i, (i * 31 + seed) % 97))
        .collect()
}

/// Document with `edits` scattered lines rewritten.
fn edited(doc: &str, edits: usize) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let step = (lines.len() / edits.max(1)).max(1);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i % step == 0 && i / step < edits {
                format!("{} // edited\n", line)
            } else {
                format!("{}\n", line)
            }
        })
        .collect()
}

/// Benchmark the line diff on documents of growing size
fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_stats");

    for lines in [100, 1_000, 10_000] {
        let old = document(lines, 0);
        let new = edited(&old, 20);
        group.bench_with_input(BenchmarkId::new("lines", lines), &lines, |b, _| {
            b.iter(|| black_box(diff::stats(&old, &new).changed()));
        });
    }

    group.finish();
}

/// Benchmark the full persist/skip decision
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let old = document(2_000, 0);

    let noise = edited(&old, 1);
    group.bench_function("noise", |b| {
        b.iter(|| black_box(evaluate(Some(&old), &noise, false)));
    });

    let rewrite = document(2_000, 7);
    group.bench_function("rewrite", |b| {
        b.iter(|| black_box(evaluate(Some(&old), &rewrite, false)));
    });

    group.bench_function("duplicate", |b| {
        b.iter(|| black_box(evaluate(Some(&old), &old, false)));
    });

    group.finish();
}

/// Benchmark version creation against a growing history
fn bench_create_version(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_version");

    for history in [0, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::new("history", history),
            &history,
            |b, &history| {
                let dir = TempDir::new().unwrap();
                let store = VersionStore::open(dir.path().join("bench.db")).unwrap();
                let file = store.create_file("bench.txt").unwrap();
                for i in 0..history {
                    store.create_version(file.id, &document(20, i), None).unwrap();
                }
                let content = document(200, 3);

                b.iter(|| {
                    black_box(store.create_version(file.id, &content, None).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the save path end to end
fn bench_record_save(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = Store::open_or_create(StoreConfig::for_workspace(dir.path()), Settings::default())
        .unwrap();
    let base = document(500, 0);
    store.record_save("src/bench.rs", &base).unwrap();

    let mut round = 0usize;
    c.bench_function("record_save", |b| {
        b.iter(|| {
            round += 1;
            let content = document(500, round);
            black_box(store.record_save("src/bench.rs", &content).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_diff,
    bench_evaluate,
    bench_create_version,
    bench_record_save,
);

criterion_main!(benches);
