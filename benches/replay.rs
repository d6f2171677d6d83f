//! Replay and compaction benchmarks.
//!
//! Measures how long `open` takes to rebuild a store from logs of increasing
//! length, with and without prior compaction.

#![allow(clippy::expect_used, missing_docs)]

use std::hint::black_box;

use authlog::auth::member_set;
use authlog::{GroupStore, PrincipalStore};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// A principal log with `users` inserts followed by one update each.
fn write_principal_log(users: usize) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("users.tsv");
    let store = PrincipalStore::open(&path).expect("open");
    for i in 0..users {
        store.insert(&format!("user{i:06}"), "h1").expect("insert");
    }
    for i in 0..users {
        store.update(&format!("user{i:06}"), "h2").expect("update");
    }
    (dir, path)
}

// ── Benchmarks ──────────────────────────────────────────────────────

fn bench_principal_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay/principal");
    for users in [100, 1_000, 10_000] {
        let (_dir, path) = write_principal_log(users);
        group.bench_with_input(BenchmarkId::new("uncompacted", users), &path, |b, path| {
            b.iter(|| black_box(PrincipalStore::open(path).expect("open")));
        });

        PrincipalStore::open(&path)
            .expect("open")
            .save_file()
            .expect("save");
        group.bench_with_input(BenchmarkId::new("compacted", users), &path, |b, path| {
            b.iter(|| black_box(PrincipalStore::open(path).expect("open")));
        });
    }
    group.finish();
}

fn bench_group_replay(c: &mut Criterion) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("roles.tsv");
    let store = GroupStore::open(&path).expect("open");
    for r in 0..100 {
        let members: Vec<String> = (0..50).map(|u| format!("user{u:03}")).collect();
        store
            .insert(&format!("role{r:03}"), member_set(members))
            .expect("insert");
    }

    c.bench_function("replay/group/100x50", |b| {
        b.iter(|| black_box(GroupStore::open(&path).expect("open")));
    });
}

criterion_group!(benches, bench_principal_replay, bench_group_replay);
criterion_main!(benches);
