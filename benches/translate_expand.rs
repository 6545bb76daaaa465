//! Criterion benchmarks for the per-call hot path: template translation (cold and
//! memoized), IN-list expansion at several widths, and a single-row `Select` against a
//! pooled `SQLite` file.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sql_ops::prelude::*;
use tokio::runtime::Runtime;

const NAMED: &str = "update t set cnt = :cnt where name in (:name) and id > :min -- :ignored\n limit :limit";
const POSITIONAL: &str = "select id, name, cnt from t where name = ? and cnt in (?) and note <> '?'";

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    group.bench_function("named_cold", |b| {
        b.iter(|| translate(black_box(NAMED), PlaceholderStyle::Sqlite));
    });
    group.bench_function("positional_cold", |b| {
        b.iter(|| translate(black_box(POSITIONAL), PlaceholderStyle::Postgres));
    });
    group.bench_function("named_cached", |b| {
        b.iter(|| translate_cached(black_box(NAMED), PlaceholderStyle::Sqlite));
    });
    group.finish();
}

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand_in_list");
    let Ok(plan) = translate(NAMED, PlaceholderStyle::Sqlite) else {
        return;
    };
    for width in [1_usize, 10, 100, 1000] {
        let names: Vec<String> = (0..width).map(|i| format!("name{i}")).collect();
        let source = named_params! { "cnt" => 5, "name" => names, "min" => 0, "limit" => 10 };
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &source, |b, source| {
            b.iter(|| expand(black_box(&plan), black_box(source)));
        });
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let Ok(rt) = Runtime::new() else {
        return;
    };
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let path = dir.path().join("bench.sqlite");
    let setup = rt.block_on(async {
        let pool = ConfigAndPool::new_sqlite(PoolConfig::sqlite(path.to_string_lossy())).await?;
        let mut ctx = pool.context();
        ctx.execute_batch("create table t (id integer primary key, name text, cnt integer)")
            .await?;
        Ok::<_, SqlOpsError>((pool, ctx))
    });
    let Ok((_pool, mut ctx)) = setup else {
        return;
    };
    let seed = BatchInsert::declare(
        "insert into t (id, name, cnt) values (?, ?, ?)",
        |n: i64| (1..=n).map(|i| params![i, format!("name{i}"), i]).collect(),
    );
    if rt.block_on(seed.call(&mut ctx, 1000)).is_err() {
        return;
    }

    let by_id = Select::new("select id, name, cnt from t where id = ?");
    let mut group = c.benchmark_group("select_one");
    group.bench_function("map_row", |b| {
        let mut id = 0_i64;
        b.iter(|| {
            id = id % 1000 + 1;
            rt.block_on(by_id.call(&mut ctx, params![id]))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_translate, bench_expand, bench_select);
criterion_main!(benches);
