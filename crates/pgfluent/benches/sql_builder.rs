use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgfluent::prelude::*;
use pgfluent::params::{ParamMap, interpolate, to_positional};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

struct NullClient;

impl GenericClient for NullClient {
    async fn query(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        Ok(vec![])
    }

    async fn execute(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        Ok(0)
    }

    async fn batch_execute(&self, _: &str) -> DbResult<()> {
        Ok(())
    }
}

/// SELECT col0, col1, ... FROM t WHERE col0 = :col0 AND col1 = :col1 ...
fn build_select(db: &Database<NullClient>, n: usize) -> QueryBuilder<'_, NullClient> {
    let columns: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let mut qb = db.table("t").select(columns.clone());
    for (i, column) in columns.iter().enumerate() {
        qb = qb.where_eq(column, i as i64);
    }
    qb.order_by("col0", "DESC").limit(10)
}

fn bench_to_sql(c: &mut Criterion) {
    let db = Database::new(NullClient, DatabaseConfig::new());
    let mut group = c.benchmark_group("sql_builder/to_sql");

    for n in [1, 5, 10, 50, 100] {
        let qb = build_select(&db, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &qb, |b, qb| {
            b.iter(|| black_box(qb.to_sql()));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let db = Database::new(NullClient, DatabaseConfig::new());
    let mut group = c.benchmark_group("sql_builder/build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(&db, n).build()));
        });
    }

    group.finish();
}

fn bench_where_in(c: &mut Criterion) {
    let db = Database::new(NullClient, DatabaseConfig::new());
    let mut group = c.benchmark_group("sql_builder/where_in");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let qb = db.table("t").where_in("id", values.iter().copied());
                black_box(qb.to_sql());
            });
        });
    }

    group.finish();
}

fn bench_placeholders(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/placeholders");

    for n in [1, 10, 100] {
        let db = Database::new(NullClient, DatabaseConfig::new());
        let (sql, params): (String, ParamMap) = build_select(&db, n).build();

        group.bench_with_input(BenchmarkId::new("to_positional", n), &(&sql, &params), |b, (sql, params)| {
            b.iter(|| black_box(to_positional(sql, params)));
        });
        group.bench_with_input(BenchmarkId::new("interpolate", n), &(&sql, &params), |b, (sql, params)| {
            b.iter(|| black_box(interpolate(sql, params)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_to_sql,
    bench_build_and_render,
    bench_where_in,
    bench_placeholders
);
criterion_main!(benches);
