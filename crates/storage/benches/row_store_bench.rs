//! Benchmarks for store mutations and filtered reads.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rivulet_core::schema::{Table, TableBuilder};
use rivulet_core::{CompareOp, DataType, Row, Value};
use rivulet_storage::{Assignment, Condition, Filter, MutationOp, Store};
use std::sync::Arc;

fn quotes_schema() -> Arc<Table> {
    Arc::new(
        TableBuilder::new("quotes")
            .unwrap()
            .add_column("id", DataType::Int)
            .unwrap()
            .add_column("price", DataType::Float)
            .unwrap()
            .add_column("symbol", DataType::Text)
            .unwrap()
            .add_column("sector", DataType::Text)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap(),
    )
}

fn populated(count: i64) -> Store {
    let sectors = ["Tech", "Finance", "Health", "Energy", "Consumer"];
    let rows = (1..=count)
        .map(|i| {
            Row::new(vec![
                Value::Int(i),
                Value::Float(100.0 + i as f64 * 0.1),
                Value::Text(format!("SYM{i}")),
                Value::from(sectors[i as usize % sectors.len()]),
            ])
        })
        .collect();
    let mut store = Store::with_tables([&quotes_schema()]);
    store.apply("quotes", MutationOp::Insert { rows }).unwrap();
    store
}

fn sector_is(sector: &str) -> Filter {
    Filter::new(vec![Condition::new(3, DataType::Text, CompareOp::Eq, Value::from(sector))])
}

fn store_update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_update");
    for count in [1_000i64, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("sector", count), &count, |b, &count| {
            b.iter_batched(
                || populated(count),
                |mut store| {
                    let outcome = store
                        .apply(
                            "quotes",
                            MutationOp::Update {
                                filter: sector_is("Tech"),
                                assignments: vec![Assignment::new(1, Value::Float(1.0))],
                            },
                        )
                        .unwrap();
                    black_box(outcome)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn store_select_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_select");
    let store = populated(100_000);
    let state = store.read("quotes").unwrap();

    group.bench_function("scan_filter", |b| {
        b.iter(|| black_box(state.select(&sector_is("Energy")).len()))
    });
    group.bench_function("key_lookup", |b| {
        let filter = Filter::new(vec![Condition::new(0, DataType::Int, CompareOp::Eq, Value::Int(54_321))]);
        b.iter(|| black_box(state.select(&filter).len()))
    });
    group.finish();
}

criterion_group!(benches, store_update_benchmark, store_select_benchmark);
criterion_main!(benches);
