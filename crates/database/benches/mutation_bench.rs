//! Benchmarks for the mutation pipeline and reactive fan-out.
//!
//! Run with: cargo bench -p rivulet-database

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rivulet_core::schema::{ColumnSpec, TableSpec};
use rivulet_database::{Database, Params, SubscriptionHandle};

const DEPARTMENTS: [&str; 5] = ["Engineering", "Sales", "Marketing", "HR", "Finance"];

fn setup(rows: usize) -> Database {
    let db = Database::new();
    db.define_spec(&TableSpec {
        name: "users".into(),
        columns: vec![
            ColumnSpec::new("id", "int").primary_key(),
            ColumnSpec::new("name", "text"),
            ColumnSpec::new("department", "text"),
            ColumnSpec::new("salary", "int"),
        ],
    })
    .unwrap();

    let insert = db
        .compile("insert into users (id, name, department, salary) values (:id, :name, :dept, :salary)")
        .unwrap();
    for i in 0..rows {
        let params = Params::new()
            .bind("id", i as i64)
            .bind("name", format!("User {}", i + 1))
            .bind("dept", DEPARTMENTS[i % DEPARTMENTS.len()])
            .bind("salary", 50_000 + (i % 100) as i64 * 1000);
        db.mutate(&insert, &params).unwrap();
    }
    db
}

/// One subscription per department, each filtered on its own department.
fn subscribe_departments(db: &Database, per_department: usize) -> Vec<SubscriptionHandle> {
    let query = db
        .compile("select id, salary from users where department = :dept")
        .unwrap();
    let mut handles = Vec::new();
    for _ in 0..per_department {
        for dept in DEPARTMENTS {
            let handle = db
                .subscribe(query.clone(), Params::new().bind("dept", dept))
                .unwrap();
            handle.on_change(|changes| {
                black_box(changes.len());
            });
            handles.push(handle);
        }
    }
    handles
}

fn mutation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutate");
    for rows in [100usize, 1_000, 10_000] {
        let db = setup(rows);
        let update = db
            .compile("update users set salary = :salary where id = :id")
            .unwrap();
        let mut salary = 0i64;
        group.bench_with_input(BenchmarkId::new("update_by_key", rows), &rows, |b, _| {
            b.iter(|| {
                salary += 1;
                let params = Params::new().bind("id", 7).bind("salary", salary);
                black_box(db.mutate(&update, &params).unwrap())
            })
        });
    }
    group.finish();
}

fn fanout_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");
    for subscribers in [1usize, 10, 100] {
        let db = setup(1_000);
        let _handles = subscribe_departments(&db, subscribers);
        let update = db
            .compile("update users set salary = :salary where id = :id")
            .unwrap();
        let mut salary = 0i64;
        group.bench_with_input(
            BenchmarkId::new("update_notify", subscribers * DEPARTMENTS.len()),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    salary += 1;
                    let params = Params::new().bind("id", 3).bind("salary", salary);
                    black_box(db.mutate(&update, &params).unwrap())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, mutation_benchmark, fanout_benchmark);
criterion_main!(benches);
