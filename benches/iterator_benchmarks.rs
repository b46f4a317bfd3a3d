//! Iterator traversal and per-row property resolution benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use graphflow::context::iterator::SequentialIter;
use graphflow::context::QueryExpressionContext;
use graphflow::{DataSet, ExecutionContext, Expression, Iter, Row, Value};

fn make_iter(rows: usize) -> Iter {
    let mut ds = DataSet::new(["col1", "col2", "col3"]);
    for i in 0..rows {
        ds.push(Row::from(vec![
            Value::Int(i as i64),
            Value::string(format!("row-{i}")),
            Value::Float(i as f64 * 0.5),
        ]));
    }
    Iter::Sequential(SequentialIter::new(Arc::new(Value::dataset(ds))))
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_scan");
    for size in [1_000usize, 10_000, 100_000] {
        let iter = make_iter(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut it = iter.copy();
                let mut sum = 0i64;
                while it.valid() {
                    sum += it.get_column("col1").as_int().unwrap_or_default();
                    it.next();
                }
                sum
            });
        });
    }
    group.finish();
}

fn bench_input_prop_eval(c: &mut Criterion) {
    let ectx = ExecutionContext::new();
    let expr = Expression::input_prop("col2");
    let mut group = c.benchmark_group("input_prop_eval");
    for size in [1_000usize, 10_000] {
        let iter = make_iter(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut it = iter.copy();
                let mut len = 0usize;
                while it.valid() {
                    let ctx = QueryExpressionContext::new(&ectx).with_iter(&it);
                    if let Value::Str(s) = expr.eval(&ctx) {
                        len += s.len();
                    }
                    it.next();
                }
                len
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan, bench_input_prop_eval);
criterion_main!(benches);
