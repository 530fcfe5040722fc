//! 条件评估性能基准测试
//!
//! 针对操作符评估和表达式树求值进行细粒度的性能测试。

use condition_engine::{
    ConditionCompiler, ConditionEvaluator, ConditionExecutor, Operator, Record, evaluate,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

/// 比较操作基准
fn bench_comparison_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("comparison_operations");

    let field = json!(1000);
    let expected = json!(500);
    let loose_expected = json!("500");

    for op in [Operator::Eq, Operator::Ne, Operator::Gt, Operator::Lte] {
        group.bench_function(op.to_string(), |b| {
            b.iter(|| {
                ConditionEvaluator::evaluate(
                    black_box(Some(&field)),
                    black_box(op),
                    black_box(&expected),
                )
            })
        });
    }

    group.bench_function("loose_eq", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::LooseEq),
                black_box(&loose_expected),
            )
        })
    });

    group.finish();
}

/// 字符串与正则操作基准
fn bench_string_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_operations");

    let field = json!("user@example.com");
    let needle = json!("example");
    let pattern = json!(r"^[\w.-]+@[\w.-]+\.\w+$");

    group.bench_function("contains", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::Contains),
                black_box(&needle),
            )
        })
    });

    // 每次调用都编译正则
    group.bench_function("regex_uncached", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&field)),
                black_box(Operator::Regex),
                black_box(&pattern),
            )
        })
    });

    let mut compiler = ConditionCompiler::new();
    let compiled = compiler
        .compile(json!({ "email": { "regex": pattern.clone() } }))
        .expect("valid expression");
    let record = Record::new(json!({ "email": "user@example.com" }));
    let executor = ConditionExecutor::new();

    group.bench_function("regex_precompiled", |b| {
        b.iter(|| executor.matches(black_box(compiled.root()), black_box(&record)))
    });

    group.finish();
}

/// In 操作符不同列表大小的性能
fn bench_in_operator_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("in_operator_scaling");

    let field = json!("target");

    for size in [5, 10, 50, 100, 500].iter() {
        let list: Vec<Value> = (0..*size)
            .map(|i| {
                if i == size - 1 {
                    json!("target")
                } else {
                    json!(format!("item_{}", i))
                }
            })
            .collect();
        let list_value = Value::Array(list);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                ConditionEvaluator::evaluate(
                    black_box(Some(&field)),
                    black_box(Operator::In),
                    black_box(&list_value),
                )
            })
        });
    }

    group.finish();
}

/// 表达式树求值：预编译 vs 每次解析
fn bench_expression_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_tree");

    let expr = json!({
        "AND": [
            { "status": "active" },
            { "OR": [ { "role": { "in": ["admin", "owner"] } }, { "age": { "gte": 18 } } ] }
        ]
    });
    let record = Record::new(json!({ "status": "active", "role": "owner", "age": 17 }));

    group.bench_function("parse_and_evaluate", |b| {
        b.iter(|| evaluate(black_box(&record), black_box(&expr)))
    });

    let mut compiler = ConditionCompiler::new();
    let compiled = compiler.compile(expr.clone()).expect("valid expression");
    let executor = ConditionExecutor::new();

    group.bench_function("precompiled", |b| {
        b.iter(|| executor.matches(black_box(compiled.root()), black_box(&record)))
    });

    let traced = ConditionExecutor::new().with_trace();
    group.bench_function("precompiled_with_trace", |b| {
        b.iter(|| traced.execute(black_box(&compiled), black_box(&record)))
    });

    group.finish();
}

/// 嵌套深度对求值的影响
fn bench_nesting_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("nesting_depth");
    let record = Record::new(json!({ "a": 1 }));

    for depth in [1usize, 8, 32, 63].iter() {
        let mut expr = json!({ "a": 1 });
        for _ in 1..*depth {
            expr = json!({ "AND": [expr] });
        }
        let compiled = ConditionCompiler::new()
            .compile(expr)
            .expect("depth within limit");
        let executor = ConditionExecutor::new();

        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| executor.matches(black_box(compiled.root()), black_box(&record)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_comparison_operations,
    bench_string_operations,
    bench_in_operator_scaling,
    bench_expression_tree,
    bench_nesting_depth,
);

criterion_main!(benches);
