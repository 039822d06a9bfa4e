//! Benchmarks for mapping compilation and execution
//!
//! These benchmarks separate the one-time compile cost from the per-call
//! execution cost, and measure the cache hit path in between.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mapado_core::{
    AdapterConfig, AdapterSettings, MapKind, TypeModel, TypeRef, TypeRegistry, Value,
};

fn create_test_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeModel::new("Order")
            .member("Id", TypeRef::STR)
            .member("Total", TypeRef::FLOAT)
            .member("Customer", TypeRef::named("Customer")),
    );
    registry.register(
        TypeModel::new("Customer")
            .member("Id", TypeRef::STR)
            .member("Name", TypeRef::STR),
    );
    registry.register(
        TypeModel::new("OrderDto")
            .member("Id", TypeRef::STR)
            .member("Total", TypeRef::FLOAT)
            .member("Customer", TypeRef::named("CustomerDto")),
    );
    registry.register(
        TypeModel::new("CustomerDto")
            .member("Id", TypeRef::STR)
            .member("Name", TypeRef::STR),
    );
    registry
}

fn create_test_order() -> Value {
    Value::record(
        "Order",
        [
            ("Id", Value::Str("order-1".into())),
            ("Total", Value::Float(99.5)),
            (
                "Customer",
                Value::record(
                    "Customer",
                    [
                        ("Id", Value::Str("customer-1".into())),
                        ("Name", Value::Str("Ada".into())),
                    ],
                ),
            ),
        ],
    )
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    group.bench_function("cold", |b| {
        b.iter(|| {
            let config = AdapterConfig::new(create_test_registry());
            black_box(
                config
                    .compile("Order", "OrderDto", MapKind::NewInstance)
                    .unwrap(),
            );
        })
    });

    group.bench_function("cached", |b| {
        let config = AdapterConfig::new(create_test_registry());
        config
            .compile("Order", "OrderDto", MapKind::NewInstance)
            .unwrap();
        b.iter(|| {
            black_box(
                config
                    .compile("Order", "OrderDto", MapKind::NewInstance)
                    .unwrap(),
            );
        })
    });

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    let order = create_test_order();

    group.bench_function("inline_plan", |b| {
        let config = AdapterConfig::new(create_test_registry());
        let mapping = config
            .compile("Order", "OrderDto", MapKind::NewInstance)
            .unwrap();
        b.iter(|| black_box(mapping.map(&order).unwrap()))
    });

    group.bench_function("preserving_plan", |b| {
        let mut config = AdapterConfig::new(create_test_registry());
        config.set_global(AdapterSettings::new().preserve_reference(true));
        let mapping = config
            .compile("Order", "OrderDto", MapKind::NewInstance)
            .unwrap();
        b.iter(|| black_box(mapping.map(&order).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);
