use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use metaclad::loader::MemoryLoader;
use metaclad::Model;

const ORDER: u64 = 1;

fn definition() -> Value {
    json!({"objects": [
        {"id": 1, "alias": "ORDER", "namespace": "shop", "uid_attribute": "ID",
         "attributes": [
            {"id": 11, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 12, "alias": "CUSTOMER", "data_type": "Integer"}
         ],
         "relations": [{"id": 101, "alias": "CUSTOMER", "left_key": "CUSTOMER", "right_object": 2}]},
        {"id": 2, "alias": "CUSTOMER", "namespace": "shop", "uid_attribute": "ID",
         "attributes": [
            {"id": 21, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 22, "alias": "ADDRESS", "data_type": "Integer"}
         ],
         "relations": [{"id": 102, "alias": "ADDRESS", "left_key": "ADDRESS", "right_object": 3}]},
        {"id": 3, "alias": "ADDRESS", "namespace": "shop", "uid_attribute": "ID",
         "attributes": [
            {"id": 31, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 32, "alias": "CITY"}
         ]}
    ]})
}

fn model(definition: &Value) -> Model {
    let loader = MemoryLoader::from_value(definition.clone()).unwrap();
    Model::new(Box::new(loader))
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let definition = definition();

    c.bench_function("resolve cold", |b| {
        b.iter(|| {
            let mut model = model(&definition);
            black_box(model.get_attribute(ORDER, black_box("CUSTOMER__ADDRESS__CITY")).unwrap())
        })
    });

    let mut warm = model(&definition);
    warm.get_attribute(ORDER, "CUSTOMER__ADDRESS__CITY").unwrap();
    c.bench_function("resolve cached", |b| {
        b.iter(|| black_box(warm.get_attribute(ORDER, black_box("CUSTOMER__ADDRESS__CITY")).unwrap()))
    });

    c.bench_function("resolve after clearing caches", |b| {
        b.iter(|| {
            warm.clear_attribute_caches();
            black_box(warm.get_attribute(ORDER, black_box("CUSTOMER__ADDRESS__CITY")).unwrap())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
