//! Benchmarks for the per-call hot paths: dynamic SQL evaluation, cache key
//! construction and cache model lookups.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqlmap_core::{CacheKey, CacheModel, CacheModelDef, ObjectAccessor, Sql};
use sqlmap_lang::parse_template;
use sqlmap_value::{Object, Value};

const SEARCH: &str = "SELECT * FROM orders \
    <dynamic prepend=\"WHERE\">\
      <isNotNull prepend=\"AND\" property=\"status\">status = #status#</isNotNull>\
      <isGreaterThan prepend=\"AND\" property=\"total\" compareValue=\"100\">total > #total#</isGreaterThan>\
      <iterate prepend=\"AND\" property=\"ids\" open=\"id IN (\" close=\")\" conjunction=\",\">#ids[]#</iterate>\
    </dynamic> ORDER BY id";

fn search_parameter(ids: usize) -> Value {
    Value::Object(
        Object::map()
            .with("status", "open")
            .with("total", 250i64)
            .with("ids", Value::list((0..ids as i64).collect::<Vec<_>>())),
    )
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql/evaluate");
    let sql = Sql::compile(parse_template(SEARCH).expect("template"), true).expect("compile");
    let accessor = ObjectAccessor::new();

    for ids in [1usize, 10, 100] {
        let parameter = search_parameter(ids);
        group.bench_with_input(BenchmarkId::new("dynamic", ids), &parameter, |b, parameter| {
            b.iter(|| black_box(sql.request(parameter, &accessor).expect("request")));
        });
    }

    let fixed = Sql::compile(
        parse_template("SELECT * FROM orders WHERE id = #id# AND status = #status#").expect("template"),
        true,
    )
    .expect("compile");
    let parameter = search_parameter(1);
    group.bench_function("static", |b| {
        b.iter(|| black_box(fixed.request(&parameter, &accessor).expect("request")));
    });
    group.finish();
}

fn bench_cache_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache/key");
    for values in [4usize, 32] {
        let bound: Vec<Value> = (0..values as i64).map(Value::Int64).collect();
        group.bench_with_input(BenchmarkId::new("fold", values), &bound, |b, bound| {
            b.iter(|| {
                let mut key = CacheKey::new();
                key.update("list").update("findOrders").update("main.db");
                for value in bound {
                    key.update_value(value);
                }
                key.update("SELECT * FROM orders WHERE id IN (?, ?, ?)");
                black_box(key)
            });
        });
    }
    group.finish();
}

fn key(i: u64) -> CacheKey {
    let mut key = CacheKey::new();
    key.update("findOrder").update(i.to_le_bytes());
    key
}

fn bench_cache_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache/model");
    let value = search_parameter(10);

    for (name, def) in [
        ("lru", CacheModelDef::lru("orders", 1_000)),
        ("fifo", CacheModelDef::fifo("orders", 1_000)),
        ("serialized", CacheModelDef::unbounded("orders").serialize(true).read_only(false)),
    ] {
        let cache = CacheModel::from_def(&def, 1_000);
        for i in 0..1_000 {
            cache.put(key(i), &value).expect("put");
        }
        group.bench_function(BenchmarkId::new("get_hit", name), |b| {
            let mut i = 0u64;
            b.iter(|| {
                i = (i + 1) % 1_000;
                black_box(cache.get(&key(i)).expect("get"))
            });
        });
        group.bench_function(BenchmarkId::new("put_evict", name), |b| {
            let mut i = 1_000u64;
            b.iter(|| {
                i += 1;
                cache.put(key(i), &value).expect("put");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_cache_key, bench_cache_model);
criterion_main!(benches);
