use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode};
use rand::{rngs::StdRng, Rng, SeedableRng};

use cyphera::{Engine, MemoryGraph, PropertyMap, Value};

fn gen_store(people: usize, avg_degree: usize, seed: u64) -> MemoryGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let store = MemoryGraph::new();
    for i in 0..people {
        let mut props = PropertyMap::new();
        props.insert("name".into(), Value::Str(format!("p{}", i)));
        store
            .insert_node_with_id(Value::Int(i as i64), ["Person"], props)
            .expect("seed node");
    }
    let mut rel_id = people as i64;
    for src in 0..people {
        for _ in 0..avg_degree {
            let mut dst = rng.gen::<usize>() % people;
            if dst == src {
                dst = (dst + 1) % people;
            }
            store
                .insert_rel_with_id(
                    Value::Int(rel_id),
                    "KNOWS",
                    Value::Int(src as i64),
                    Value::Int(dst as i64),
                    PropertyMap::new(),
                )
                .expect("seed rel");
            rel_id += 1;
        }
    }
    store
}

fn bench_parse(c: &mut Criterion) {
    let query = "MATCH (a:Person {name:'p1'})-[r:KNOWS]->(b:Person) \
                 WHERE b.name STARTS WITH 'p' \
                 RETURN a.name AS a, b.name AS b ORDER BY b LIMIT 10";
    c.bench_function("parse_chain_query", |bencher| {
        bencher.iter(|| cyphera::parser::parse_script(query).expect("parse"));
    });
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_two_hop");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    for &n in &[500usize, 2_000usize] {
        let store = gen_store(n, 4, 0xC1_F4E6);
        group.bench_with_input(BenchmarkId::from_parameter(n), &store, |bencher, store| {
            let engine = Engine::new(store);
            bencher.iter(|| {
                engine
                    .run("MATCH (a:Person {name:'p0'})-[:KNOWS]->(b)-[:KNOWS]->(c) RETURN c.name AS n")
                    .collect_rows()
                    .expect("query")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_match);
criterion_main!(benches);
