//! Benchmarks for Gradient Decision
//!
//! Measures performance of:
//! - Candidate scoring against the state store
//! - Softmax selection at different temperatures
//! - Round-robin baseline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gradient_decision::{softmax_select, RoundRobin, Router, RouterConfig};
use gradient_fields::{FieldType, StateStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn populated_store(nodes: usize) -> (Arc<StateStore>, Vec<String>) {
    let store = Arc::new(StateStore::new("bench"));
    let ids: Vec<String> = (0..nodes).map(|i| format!("node-{i:04}")).collect();
    for (i, id) in ids.iter().enumerate() {
        let x = i as f64 / nodes as f64;
        store.update_contribution(id, FieldType::Health, 1.0 - x);
        store.update_contribution(id, FieldType::Load, x);
        store.update_contribution(id, FieldType::Capacity, 0.5);
    }
    (store, ids)
}

/// Benchmark full select_node (score + softmax) across mesh sizes
fn bench_select_node(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_node");

    for &nodes in &[3usize, 10, 100, 1000] {
        let (store, ids) = populated_store(nodes);
        let router = Router::new(store);
        let mut rng = StdRng::seed_from_u64(42);

        group.throughput(Throughput::Elements(nodes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &ids, |b, ids| {
            b.iter(|| router.select_node_with(black_box(ids), &mut rng))
        });
    }
    group.finish();
}

/// Benchmark softmax alone at different temperatures
fn bench_softmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("softmax_select");

    let (store, ids) = populated_store(100);
    let scores = Router::with_config(store, RouterConfig::default()).scores(&ids);
    let mut rng = StdRng::seed_from_u64(7);

    for &temperature in &[0.0f64, 0.05, 0.2, 1.0, 10.0] {
        group.bench_with_input(
            BenchmarkId::new("temperature", temperature),
            &temperature,
            |b, &t| b.iter(|| softmax_select(black_box(&scores), t, &mut rng)),
        );
    }
    group.finish();
}

/// Benchmark the round-robin baseline
fn bench_round_robin(c: &mut Criterion) {
    let (_, ids) = populated_store(100);
    let rr = RoundRobin::new();

    c.bench_function("round_robin_100", |b| b.iter(|| rr.select(black_box(&ids))));
}

criterion_group!(benches, bench_select_node, bench_softmax, bench_round_robin);
criterion_main!(benches);
