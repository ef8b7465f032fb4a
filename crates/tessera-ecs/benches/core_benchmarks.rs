//! Core microbenchmarks: `BitfieldArray` bulk ops, slab alloc/free churn,
//! and `update_transforms` over a synthetic hierarchy.
//!
//! Run with: `cargo bench --bench core_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tessera_ecs::prelude::*;

// ---------------------------------------------------------------------------
// BitfieldArray
// ---------------------------------------------------------------------------

fn bench_bitfield_set_bit(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitfield_set_bit");
    for &n in &[256usize, 4096, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut array = BitfieldArray::new();
                for i in 0..n {
                    array.set_bit(black_box(i));
                }
                black_box(array.popcount())
            });
        });
    }
    group.finish();
}

fn bench_bitfield_iter_set_bits(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitfield_iter_set_bits");
    for &n in &[256usize, 4096, 65536] {
        let mut array = BitfieldArray::new();
        for i in (0..n).step_by(2) {
            array.set_bit(i);
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &array, |b, array| {
            b.iter(|| {
                let count = array.iter_set_bits().count();
                black_box(count)
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Slab / ComponentRegistry churn
// ---------------------------------------------------------------------------

struct Payload {
    entity_global_id: u32,
    value: u64,
}
impl Component for Payload {
    const TYPE_ID: u32 = 1;
    const EXECUTION_PRIORITY: i32 = 0;
    fn entity_global_id(&self) -> u32 {
        self.entity_global_id
    }
    fn set_entity_global_id(&mut self, g: u32) {
        self.entity_global_id = g;
    }
}

fn bench_registry_alloc_free_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_alloc_free_churn");
    for &n in &[100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut registry = ComponentRegistry::<Payload>::new();
                let mut slots = Vec::with_capacity(n);
                for i in 0..n {
                    slots.push(registry.allocate(Payload {
                        entity_global_id: 0,
                        value: i as u64,
                    }));
                }
                for &slot in slots.iter().step_by(2) {
                    registry.free(slot);
                }
                for i in 0..n / 2 {
                    registry.allocate(Payload {
                        entity_global_id: 0,
                        value: i as u64,
                    });
                }
                black_box(registry.active_count())
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// EntityGraph::update_transforms
// ---------------------------------------------------------------------------

/// A flat hierarchy: one root with `n` direct children, all dirty.
fn build_flat_hierarchy(n: usize) -> (EntityGraph, GlobalIdRegistry, ComponentSystem) {
    let mut graph = EntityGraph::new(0);
    let mut global_ids = GlobalIdRegistry::new();
    let mut system = ComponentSystem::new();

    let mut root = graph.create_entity(&mut global_ids);
    root.try_create_component(Transform::new(Trs::IDENTITY), &mut system)
        .unwrap();
    graph.try_register_entity(&mut root, &mut global_ids);
    let root_id = root.identity();
    std::mem::forget(root);

    for _ in 0..n {
        let mut child = graph.create_entity(&mut global_ids);
        child
            .try_create_component(Transform::new(Trs::IDENTITY), &mut system)
            .unwrap();
        graph.try_register_entity(&mut child, &mut global_ids);
        let child_id = child.identity();
        graph.set_parent(child_id.graph_slot_id(), Some(root_id.graph_slot_id()));
        std::mem::forget(child);
    }

    (graph, global_ids, system)
}

fn bench_update_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_transforms");
    for &n in &[100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || build_flat_hierarchy(n),
                |(mut graph, _global_ids, mut system)| {
                    graph.update_transforms(system.get_registry::<Transform>());
                    black_box(&graph);
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_bitfield_set_bit,
    bench_bitfield_iter_set_bits,
    bench_registry_alloc_free_churn,
    bench_update_transforms,
);
criterion_main!(benches);
