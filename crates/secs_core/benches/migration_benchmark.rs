//! # Migration Benchmark
//!
//! Measures archetype migration and the graph lookup behind it:
//! 1. Adding a component to many entities (memoized edge after the first)
//! 2. Add/remove churn on one type
//! 3. Edge lookup with a wide graph, where the matrix row scan grows with V

#![allow(missing_docs)]
#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde::Serialize;

use secs_core::{impl_component, ArchetypeId, ComponentType, Registry};

#[derive(Clone, Copy, Zeroable, Pod, Serialize)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Zeroable, Pod, Serialize)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

/// Distinct marker types so the graph can be made wide.
macro_rules! markers {
    ($($name:ident),+) => {
        $(
            #[derive(Clone, Copy, Zeroable, Pod, Serialize)]
            #[repr(C)]
            struct $name(u32);
        )+
        impl_component!(Inline: $($name),+);
    };
}

markers!(M0, M1, M2, M3, M4, M5, M6, M7);

impl_component!(Inline: Position, Velocity);

const ENTITY_COUNT: usize = 10_000;

fn bench_add_component(c: &mut Criterion) {
    c.bench_function("add_position_velocity_10k", |b| {
        b.iter(|| {
            let mut registry = Registry::new();
            for i in 0..ENTITY_COUNT {
                let e = registry.create_entity();
                let f = i as f32;
                let _ = registry.add_component(e, Position { x: f, y: f, z: f });
                let _ = registry.add_component(e, Velocity { x: 1.0, y: 0.0, z: 0.0 });
            }
            black_box(registry.entity_count())
        });
    });
}

fn bench_churn(c: &mut Criterion) {
    let mut registry = Registry::new();
    let entities: Vec<_> = (0..ENTITY_COUNT)
        .map(|_| {
            let e = registry.create_entity();
            let _ = registry.add_component(e, Position { x: 0.0, y: 0.0, z: 0.0 });
            e
        })
        .collect();

    c.bench_function("velocity_add_remove_churn_10k", |b| {
        b.iter(|| {
            for &e in &entities {
                let _ = registry.add_component(e, Velocity { x: 0.0, y: 1.0, z: 0.0 });
            }
            for &e in &entities {
                let _ = registry.remove_component::<Velocity>(e);
            }
            black_box(registry.version())
        });
    });
}

fn bench_edge_lookup(c: &mut Criterion) {
    // Every subset of 8 markers reachable from one entity walk: 256 vertices
    let mut registry = Registry::new();
    for mask in 0u32..256 {
        let e = registry.create_entity();
        macro_rules! add_if {
            ($($bit:literal => $ty:ident),+) => {
                $( if mask & (1 << $bit) != 0 { let _ = registry.add_component(e, $ty(mask)); } )+
            };
        }
        add_if!(0 => M0, 1 => M1, 2 => M2, 3 => M3, 4 => M4, 5 => M5, 6 => M6, 7 => M7);
    }
    let graph = registry.graph();
    let label = ComponentType::of::<M7>().id();

    c.bench_function("edge_lookup_wide_graph", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for index in 0..graph.vertex_count() {
                if graph.edge(ArchetypeId::from_index(index), label).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
}

criterion_group!(benches, bench_add_component, bench_churn, bench_edge_lookup);
criterion_main!(benches);
