//! # Component Pool Benchmark
//!
//! Raw pool operations: append with growth, typed iteration, and the two
//! removal policies.

#![allow(missing_docs)]
#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde::Serialize;

use secs_core::{impl_component, ComponentPool, PoolConfig, RemovalPolicy};

#[derive(Clone, Copy, Zeroable, Pod, Serialize)]
#[repr(C)]
struct Transform {
    position: [f32; 3],
    rotation: [f32; 4],
    scale: f32,
}

impl_component!(Inline: Transform);

const COUNT: usize = 100_000;

fn filled(count: usize) -> ComponentPool {
    let mut pool = ComponentPool::of::<Transform>(PoolConfig::default()).unwrap();
    for i in 0..count {
        pool.push(Transform {
            position: [i as f32; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: 1.0,
        })
        .unwrap();
    }
    pool
}

fn bench_push(c: &mut Criterion) {
    c.bench_function("pool_push_100k", |b| {
        b.iter(|| black_box(filled(COUNT).len()));
    });
}

fn bench_iterate(c: &mut Criterion) {
    let pool = filled(COUNT);
    c.bench_function("pool_as_slice_sum_100k", |b| {
        b.iter(|| {
            let sum: f32 = pool
                .as_slice::<Transform>()
                .unwrap()
                .iter()
                .map(|t| t.position[0])
                .sum();
            black_box(sum)
        });
    });
}

fn bench_remove(c: &mut Criterion) {
    for (name, policy) in [
        ("pool_swap_remove_1k_of_10k", RemovalPolicy::SwapRemove),
        ("pool_shift_down_1k_of_10k", RemovalPolicy::ShiftDown),
    ] {
        c.bench_function(name, |b| {
            b.iter_batched(
                || filled(10_000),
                |mut pool| {
                    for _ in 0..1_000 {
                        pool.remove(0, policy);
                    }
                    black_box(pool.len())
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
}

criterion_group!(benches, bench_push, bench_iterate, bench_remove);
criterion_main!(benches);
