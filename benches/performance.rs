// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facemesh::{FaceNaming, Kernel, MeshBuffer, Primitive};
use std::sync::Arc;

fn nested_shells(kernel: &Arc<Kernel>, segments: u32) -> MeshBuffer {
    let mut outer = Primitive::cylinder(4.0, 2.0, segments).to_mesh(kernel, &FaceNaming::uniform("outer"));
    let mut inner = Primitive::cube([1.0; 3], true).to_mesh(kernel, &FaceNaming::uniform("inner"));
    inner.translate([0.1, 0.2, 2.0]);
    outer.append(&inner);
    outer
}

fn bench_primitives(c: &mut Criterion) {
    let kernel = Kernel::new().shared();
    let mut group = c.benchmark_group("primitives");

    group.bench_function("cube", |b| {
        b.iter(|| Primitive::cube(black_box([10.0; 3]), false).to_mesh(&kernel, &FaceNaming::per_side("c")))
    });

    for segments in [32u32, 128] {
        group.bench_with_input(BenchmarkId::new("cylinder", segments), &segments, |b, &segments| {
            b.iter(|| {
                Primitive::cylinder(black_box(20.0), black_box(5.0), segments)
                    .to_mesh(&kernel, &FaceNaming::per_side("cyl"))
            })
        });
    }

    group.finish();
}

fn bench_booleans(c: &mut Criterion) {
    let kernel = Kernel::with_config(facemesh::KernelConfig {
        idle_release_ms: None,
        ..Default::default()
    })
    .shared();
    let mut group = c.benchmark_group("booleans");
    group.sample_size(20);

    group.bench_function("cube_union", |b| {
        b.iter(|| {
            let mut a = Primitive::cube([10.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("a"));
            let mut other = Primitive::cube([10.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("b"));
            other.translate([5.0; 3]);
            a.union(&mut other)
        })
    });

    group.bench_function("drilled_block", |b| {
        b.iter(|| {
            let mut block = Primitive::cube([2.0; 3], false).to_mesh(&kernel, &FaceNaming::per_side("block"));
            let mut drill = Primitive::cylinder(4.0, 0.5, 32).to_mesh(&kernel, &FaceNaming::uniform("hole"));
            drill.translate([1.0, 1.0, -1.0]);
            block.subtract(&mut drill)
        })
    });

    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let kernel = Kernel::new().shared();
    let mut group = c.benchmark_group("repair");
    group.sample_size(20);

    group.bench_function("fix_windings", |b| {
        b.iter_batched(
            || {
                let mut mesh = Primitive::cylinder(4.0, 2.0, 128).to_mesh(&kernel, &FaceNaming::uniform("c"));
                mesh.rotate_z(15.0);
                mesh
            },
            |mut mesh| mesh.fix_windings(),
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("internal_raycast", |b| {
        b.iter_batched(
            || nested_shells(&kernel, 64),
            |mut mesh| mesh.remove_internal_triangles_by_raycast(),
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("internal_winding", |b| {
        b.iter_batched(
            || nested_shells(&kernel, 64),
            |mut mesh| mesh.remove_internal_triangles_by_winding(1e-3, 0.1),
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("split_self_intersections", |b| {
        b.iter_batched(
            || {
                let mut mesh = Primitive::cube([2.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("a"));
                let mut other = Primitive::cube([2.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("b"));
                other.translate([1.0, 0.5, 0.25]);
                mesh.append(&other);
                mesh
            },
            |mut mesh| mesh.split_self_intersecting_triangles(),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_primitives, bench_booleans, bench_repair);
criterion_main!(benches);
