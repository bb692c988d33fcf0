// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean composition through the engine adapter

use anyhow::Result;
use approx::assert_relative_eq;
use facemesh::engine::{CsgEngine, Instrumented, MetricsRecorder};
use facemesh::{
    EngineConfig, EngineError, FaceIdAllocator, FaceNaming, Kernel, KernelConfig, KernelError, MeshBuffer,
    Primitive,
};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

fn block(kernel: &Arc<Kernel>, name: &str, offset: f64) -> MeshBuffer {
    let mut mesh = Primitive::cube([2.0; 3], false).to_mesh(kernel, &FaceNaming::uniform(name));
    mesh.translate([offset; 3]);
    mesh
}

#[test]
fn test_inclusion_exclusion() -> Result<()> {
    let kernel = Kernel::new().shared();
    let mut a = block(&kernel, "a", 0.0);
    let mut b = block(&kernel, "b", 1.0);

    let union = a.union(&mut b)?;
    let intersection = a.intersect(&mut b)?;
    let difference = a.subtract(&mut b)?;

    assert_relative_eq!(union.signed_volume(), 15.0, epsilon = 1e-6);
    assert_relative_eq!(intersection.signed_volume(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(difference.signed_volume(), 7.0, epsilon = 1e-6);
    assert_relative_eq!(
        union.signed_volume() + intersection.signed_volume(),
        a.signed_volume() + b.signed_volume(),
        epsilon = 1e-6
    );
    Ok(())
}

#[test]
fn test_labels_survive_union() -> Result<()> {
    let kernel = Kernel::new().shared();
    let mut a = block(&kernel, "X", 0.0);
    let mut b = block(&kernel, "Y", 1.0);

    let union = a.union(&mut b)?;
    let mut names = union.face_names();
    names.sort();
    assert_eq!(names, vec!["X".to_string(), "Y".to_string()]);
    assert!(!union.face("X").is_empty());
    assert!(!union.face("Y").is_empty());
    assert_eq!(
        union.face("X").triangle_count() + union.face("Y").triangle_count(),
        union.triangle_count()
    );
    assert!(union.face("Z").is_empty());
    assert!(!union.is_dirty());
    assert!(union.has_engine_handle());
    Ok(())
}

#[test]
fn test_drilled_block_keeps_hole_face() -> Result<()> {
    let kernel = Kernel::new().shared();
    let mut part = Primitive::cube([2.0; 3], false).to_mesh(&kernel, &FaceNaming::per_side("block"));
    let mut drill = Primitive::cylinder(4.0, 0.5, 32).to_mesh(&kernel, &FaceNaming::uniform("hole"));
    drill.translate([1.0, 1.0, -1.0]);

    let result = part.subtract(&mut drill)?;
    let hole = result.face("hole");
    assert!(!hole.is_empty());
    assert!(result.face("block_top").triangle_count() > 2);
    // Block minus an inscribed 32-gon prism through its full height
    let prism = 0.5 * 32.0 * 0.25 * (2.0 * PI / 32.0).sin() * 2.0;
    assert_relative_eq!(result.signed_volume(), 8.0 - prism, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_non_manifold_input_is_reported() {
    let kernel = Kernel::new().shared();
    let mut fin = MeshBuffer::new(&kernel).with_feature("fin");
    fin.add_triangle("fin", [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
    fin.add_triangle("fin", [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]);
    fin.add_triangle("fin", [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
    let mut other = block(&kernel, "b", 0.0);

    let err = match fin.union(&mut other) {
        Ok(_) => panic!("union of a non-manifold mesh succeeded"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("feature 'fin'"));
    match err {
        KernelError::ConstructionFailure {
            feature,
            triangles,
            source,
            ..
        } => {
            assert_eq!(feature.as_deref(), Some("fin"));
            assert_eq!(triangles, 3);
            assert!(matches!(source, EngineError::NonManifoldEdge { uses: 3, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fin.is_dirty());
}

#[test]
fn test_idle_handles_are_released_and_rebuilt() -> Result<()> {
    let config = KernelConfig {
        idle_release_ms: Some(1),
        ..KernelConfig::default()
    };
    let kernel = Kernel::with_config(config).shared();
    let mut mesh = block(&kernel, "a", 0.0);

    let first = mesh.validated_mesh()?;
    assert_eq!(first.triangle_count(), 12);
    std::thread::sleep(Duration::from_millis(20));
    kernel.release_idle();
    assert!(!mesh.has_engine_handle());

    let rebuilt = mesh.validated_mesh()?;
    assert_eq!(rebuilt.triangle_count(), 12);
    assert_eq!(rebuilt.vertex_count(), 8);
    Ok(())
}

#[test]
fn test_engine_calls_are_recorded() -> Result<()> {
    let recorder = MetricsRecorder::new();
    let engine = CsgEngine::new(Arc::new(FaceIdAllocator::new()), EngineConfig::default());
    let kernel = Kernel::with_engine(
        Arc::new(Instrumented::new(engine, recorder.clone())),
        KernelConfig::default(),
    )
    .shared();

    let mut a = block(&kernel, "a", 0.0);
    let mut b = block(&kernel, "b", 1.0);
    a.union(&mut b)?;

    let summary = recorder.summary();
    assert_eq!(summary["construct"].calls, 2);
    assert_eq!(summary["union"].calls, 1);
    assert_eq!(summary["union"].failures, 0);
    assert!(summary.contains_key("extract"));
    Ok(())
}
