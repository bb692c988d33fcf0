// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Repair toolkit on damaged meshes

use anyhow::Result;
use approx::assert_relative_eq;
use facemesh::{FaceNaming, IslandOptions, Kernel, MeshBuffer, Primitive};
use std::sync::Arc;

fn nested_cubes(kernel: &Arc<Kernel>) -> MeshBuffer {
    let mut outer = Primitive::cube([4.0; 3], false).to_mesh(kernel, &FaceNaming::uniform("outer"));
    let mut inner = Primitive::cube([1.0; 3], false).to_mesh(kernel, &FaceNaming::uniform("inner"));
    inner.translate([1.0, 1.2, 1.4]);
    outer.append(&inner);
    outer
}

#[test]
fn test_stray_triangle_is_removed() {
    let kernel = Kernel::new().shared();
    let mut mesh = Primitive::cube([1.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("body"));
    mesh.add_triangle("debris", [5.0, 5.0, 5.0], [6.0, 5.0, 5.0], [5.0, 6.0, 5.0]);

    let options = IslandOptions {
        max_triangles: 4,
        remove_internal: true,
        remove_external: true,
    };
    assert_eq!(mesh.remove_small_islands(options), 1);
    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(mesh.vertex_count(), 8);
    assert!(mesh.face("debris").is_empty());
    // Emptied labels stay registered
    assert!(mesh.face_id("debris").is_some());
}

#[test]
fn test_nested_shell_removed_by_every_classifier() {
    let kernel = Kernel::new().shared();

    let mut by_raycast = nested_cubes(&kernel);
    assert_eq!(by_raycast.remove_internal_triangles_by_raycast(), 12);

    let mut by_winding = nested_cubes(&kernel);
    let repair = &kernel.config().repair;
    assert_eq!(
        by_winding.remove_internal_triangles_by_winding(repair.winding_offset_scale, repair.winding_crossing_tolerance),
        12
    );

    let mut by_island = nested_cubes(&kernel);
    assert_eq!(by_island.remove_small_islands(IslandOptions::default()), 12);

    for mesh in [&by_raycast, &by_winding, &by_island] {
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.face("inner").is_empty());
        assert_relative_eq!(mesh.signed_volume(), 64.0, epsilon = 1e-9);
    }
}

#[test]
fn test_crossing_triangles_are_split() {
    let kernel = Kernel::new().shared();
    let mut mesh = MeshBuffer::new(&kernel);
    mesh.add_triangle("floor", [0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0]);
    mesh.add_triangle("wall", [-1.5, 1.0, -1.0], [4.5, 1.0, -1.0], [1.5, 1.0, 1.0]);
    let area = mesh.surface_area();

    assert_eq!(mesh.split_self_intersecting_triangles(), 2);
    assert_eq!(mesh.triangle_count(), 6);
    assert_eq!(mesh.face("floor").triangle_count(), 3);
    assert_eq!(mesh.face("wall").triangle_count(), 3);
    assert_relative_eq!(mesh.surface_area(), area, epsilon = 1e-9);

    // The cut lies on y = 1 in the floor plane
    let positions = mesh.positions();
    assert!(positions
        .iter()
        .any(|p| (p[0] - 0.0).abs() < 1e-9 && (p[1] - 1.0).abs() < 1e-9 && p[2].abs() < 1e-9));
    assert!(positions
        .iter()
        .any(|p| (p[0] - 3.0).abs() < 1e-9 && (p[1] - 1.0).abs() < 1e-9 && p[2].abs() < 1e-9));

    assert_eq!(mesh.split_self_intersecting_triangles(), 0);
}

#[test]
fn test_sliver_seam_is_flipped() {
    let kernel = Kernel::new().shared();
    let mut mesh = MeshBuffer::new(&kernel);
    mesh.add_triangle("a", [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 0.001, 0.0]);
    mesh.add_triangle("b", [1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.5, -1.0, 0.0]);
    let area = mesh.surface_area();

    assert_eq!(mesh.remove_tiny_boundary_triangles(0.01, 10), 1);
    assert_eq!(mesh.triangle_count(), 2);
    assert_relative_eq!(mesh.surface_area(), area, epsilon = 1e-12);
    assert_eq!(mesh.remove_tiny_boundary_triangles(0.01, 10), 0);
}

#[test]
fn test_repairs_leave_clean_mesh_alone() -> Result<()> {
    let kernel = Kernel::new().shared();
    let mut mesh = Primitive::cylinder(2.0, 1.0, 24).to_mesh(&kernel, &FaceNaming::per_side("cyl"));
    let before = mesh.triangles();

    assert_eq!(mesh.split_self_intersecting_triangles(), 0);
    assert_eq!(mesh.remove_internal_triangles_by_raycast(), 0);
    assert_eq!(mesh.remove_small_islands(IslandOptions::default()), 0);
    assert_eq!(mesh.triangles(), before);

    let validated = mesh.validated_mesh()?;
    assert_eq!(validated.triangle_count(), before.len());
    Ok(())
}

#[test]
fn test_inside_out_part_survives_internal_removal() -> Result<()> {
    let kernel = Kernel::new().shared();
    let source = Primitive::cube([2.0; 3], false).to_mesh(&kernel, &FaceNaming::per_side("c"));
    let positions = source.positions();
    let mut inverted = MeshBuffer::new(&kernel);
    for ([a, b, c], &id) in source.triangles().into_iter().zip(source.face_ids()) {
        let [a, b, c] = [a, b, c].map(|v| positions[v as usize]);
        inverted.add_triangle(source.face_name(id).unwrap_or("c"), a, c, b);
    }

    let repair = &kernel.config().repair;
    let mut by_raycast = inverted.clone();
    let mut by_winding = inverted;
    assert_eq!(by_raycast.remove_internal_triangles_by_raycast(), 0);
    assert_eq!(
        by_winding.remove_internal_triangles_by_winding(repair.winding_offset_scale, repair.winding_crossing_tolerance),
        0
    );
    for mesh in [&by_raycast, &by_winding] {
        assert_eq!(mesh.triangle_count(), 12);
        assert_relative_eq!(mesh.signed_volume(), 8.0, epsilon = 1e-9);
    }
    Ok(())
}
