// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL export and re-import through files

use anyhow::Result;
use approx::assert_relative_eq;
use facemesh::{export_stl, import_stl_file, write_binary_stl, FaceNaming, Kernel, Primitive};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;

#[test]
fn test_ascii_export_file() -> Result<()> {
    let kernel = Kernel::new().shared();
    let mesh = Primitive::cube([10.0; 3], true).to_mesh(&kernel, &FaceNaming::per_side("box"));

    let file = NamedTempFile::with_suffix(".stl")?;
    export_stl(&mesh, file.path(), "box", 6)?;

    let text = std::fs::read_to_string(file.path())?;
    assert!(text.starts_with("solid box\n"));
    assert!(text.trim_end().ends_with("endsolid box"));
    assert_eq!(text.matches("facet normal").count(), 12);
    assert_eq!(text.matches("endfacet").count(), 12);

    let corners: BTreeSet<&str> = text
        .lines()
        .filter_map(|l| l.trim_start().strip_prefix("vertex "))
        .collect();
    assert_eq!(corners.len(), 8);
    assert!(corners.contains("-5.000000 -5.000000 -5.000000"));
    assert!(corners.contains("5.000000 5.000000 5.000000"));
    Ok(())
}

#[test]
fn test_ascii_round_trip() -> Result<()> {
    let kernel = Kernel::new().shared();
    let mesh = Primitive::cylinder(2.0, 1.0, 16).to_mesh(&kernel, &FaceNaming::per_side("cyl"));

    let file = NamedTempFile::with_suffix(".stl")?;
    export_stl(&mesh, file.path(), "cyl", 9)?;
    let imported = import_stl_file(file.path(), &kernel, "scan")?;

    assert_eq!(imported.triangle_count(), mesh.triangle_count());
    assert_eq!(imported.vertex_count(), mesh.vertex_count());
    assert_eq!(imported.face_names(), vec!["scan".to_string()]);
    assert!(imported.is_coherently_oriented_manifold());
    assert_relative_eq!(imported.signed_volume(), mesh.signed_volume(), epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_binary_round_trip() -> Result<()> {
    let kernel = Kernel::new().shared();
    let mesh = Primitive::cube([2.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("part"));

    let file = NamedTempFile::with_suffix(".stl")?;
    {
        let mut writer = BufWriter::new(File::create(file.path())?);
        write_binary_stl(&mesh, &mut writer)?;
        writer.flush()?;
    }
    let imported = import_stl_file(file.path(), &kernel, "part")?;

    assert_eq!(imported.triangle_count(), 12);
    assert_eq!(imported.vertex_count(), 8);
    assert_relative_eq!(imported.signed_volume(), 8.0, epsilon = 1e-6);
    Ok(())
}
