// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL serialization
//!
//! ASCII export is written by hand so the output is byte-for-byte stable;
//! binary output and all reading go through `stl_io`.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;
use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};
use tracing::debug;

use crate::error::KernelResult;
use crate::geometry::MeshBuffer;
use crate::kernel::Kernel;
use crate::utils::math::{triangle_cross, Vec3};

impl MeshBuffer {
    /// ASCII STL with coordinates printed at `precision` decimals.
    /// Facet normals are the unit normals of each triangle's winding.
    pub fn to_stl(&self, name: &str, precision: usize) -> String {
        let mut out = String::with_capacity(64 + self.triangle_count() * 256);
        // String writes are infallible
        self.write_stl(&mut out, name, precision)
            .map(|()| out)
            .unwrap_or_default()
    }

    fn write_stl<W: fmt::Write>(&self, out: &mut W, name: &str, precision: usize) -> fmt::Result {
        writeln!(out, "solid {name}")?;
        for corners in self.triangle_corners() {
            let [a, b, c] = corners;
            let normal = triangle_cross(a, b, c).try_normalize().unwrap_or(Vec3::ZERO);
            writeln!(out, "  facet normal {}", format_point(normal, precision))?;
            writeln!(out, "    outer loop")?;
            for v in corners {
                writeln!(out, "      vertex {}", format_point(v, precision))?;
            }
            writeln!(out, "    endloop")?;
            writeln!(out, "  endfacet")?;
        }
        writeln!(out, "endsolid {name}")
    }
}

fn format_point(p: Vec3, precision: usize) -> String {
    format!(
        "{} {} {}",
        format_coord(p.x, precision),
        format_coord(p.y, precision),
        format_coord(p.z, precision)
    )
}

/// Fixed-point coordinate; values that round to zero never print a sign
fn format_coord(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => text,
    }
}

/// Write `mesh` as ASCII STL to `path`
pub fn export_stl(mesh: &MeshBuffer, path: impl AsRef<Path>, name: &str, precision: usize) -> KernelResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(mesh.to_stl(name, precision).as_bytes())?;
    writer.flush()?;
    debug!(path = %path.display(), triangles = mesh.triangle_count(), "exported STL");
    Ok(())
}

/// Write `mesh` as binary STL (single precision)
pub fn write_binary_stl<W: Write>(mesh: &MeshBuffer, writer: &mut W) -> KernelResult<()> {
    let to_f32 = |v: Vec3| [v.x as f32, v.y as f32, v.z as f32];
    let triangles: Vec<StlTriangle> = mesh
        .triangle_corners()
        .map(|[a, b, c]| {
            let normal = triangle_cross(a, b, c).try_normalize().unwrap_or(Vec3::ZERO);
            StlTriangle {
                normal: Normal::new(to_f32(normal)),
                vertices: [
                    StlVertex::new(to_f32(a)),
                    StlVertex::new(to_f32(b)),
                    StlVertex::new(to_f32(c)),
                ],
            }
        })
        .collect();
    stl_io::write_stl(writer, triangles.iter())?;
    Ok(())
}

/// Read an ASCII or binary STL, labelling every triangle `face_name`.
/// Coincident vertices are shared; windings are kept as stored.
pub fn import_stl<R: Read + Seek>(reader: &mut R, kernel: &Arc<Kernel>, face_name: &str) -> KernelResult<MeshBuffer> {
    let stl = stl_io::read_stl(reader)?;
    let mut mesh = MeshBuffer::new(kernel);
    let position = |i: usize| {
        let v = &stl.vertices[i];
        [f64::from(v[0]), f64::from(v[1]), f64::from(v[2])]
    };
    for face in &stl.faces {
        let [i0, i1, i2] = face.vertices;
        mesh.add_triangle(face_name, position(i0), position(i1), position(i2));
    }
    debug!(
        triangles = mesh.triangle_count(),
        vertices = mesh.vertex_count(),
        "imported STL"
    );
    Ok(mesh)
}

pub fn import_stl_file(path: impl AsRef<Path>, kernel: &Arc<Kernel>, face_name: &str) -> KernelResult<MeshBuffer> {
    let mut file = File::open(path.as_ref())?;
    import_stl(&mut file, kernel, face_name)
}
