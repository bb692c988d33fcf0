// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! Every primitive is closed, vertex-shared and wound outward.

use std::f64::consts::PI;
use std::sync::Arc;

use super::MeshBuffer;
use crate::kernel::Kernel;

/// How a primitive labels its faces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceNaming {
    /// One label for the whole primitive
    Uniform(String),
    /// One label per side, `{prefix}_{side}`
    PerSide(String),
}

impl FaceNaming {
    pub fn uniform(name: impl Into<String>) -> Self {
        Self::Uniform(name.into())
    }

    pub fn per_side(prefix: impl Into<String>) -> Self {
        Self::PerSide(prefix.into())
    }

    fn label(&self, side: &str) -> String {
        match self {
            Self::Uniform(name) => name.clone(),
            Self::PerSide(prefix) => format!("{prefix}_{side}"),
        }
    }
}

/// Geometric primitives
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cube { size: [f64; 3], center: bool },
    /// Frustum along +Z; `r1` at the bottom, `r2` at the top
    Cylinder { h: f64, r1: f64, r2: f64, segments: u32 },
}

impl Primitive {
    pub fn cube(size: [f64; 3], center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn cylinder(h: f64, r: f64, segments: u32) -> Self {
        Self::cone(h, r, r, segments)
    }

    pub fn cone(h: f64, r1: f64, r2: f64, segments: u32) -> Self {
        let segments = if segments >= 3 { segments } else { 32 };
        Self::Cylinder { h, r1, r2, segments }
    }

    pub fn to_mesh(&self, kernel: &Arc<Kernel>, naming: &FaceNaming) -> MeshBuffer {
        let mut mesh = MeshBuffer::new(kernel);
        match *self {
            Self::Cube { size, center } => generate_cube(&mut mesh, size, center, naming),
            Self::Cylinder { h, r1, r2, segments } => {
                generate_cylinder(&mut mesh, h, r1, r2, segments, naming)
            }
        }
        mesh
    }
}

fn generate_cube(mesh: &mut MeshBuffer, size: [f64; 3], center: bool, naming: &FaceNaming) {
    let offset = if center { size.map(|s| -s / 2.0) } else { [0.0; 3] };
    let [x0, y0, z0] = offset;
    let [x1, y1, z1] = [x0 + size[0], y0 + size[1], z0 + size[2]];

    let positions = [
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];

    let sides: [(&str, [[usize; 3]; 2]); 6] = [
        ("bottom", [[0, 2, 1], [0, 3, 2]]),
        ("top", [[4, 5, 6], [4, 6, 7]]),
        ("front", [[0, 1, 5], [0, 5, 4]]),
        ("back", [[3, 7, 6], [3, 6, 2]]),
        ("left", [[0, 4, 7], [0, 7, 3]]),
        ("right", [[1, 2, 6], [1, 6, 5]]),
    ];

    for (side, triangles) in sides {
        let label = naming.label(side);
        for [a, b, c] in triangles {
            mesh.add_triangle(&label, positions[a], positions[b], positions[c]);
        }
    }
}

fn generate_cylinder(
    mesh: &mut MeshBuffer,
    height: f64,
    r1: f64,
    r2: f64,
    segments: u32,
    naming: &FaceNaming,
) {
    let ring = |r: f64, z: f64, i: u32| {
        let theta = 2.0 * PI * f64::from(i % segments) / f64::from(segments);
        [r * theta.cos(), r * theta.sin(), z]
    };
    let bottom_center = [0.0, 0.0, 0.0];
    let top_center = [0.0, 0.0, height];
    let (bottom, top, side) = (naming.label("bottom"), naming.label("top"), naming.label("side"));

    for i in 0..segments {
        let (b0, b1) = (ring(r1, 0.0, i), ring(r1, 0.0, i + 1));
        let (t0, t1) = (ring(r2, height, i), ring(r2, height, i + 1));

        if r1 > 0.0 {
            mesh.add_triangle(&bottom, bottom_center, b1, b0);
            mesh.add_triangle(&side, b0, b1, t1);
        }
        if r2 > 0.0 {
            mesh.add_triangle(&top, top_center, t0, t1);
            mesh.add_triangle(&side, b0, t1, t0);
        }
    }
}
