// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use serde::{Deserialize, Serialize};

use super::topology::EdgeMap;
use super::MeshBuffer;
use crate::utils::math::{triangle_area, Vec3};

/// Geometry statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshStats {
    /// Signed volume; negative for an inside-out mesh
    pub volume: f64,
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Area-weighted surface centroid
    pub centroid: [f64; 3],
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub face_count: usize,
    /// Edges used by exactly one triangle
    pub boundary_edges: usize,
    /// Edges used by more than two triangles
    pub non_manifold_edges: usize,
    /// Every edge used twice
    pub is_watertight: bool,
    /// Every edge used twice, in opposite directions
    pub is_coherent: bool,
}

impl MeshStats {
    /// Pretty print statistics
    pub fn print(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║              MESH ANALYTICS                              ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║ Volume:          {:>14.4}                          ║", self.volume);
        println!("║ Surface Area:    {:>14.4}                          ║", self.surface_area);
        println!(
            "║ Centroid:        ({:>8.3}, {:>8.3}, {:>8.3})           ║",
            self.centroid[0], self.centroid[1], self.centroid[2]
        );
        println!(
            "║ Min:             ({:>8.3}, {:>8.3}, {:>8.3})           ║",
            self.bbox[0], self.bbox[1], self.bbox[2]
        );
        println!(
            "║ Max:             ({:>8.3}, {:>8.3}, {:>8.3})           ║",
            self.bbox[3], self.bbox[4], self.bbox[5]
        );
        println!("║ Vertices:        {:>14}                          ║", self.vertex_count);
        println!("║ Triangles:       {:>14}                          ║", self.triangle_count);
        println!("║ Faces:           {:>14}                          ║", self.face_count);
        println!("║ Boundary edges:  {:>14}                          ║", self.boundary_edges);
        println!("║ Non-manifold:    {:>14}                          ║", self.non_manifold_edges);
        println!(
            "║ Watertight:      {:>14}                          ║",
            if self.is_watertight { "Yes" } else { "No" }
        );
        println!(
            "║ Coherent:        {:>14}                          ║",
            if self.is_coherent { "Yes" } else { "No" }
        );
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

impl MeshBuffer {
    /// Analyze mesh geometry and compute statistics
    pub fn stats(&self) -> MeshStats {
        let edges = EdgeMap::build(&self.indices);
        let mut boundary_edges = 0;
        let mut non_manifold_edges = 0;
        let mut is_coherent = true;
        for (_, uses) in edges.iter() {
            match uses {
                [_] => boundary_edges += 1,
                [u0, u1] => is_coherent &= u0.forward != u1.forward,
                _ => non_manifold_edges += 1,
            }
        }
        let is_watertight = !self.is_empty() && boundary_edges == 0 && non_manifold_edges == 0;

        MeshStats {
            volume: self.signed_volume(),
            surface_area: self.surface_area(),
            bbox: self.bounding_box(),
            centroid: self.centroid(),
            vertex_count: self.vertex_count(),
            triangle_count: self.triangle_count(),
            face_count: self.labels.len(),
            boundary_edges,
            non_manifold_edges,
            is_watertight,
            is_coherent: is_watertight && is_coherent,
        }
    }

    fn centroid(&self) -> [f64; 3] {
        let mut weighted = Vec3::ZERO;
        let mut total = 0.0;
        for [a, b, c] in self.triangle_corners() {
            let area = triangle_area(a, b, c);
            weighted += (a + b + c) * (area / 3.0);
            total += area;
        }
        if total > 0.0 {
            (weighted / total).to_array()
        } else {
            [0.0; 3]
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::primitives::{FaceNaming, Primitive};
    use crate::kernel::Kernel;
    use approx::assert_relative_eq;

    #[test]
    fn test_analyze_cube() {
        let kernel = Kernel::new().shared();
        let mesh = Primitive::cube([10.0; 3], true).to_mesh(&kernel, &FaceNaming::per_side("c"));
        let stats = mesh.stats();

        assert_relative_eq!(stats.volume, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(stats.surface_area, 600.0, epsilon = 1e-9);
        assert_eq!(stats.vertex_count, 8);
        assert_eq!(stats.triangle_count, 12);
        assert_eq!(stats.face_count, 6);
        assert!(stats.is_watertight);
        assert!(stats.is_coherent);
        for c in stats.centroid {
            assert!(c.abs() < 1e-12);
        }
    }

    #[test]
    fn test_analyze_open_mesh() {
        let kernel = Kernel::new().shared();
        let mut mesh = Primitive::cube([1.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("c"));
        let keep: Vec<bool> = (0..12).map(|t| t != 0).collect();
        mesh.retain_triangles(&keep);

        let stats = mesh.stats();
        assert_eq!(stats.boundary_edges, 3);
        assert!(!stats.is_watertight);
        assert!(!stats.is_coherent);
    }
}
