// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tiny seam-triangle repair by 2-2 edge flips

use ahash::AHashSet;
use tracing::{debug, info};

use crate::geometry::topology::{EdgeKey, EdgeMap};
use crate::geometry::MeshBuffer;
use crate::utils::math::{triangle_cross, Vec3};

/// A candidate flip of the edge shared by two triangles
struct Flip {
    t0: usize,
    t1: usize,
    /// Replacement triangles for `t0` and `t1`
    new0: [u32; 3],
    new1: [u32; 3],
    diagonal: EdgeKey,
}

impl MeshBuffer {
    /// Flip the edge between two differently labelled triangles when the
    /// smaller one has area below `area_threshold`.
    ///
    /// A flip is accepted when the new diagonal is not already an edge, the
    /// smaller of the two new areas is strictly larger than the old one, and
    /// neither new triangle folds over. Each triangle slot keeps its face id,
    /// so the labelled seam may move onto the new diagonal.
    ///
    /// Returns the number of flips performed.
    pub fn remove_tiny_boundary_triangles(&mut self, area_threshold: f64, max_iterations: usize) -> usize {
        let mut total = 0;
        for pass in 0..max_iterations {
            let flips = self.tiny_flip_pass(area_threshold);
            debug!(pass, flips, "tiny triangle flip pass");
            if flips == 0 {
                break;
            }
            total += flips;
        }

        if total > 0 {
            self.fix_windings();
            info!(flips = total, "flipped tiny seam triangles");
        }
        total
    }

    fn tiny_flip_pass(&mut self, area_threshold: f64) -> usize {
        let edges = EdgeMap::build(&self.indices);
        let mut touched = vec![false; self.triangle_count()];
        let mut new_diagonals: AHashSet<EdgeKey> = AHashSet::new();
        let mut flips = 0;

        for (key, u0, u1) in edges.manifold_pairs() {
            let (t0, t1) = (u0.triangle, u1.triangle);
            if touched[t0] || touched[t1] || self.face_ids[t0] == self.face_ids[t1] {
                continue;
            }
            // Incoherent pairs cannot be flipped without changing orientation
            if u0.forward == u1.forward {
                continue;
            }
            let Some(flip) = self.plan_flip(key, u0.corner, t0, u1.corner, t1, area_threshold) else {
                continue;
            };
            if edges.contains(&flip.diagonal) || new_diagonals.contains(&flip.diagonal) {
                continue;
            }

            self.set_tri(flip.t0, flip.new0);
            self.set_tri(flip.t1, flip.new1);
            touched[flip.t0] = true;
            touched[flip.t1] = true;
            new_diagonals.insert(flip.diagonal);
            flips += 1;
        }

        if flips > 0 {
            self.mark_dirty();
        }
        flips
    }

    fn plan_flip(
        &self,
        key: EdgeKey,
        corner0: usize,
        t0: usize,
        corner1: usize,
        t1: usize,
        area_threshold: f64,
    ) -> Option<Flip> {
        // Rotate t0 to (u, v, c0); a coherent t1 is then (v, u, c1)
        let tri0 = self.tri(t0);
        let tri1 = self.tri(t1);
        let (u, v, c0) = (tri0[corner0], tri0[(corner0 + 1) % 3], tri0[(corner0 + 2) % 3]);
        let c1 = tri1[(corner1 + 2) % 3];
        if c0 == c1 || EdgeKey::new(u, v) != key {
            return None;
        }

        let area = |tri: [u32; 3]| self.cross_of(tri).norm() / 2.0;
        let old_min = area(tri0).min(area(tri1));
        if old_min >= area_threshold {
            return None;
        }

        let new0 = [u, c1, c0];
        let new1 = [c1, v, c0];
        let new_min = area(new0).min(area(new1));
        if new_min <= old_min {
            return None;
        }

        let reference = self.cross_of(tri0) + self.cross_of(tri1);
        if self.cross_of(new0).dot(&reference) <= 0.0 || self.cross_of(new1).dot(&reference) <= 0.0 {
            return None;
        }

        Some(Flip {
            t0,
            t1,
            new0,
            new1,
            diagonal: EdgeKey::new(c0, c1),
        })
    }

    fn cross_of(&self, tri: [u32; 3]) -> Vec3 {
        let [a, b, c] = tri.map(|v| self.positions[v as usize]);
        triangle_cross(a, b, c)
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::MeshBuffer;
    use crate::kernel::Kernel;
    use approx::assert_relative_eq;

    fn sliver_pair(kernel: &std::sync::Arc<Kernel>, second: &str) -> MeshBuffer {
        let mut mesh = MeshBuffer::new(kernel);
        let (u, v) = ([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        mesh.add_triangle("a", u, v, [0.5, 0.001, 0.0]);
        mesh.add_triangle(second, v, u, [0.5, -1.0, 0.0]);
        mesh
    }

    #[test]
    fn test_flip_sliver_on_seam() {
        let kernel = Kernel::new().shared();
        let mut mesh = sliver_pair(&kernel, "b");
        let area = mesh.surface_area();

        assert_eq!(mesh.remove_tiny_boundary_triangles(0.01, 10), 1);
        assert_eq!(mesh.triangle_count(), 2);
        assert_relative_eq!(mesh.surface_area(), area, epsilon = 1e-12);
        // Both labels survive, one per new triangle
        assert_eq!(mesh.face("a").triangle_count(), 1);
        assert_eq!(mesh.face("b").triangle_count(), 1);
        assert_eq!(mesh.triangles(), vec![[0, 3, 2], [3, 1, 2]]);

        // The new pair is well shaped
        assert_eq!(mesh.remove_tiny_boundary_triangles(0.01, 10), 0);
    }

    #[test]
    fn test_same_label_is_not_a_seam() {
        let kernel = Kernel::new().shared();
        let mut mesh = sliver_pair(&kernel, "a");
        assert_eq!(mesh.remove_tiny_boundary_triangles(0.01, 10), 0);
    }

    #[test]
    fn test_threshold_gates_flips() {
        let kernel = Kernel::new().shared();
        let mut mesh = sliver_pair(&kernel, "b");
        assert_eq!(mesh.remove_tiny_boundary_triangles(1e-4, 10), 0);
        assert_eq!(mesh.remove_tiny_boundary_triangles(0.01, 0), 0);
    }
}
