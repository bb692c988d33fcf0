// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Winding repair
//!
//! `fix_windings` makes every manifold edge traversed in opposite directions
//! by its two triangles; `enforce_outward` then turns the whole mesh so its
//! signed volume is non-negative. Edges with other than two uses are left
//! alone.

use std::collections::VecDeque;
use tracing::debug;

use super::topology::{EdgeMap, EdgeUse};
use super::MeshBuffer;

impl MeshBuffer {
    /// Every undirected edge has exactly two uses, in opposite directions
    pub fn is_coherently_oriented_manifold(&self) -> bool {
        EdgeMap::build(&self.indices)
            .iter()
            .all(|(_, uses)| matches!(uses, [u0, u1] if u0.forward != u1.forward))
    }

    /// Flood-fill consistent winding across manifold edges.
    /// Returns the number of triangles flipped.
    pub fn fix_windings(&mut self) -> usize {
        if self.is_coherently_oriented_manifold() {
            return 0;
        }

        let triangle_count = self.triangle_count();
        let edges = EdgeMap::build(&self.indices);
        let mut neighbors: Vec<Vec<(EdgeUse, EdgeUse)>> = vec![Vec::new(); triangle_count];
        for (_, u0, u1) in edges.manifold_pairs() {
            neighbors[u0.triangle].push((u0, u1));
            neighbors[u1.triangle].push((u1, u0));
        }

        let mut flipped = vec![false; triangle_count];
        let mut visited = vec![false; triangle_count];
        let mut queue = VecDeque::new();
        for seed in 0..triangle_count {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            queue.push_back(seed);

            while let Some(t) = queue.pop_front() {
                for &(own, other) in &neighbors[t] {
                    let n = other.triangle;
                    if visited[n] {
                        continue;
                    }
                    // Same direction across a shared edge means opposite winding
                    if own.forward ^ flipped[t] == other.forward {
                        flipped[n] = true;
                    }
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }

        let mut count = 0;
        for (t, _) in flipped.iter().enumerate().filter(|(_, f)| **f) {
            self.flip_triangle(t);
            count += 1;
        }
        if count > 0 {
            debug!(flipped = count, "fixed windings");
            self.mark_dirty();
        }
        count
    }

    /// Flip every triangle when the signed volume is negative.
    /// Returns whether the mesh was flipped.
    pub fn enforce_outward(&mut self) -> bool {
        if self.signed_volume() >= 0.0 {
            return false;
        }
        for t in 0..self.triangle_count() {
            self.flip_triangle(t);
        }
        debug!(triangles = self.triangle_count(), "flipped inside-out mesh");
        self.mark_dirty();
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::primitives::{FaceNaming, Primitive};
    use crate::geometry::MeshBuffer;
    use crate::kernel::Kernel;
    use approx::assert_relative_eq;

    fn cube() -> MeshBuffer {
        Primitive::cube([1.0; 3], false).to_mesh(&Kernel::new().shared(), &FaceNaming::per_side("c"))
    }

    #[test]
    fn test_cube_is_coherent() {
        let mut mesh = cube();
        assert!(mesh.is_coherently_oriented_manifold());
        assert_eq!(mesh.fix_windings(), 0);
    }

    #[test]
    fn test_fix_windings_repairs_flipped_triangles() {
        let mut mesh = cube();
        mesh.flip_triangle(3);
        mesh.flip_triangle(7);
        assert!(!mesh.is_coherently_oriented_manifold());

        let flipped = mesh.fix_windings();
        assert!(flipped > 0);
        assert!(mesh.is_coherently_oriented_manifold());
        assert_eq!(mesh.fix_windings(), 0);

        mesh.enforce_outward();
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_enforce_outward_flips_inside_out_mesh() {
        let mut mesh = cube();
        for t in 0..mesh.triangle_count() {
            mesh.flip_triangle(t);
        }
        assert!(mesh.is_coherently_oriented_manifold());
        assert!(mesh.signed_volume() < 0.0);

        assert!(mesh.enforce_outward());
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-12);
        assert!(!mesh.enforce_outward());
    }

    #[test]
    fn test_open_mesh_is_left_consistent() {
        let kernel = Kernel::new().shared();
        let mut mesh = MeshBuffer::new(&kernel);
        mesh.add_triangle("a", [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        // Same direction on the shared edge (1, 2)
        mesh.add_triangle("a", [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]);

        assert_eq!(mesh.fix_windings(), 1);
        assert_eq!(mesh.fix_windings(), 0);
        let t = mesh.triangles();
        assert_eq!(t[1], [1, 3, 2]);
    }
}
