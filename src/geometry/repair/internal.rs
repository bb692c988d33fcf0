// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Internal-triangle removal
//!
//! Two classifiers for triangles that do not lie on the outer boundary of
//! the solid: a parity vote over axis rays, and the generalized winding
//! number, which also copes with self-intersecting or non-manifold input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::geometry::predicates::{count_ray_hits, winding_number};
use crate::geometry::MeshBuffer;
use crate::utils::math::Vec3;

/// Winding number threshold between outside (0) and inside (1)
const WINDING_HALF: f64 = 0.5;

impl MeshBuffer {
    /// Remove triangles whose front side lies inside the solid.
    ///
    /// The probe sits just in front of each triangle's centroid, with a small
    /// seeded jitter. One ray per principal axis is cast away from the
    /// triangle's plane; the triangle is removed when at least two of the
    /// three rays cross the mesh an odd number of times. Windings are made
    /// coherent and outward first, so an inside-out shell is not mistaken
    /// for interior.
    pub fn remove_internal_triangles_by_raycast(&mut self) -> usize {
        self.orient_for_classification();
        let config = &self.kernel().config().repair;
        let (jitter, seed) = (config.raycast_jitter, config.raycast_seed);

        // Drawn up front so the vote does not depend on scheduling
        let mut rng = StdRng::seed_from_u64(seed);
        let wobbles: Vec<Vec3> = (0..self.triangle_count())
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-0.5..=0.5),
                    rng.gen_range(-0.5..=0.5),
                    rng.gen_range(-0.5..=0.5),
                )
            })
            .collect();

        let soup: Vec<[Vec3; 3]> = self.triangle_corners().collect();
        let frames: Vec<_> = (0..soup.len()).map(|t| self.triangle_frame(t)).collect();
        let keep: Vec<bool> = frames
            .par_iter()
            .enumerate()
            .map(|(t, frame)| {
                let Some((center, normal, area)) = *frame else {
                    return true;
                };
                let offset = jitter * (1.0 + area.sqrt());
                let probe = center + normal * offset + wobbles[t] * offset;

                let odd = [Vec3::X, Vec3::Y, Vec3::Z]
                    .into_iter()
                    .filter(|axis| {
                        let direction = if normal.dot(axis) < 0.0 { -*axis } else { *axis };
                        count_ray_hits(probe, direction, soup.iter().copied()) % 2 == 1
                    })
                    .count();
                odd < 2
            })
            .collect();

        let removed = self.remove_flagged(&keep);
        if removed > 0 {
            info!(removed, remaining = self.triangle_count(), "removed internal triangles (raycast)");
        }
        removed
    }

    /// Remove triangles across which the winding number does not cross 1/2.
    ///
    /// Two probes sit at `±offset_scale * sqrt(area)` along each triangle's
    /// normal from its centroid. A boundary triangle separates winding ~0
    /// from ~1; the triangle is kept when the lower probe value is at most
    /// `0.5 + crossing_tolerance` and the higher at least `0.5 - crossing_tolerance`.
    /// Magnitudes are compared, after the same orientation step as the raycast
    /// classifier, so a shell wound inward still reads as ~1 inside.
    pub fn remove_internal_triangles_by_winding(&mut self, offset_scale: f64, crossing_tolerance: f64) -> usize {
        self.orient_for_classification();
        let soup: Vec<[Vec3; 3]> = self.triangle_corners().collect();
        let frames: Vec<_> = (0..soup.len()).map(|t| self.triangle_frame(t)).collect();
        let keep: Vec<bool> = frames
            .par_iter()
            .enumerate()
            .map(|(t, frame)| {
                let Some((center, normal, area)) = *frame else {
                    return true;
                };
                let offset = normal * (offset_scale * area.sqrt());
                let front = winding_number(center + offset, soup.iter().copied()).abs();
                let back = winding_number(center - offset, soup.iter().copied()).abs();
                let (lo, hi) = (front.min(back), front.max(back));

                let crosses = lo <= WINDING_HALF + crossing_tolerance && hi >= WINDING_HALF - crossing_tolerance;
                if !crosses {
                    debug!(triangle = t, front, back, "interior by winding number");
                }
                crosses
            })
            .collect();

        let removed = self.remove_flagged(&keep);
        if removed > 0 {
            info!(removed, remaining = self.triangle_count(), "removed internal triangles (winding)");
        }
        removed
    }

    fn orient_for_classification(&mut self) {
        let flipped = self.fix_windings();
        if self.enforce_outward() || flipped > 0 {
            debug!(flipped, "reoriented before internal-triangle classification");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::primitives::{FaceNaming, Primitive};
    use crate::geometry::MeshBuffer;
    use crate::kernel::Kernel;
    use approx::assert_relative_eq;

    fn nested_cubes() -> MeshBuffer {
        let kernel = Kernel::new().shared();
        let mut outer = Primitive::cube([4.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("outer"));
        let mut inner = Primitive::cube([1.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("inner"));
        inner.translate([1.0, 1.2, 1.4]);
        outer.append(&inner);
        outer
    }

    #[test]
    fn test_raycast_removes_nested_shell() {
        let mut mesh = nested_cubes();
        assert_eq!(mesh.remove_internal_triangles_by_raycast(), 12);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.face("inner").is_empty());
        assert_relative_eq!(mesh.signed_volume(), 64.0, epsilon = 1e-9);
    }

    #[test]
    fn test_winding_removes_nested_shell() {
        let mut mesh = nested_cubes();
        assert_eq!(mesh.remove_internal_triangles_by_winding(1e-3, 0.1), 12);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.face("outer").triangle_count(), 12);
        assert_eq!(mesh.vertex_count(), 8);
    }

    /// Unit cube rebuilt with every triangle wound inward
    fn inside_out_cube() -> MeshBuffer {
        let kernel = Kernel::new().shared();
        let source = Primitive::cube([1.0; 3], false).to_mesh(&kernel, &FaceNaming::uniform("c"));
        let positions = source.positions();
        let mut mesh = MeshBuffer::new(&kernel);
        for [a, b, c] in source.triangles() {
            let [a, b, c] = [a, b, c].map(|v| positions[v as usize]);
            mesh.add_triangle("c", a, c, b);
        }
        mesh
    }

    #[test]
    fn test_inside_out_shell_is_kept() {
        let mut mesh = inside_out_cube();
        assert_relative_eq!(mesh.signed_volume(), -1.0, epsilon = 1e-12);
        assert_eq!(mesh.remove_internal_triangles_by_raycast(), 0);
        assert_eq!(mesh.triangle_count(), 12);
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-12);

        let mut mesh = inside_out_cube();
        assert_eq!(mesh.remove_internal_triangles_by_winding(1e-3, 0.1), 0);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_clean_shell_is_kept() {
        let kernel = Kernel::new().shared();
        let mut mesh = Primitive::cylinder(2.0, 1.0, 24).to_mesh(&kernel, &FaceNaming::per_side("cyl"));
        let count = mesh.triangle_count();
        assert_eq!(mesh.remove_internal_triangles_by_raycast(), 0);
        assert_eq!(mesh.remove_internal_triangles_by_winding(1e-3, 0.1), 0);
        assert_eq!(mesh.triangle_count(), count);
    }
}
