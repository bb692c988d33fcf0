// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh repair toolkit
//!
//! Every pass mutates the buffer in place, returns how much it changed, and
//! returns zero when nothing qualifies. Face labels are never renamed; a
//! label whose triangles are all removed stays registered and queries for
//! it come back empty.

mod edge_flip;
mod internal;
mod islands;
mod self_intersection;

pub use islands::IslandOptions;

use super::MeshBuffer;
use crate::utils::math::{centroid, triangle_cross, Vec3};

impl MeshBuffer {
    /// Drop triangles whose flag is cleared, compact vertices and restore
    /// coherent winding. Returns the number of triangles removed.
    pub(crate) fn remove_flagged(&mut self, keep: &[bool]) -> usize {
        let removed = self.retain_triangles(keep);
        if removed > 0 {
            self.compact_vertices();
            self.fix_windings();
        }
        removed
    }

    /// Centroid, unit normal and area of triangle `t`; `None` when degenerate
    pub(crate) fn triangle_frame(&self, t: usize) -> Option<(Vec3, Vec3, f64)> {
        let [a, b, c] = self.corners(t);
        let cross = triangle_cross(a, b, c);
        let normal = cross.try_normalize()?;
        Some((centroid(a, b, c), normal, cross.norm() / 2.0))
    }
}
