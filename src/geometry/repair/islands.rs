// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Small-island removal

use tracing::{debug, info};

use crate::config::RepairConfig;
use crate::geometry::predicates::count_ray_hits;
use crate::geometry::topology::manifold_components;
use crate::geometry::MeshBuffer;
use crate::utils::math::{centroid, Vec3};

/// Skewed off the axes so a ray through a box-like shell does not run along
/// the diagonal shared by two coplanar triangles
const ISLAND_RAYS: [[f64; 3]; 3] = [
    [1.0, 0.3127, 0.1731],
    [-0.2213, 1.0, 0.4271],
    [0.3719, -0.1583, 1.0],
];

/// Which disconnected components `remove_small_islands` deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IslandOptions {
    /// Components larger than this are never removed
    pub max_triangles: usize,
    /// Remove islands inside the main shell
    pub remove_internal: bool,
    /// Remove islands outside the main shell
    pub remove_external: bool,
}

impl IslandOptions {
    pub fn from_config(config: &RepairConfig) -> Self {
        Self {
            max_triangles: config.island_max_triangles,
            remove_internal: true,
            remove_external: false,
        }
    }
}

impl Default for IslandOptions {
    fn default() -> Self {
        Self::from_config(&RepairConfig::default())
    }
}

impl MeshBuffer {
    /// Delete small components that are not the main shell.
    ///
    /// The largest component across two-use edges is the main shell. Each
    /// other component of at most `max_triangles` triangles is classified by
    /// three skewed rays from its first triangle's centroid: it is inside when
    /// at least two of them hit the main shell an odd number of times.
    /// Returns the number of triangles removed.
    pub fn remove_small_islands(&mut self, options: IslandOptions) -> usize {
        if !options.remove_internal && !options.remove_external {
            return 0;
        }
        let components = manifold_components(&self.indices);
        let Some((main, islands)) = components.split_first() else {
            return 0;
        };
        if islands.is_empty() {
            return 0;
        }

        let shell: Vec<[Vec3; 3]> = main.iter().map(|&t| self.corners(t)).collect();
        let mut keep = vec![true; self.triangle_count()];
        let mut removed_islands = 0;
        for island in islands.iter().filter(|c| c.len() <= options.max_triangles) {
            let [a, b, c] = self.corners(island[0]);
            let probe = centroid(a, b, c);
            let odd = ISLAND_RAYS
                .iter()
                .filter(|&&d| count_ray_hits(probe, Vec3::from(d), shell.iter().copied()) % 2 == 1)
                .count();
            let inside = odd >= 2;
            debug!(triangles = island.len(), inside, "island");

            if (inside && options.remove_internal) || (!inside && options.remove_external) {
                for &t in island {
                    keep[t] = false;
                }
                removed_islands += 1;
            }
        }

        let removed = self.remove_flagged(&keep);
        if removed > 0 {
            info!(islands = removed_islands, triangles = removed, "removed small islands");
        }
        removed
    }
}
