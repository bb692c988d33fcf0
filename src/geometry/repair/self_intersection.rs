// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Self-intersection splitting
//!
//! Crossing triangle pairs are re-triangulated so the crossing segment
//! becomes an edge of both. No triangle is removed; the pass only inserts
//! the vertices and edges a later internal-triangle removal needs.

use ahash::AHashSet;
use tracing::{debug, info, warn};

use crate::geometry::bbox::BoundingBox;
use crate::geometry::triangle_intersection::{
    intersection_segment, locate_point, split_by_segment, PointLocation,
};
use crate::geometry::MeshBuffer;
use crate::utils::math::Vec3;

/// Endpoint quantization for the processed-segment memo
const QUANTIZE: f64 = 1e9;

type SegmentKey = ([i64; 3], [i64; 3]);

fn segment_key(p: Vec3, q: Vec3) -> SegmentKey {
    let quantize = |v: Vec3| [v.x, v.y, v.z].map(|c| (c * QUANTIZE).round() as i64);
    let (a, b) = (quantize(p), quantize(q));
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl MeshBuffer {
    /// Split every pair of crossing triangles along their intersection.
    ///
    /// Pairs sharing an edge are skipped. Each host keeps its face id and
    /// winding. Repeats until a pass splits nothing or the configured
    /// iteration cap is reached. Returns the number of host triangles split.
    pub fn split_self_intersecting_triangles(&mut self) -> usize {
        let config = self.kernel().config().repair.clone();
        let mut seen: AHashSet<SegmentKey> = AHashSet::new();
        let mut total = 0;

        for pass in 0..config.split_max_iterations {
            let splits = self.split_pass(&mut seen, config.split_min_segment, config.barycentric_tolerance);
            debug!(pass, splits, "self-intersection pass");
            if splits == 0 {
                break;
            }
            total += splits;
        }

        // Endpoints inserted for hosts that could not be split
        self.compact_vertices();
        if total > 0 {
            self.fix_windings();
            info!(hosts = total, triangles = self.triangle_count(), "split self-intersections");
        }
        total
    }

    fn split_pass(&mut self, seen: &mut AHashSet<SegmentKey>, min_segment: f64, tolerance: f64) -> usize {
        let count = self.triangle_count();
        let boxes: Vec<BoundingBox> = (0..count)
            .map(|t| BoundingBox::from_points(self.corners(t)))
            .collect();
        let mut touched = vec![false; count];
        let mut splits = 0;

        for i in 0..count {
            for j in (i + 1)..count {
                if touched[i] || touched[j] {
                    continue;
                }
                let (ti, tj) = (self.tri(i), self.tri(j));
                let shared = ti.iter().filter(|v| tj.contains(v)).count();
                if shared >= 2 || !boxes[i].overlaps(&boxes[j], min_segment) {
                    continue;
                }

                let (a, b) = (self.corners(i), self.corners(j));
                let Some((p, q)) = intersection_segment(a, b, min_segment) else {
                    continue;
                };
                if !seen.insert(segment_key(p, q)) {
                    continue;
                }

                let pi = self.insert_vertex(p);
                let qi = self.insert_vertex(q);
                for host in [i, j] {
                    if self.split_host(host, (p, pi), (q, qi), tolerance) {
                        touched[host] = true;
                        splits += 1;
                    }
                }
            }
        }
        splits
    }

    /// Replace `host` by the pieces that carry segment p-q as an edge
    fn split_host(&mut self, host: usize, p: (Vec3, u32), q: (Vec3, u32), tolerance: f64) -> bool {
        let tri = self.tri(host);
        let corners = self.corners(host);
        let p_loc = locate_point(p.0, corners, tolerance);
        let q_loc = locate_point(q.0, corners, tolerance);

        let positions = &self.positions;
        let locate_in = |piece: [u32; 3], v: u32| {
            locate_point(
                positions[v as usize],
                piece.map(|c| positions[c as usize]),
                tolerance,
            )
        };
        let Some(pieces) = split_by_segment(tri, (p_loc, p.1), (q_loc, q.1), locate_in) else {
            if !is_edge_segment(p_loc, q_loc) {
                warn!(host, ?p_loc, ?q_loc, "could not split host triangle");
            }
            return false;
        };

        let face_id = self.face_ids[host];
        let mut pieces = pieces.into_iter();
        if let Some(first) = pieces.next() {
            self.set_tri(host, first);
        }
        for piece in pieces {
            self.push_triangle(piece, face_id);
        }
        self.mark_dirty();
        true
    }
}

/// Both endpoints on the host's boundary along a single edge
fn is_edge_segment(p: PointLocation, q: PointLocation) -> bool {
    use PointLocation::*;
    match (p, q) {
        (Vertex(_), Vertex(_)) => true,
        (OnEdge(i), OnEdge(j)) => i == j,
        (Vertex(k), OnEdge(i)) | (OnEdge(i), Vertex(k)) => i == k || (i + 1) % 3 == k,
        _ => false,
    }
}
