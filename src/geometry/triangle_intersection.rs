// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle-triangle intersection and splitting
//!
//! Non-coplanar pairs only: each triangle is cut by the other's plane into a
//! chord on the common line, and the overlap of the two chords is the
//! intersection segment.

use crate::utils::math::Vec3;

use super::predicates::barycentric;

/// Plane distances at or below this count as "on the plane"
const PLANE_EPS: f64 = 1e-12;

/// Where a point lies on a triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    /// On corner k
    Vertex(usize),
    /// On edge k, which runs corner k -> corner k+1
    OnEdge(usize),
    Inside,
}

/// Intersection segment of two triangles, or `None` when they are disjoint,
/// coplanar, only touch, or overlap along a segment no longer than `min_length`
pub fn intersection_segment(a: [Vec3; 3], b: [Vec3; 3], min_length: f64) -> Option<(Vec3, Vec3)> {
    let na = (a[1] - a[0]).cross(&(a[2] - a[0])).try_normalize()?;
    let nb = (b[1] - b[0]).cross(&(b[2] - b[0])).try_normalize()?;

    let db = b.map(|p| na.dot(&(p - a[0])));
    let da = a.map(|p| nb.dot(&(p - b[0])));
    if !straddles(&db) || !straddles(&da) {
        return None;
    }

    let direction = na.cross(&nb).try_normalize()?;
    let (a0, a1) = chord(&a, &da)?;
    let (b0, b1) = chord(&b, &db)?;

    let ta = (direction.dot(&a0), direction.dot(&a1));
    let tb = (direction.dot(&b0), direction.dot(&b1));
    let (a_lo, a_hi) = (ta.0.min(ta.1), ta.0.max(ta.1));
    let (b_lo, b_hi) = (tb.0.min(tb.1), tb.0.max(tb.1));
    let lo = a_lo.max(b_lo);
    let hi = a_hi.min(b_hi);
    if hi - lo <= min_length {
        return None;
    }

    // Parametrize along chord A; both endpoints lie within it
    let at = |t: f64| a0.lerp(&a1, (t - ta.0) / (ta.1 - ta.0));
    Some((at(lo), at(hi)))
}

/// Vertices strictly on both sides of the plane
fn straddles(d: &[f64; 3]) -> bool {
    let max = d.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = d.iter().cloned().fold(f64::INFINITY, f64::min);
    max > PLANE_EPS && min < -PLANE_EPS
}

/// Segment where the other plane cuts `tri`, given signed distances `d`
fn chord(tri: &[Vec3; 3], d: &[f64; 3]) -> Option<(Vec3, Vec3)> {
    let mut points: Vec<Vec3> = Vec::with_capacity(3);
    for i in 0..3 {
        let j = (i + 1) % 3;
        if d[i].abs() <= PLANE_EPS {
            points.push(tri[i]);
        } else if (d[i] > PLANE_EPS && d[j] < -PLANE_EPS) || (d[i] < -PLANE_EPS && d[j] > PLANE_EPS) {
            let t = d[i] / (d[i] - d[j]);
            points.push(tri[i].lerp(&tri[j], t));
        }
    }
    match points.as_slice() {
        [p, q] => Some((*p, *q)),
        [p, rest @ ..] => rest
            .iter()
            .find(|q| (**q - *p).norm() > 0.0)
            .map(|q| (*p, *q)),
        [] => None,
    }
}

/// Classify `p` against `tri` using barycentric coordinates with slack `tolerance`
pub fn locate_point(p: Vec3, tri: [Vec3; 3], tolerance: f64) -> PointLocation {
    let Some(bc) = barycentric(p, tri[0], tri[1], tri[2]) else {
        return PointLocation::Inside;
    };
    if let Some(k) = (0..3).find(|&k| bc[k] >= 1.0 - tolerance) {
        return PointLocation::Vertex(k);
    }
    // A vanishing coordinate k puts the point on the edge opposite corner k
    if let Some(k) = (0..3).find(|&k| bc[k] <= tolerance) {
        return PointLocation::OnEdge((k + 1) % 3);
    }
    PointLocation::Inside
}

/// Re-triangulate `tri` (corner vertex ids) so that the segment from vertex
/// `p` to vertex `q` becomes an edge. Winding of the host is kept.
///
/// `None` when the segment already lies on the host's edges or the
/// configuration is not handled.
pub fn split_by_segment(
    tri: [u32; 3],
    p: (PointLocation, u32),
    q: (PointLocation, u32),
    locate_in: impl Fn([u32; 3], u32) -> PointLocation,
) -> Option<Vec<[u32; 3]>> {
    use PointLocation::*;

    let corner = |k: usize| tri[k % 3];
    match (p.0, q.0) {
        (OnEdge(i), OnEdge(j)) if i != j => {
            // X on edge i, Y on the following edge; they share corner i+1
            let (i, x, y) = if (i + 1) % 3 == j { (i, p.1, q.1) } else { (j, q.1, p.1) };
            let (a, b, c) = (corner(i), corner(i + 1), corner(i + 2));
            Some(vec![[x, b, y], [a, x, y], [a, y, c]])
        }
        (OnEdge(i), Inside) | (Inside, OnEdge(i)) => {
            let (x, inner) = if matches!(p.0, OnEdge(_)) { (p.1, q.1) } else { (q.1, p.1) };
            let (a, b, c) = (corner(i), corner(i + 1), corner(i + 2));
            Some(vec![[a, x, inner], [x, b, inner], [b, c, inner], [c, a, inner]])
        }
        (Vertex(k), OnEdge(i)) | (OnEdge(i), Vertex(k)) if i == (k + 1) % 3 => {
            let x = if matches!(p.0, OnEdge(_)) { p.1 } else { q.1 };
            let (a, b, c) = (corner(k), corner(k + 1), corner(k + 2));
            Some(vec![[a, b, x], [a, x, c]])
        }
        (Vertex(_), Inside) | (Inside, Vertex(_)) => {
            let inner = if matches!(p.0, Inside) { p.1 } else { q.1 };
            Some(fan(tri, inner).to_vec())
        }
        (Inside, Inside) => {
            // Fan around p, then fan the piece holding q around q
            let pieces = fan(tri, p.1);
            let host = pieces
                .iter()
                .position(|piece| locate_in(*piece, q.1) == Inside)?;
            let mut out: Vec<[u32; 3]> = pieces
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != host)
                .map(|(_, piece)| *piece)
                .collect();
            out.extend(fan(pieces[host], q.1));
            Some(out)
        }
        _ => None,
    }
}

fn fan(tri: [u32; 3], center: u32) -> [[u32; 3]; 3] {
    [
        [tri[0], tri[1], center],
        [tri[1], tri[2], center],
        [tri[2], tri[0], center],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn t1() -> [Vec3; 3] {
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
        ]
    }

    fn t2() -> [Vec3; 3] {
        [
            Vec3::new(-1.5, 1.0, -1.0),
            Vec3::new(4.5, 1.0, -1.0),
            Vec3::new(1.5, 1.0, 1.0),
        ]
    }

    #[test]
    fn test_crossing_segment() {
        let (p, q) = intersection_segment(t1(), t2(), 1e-9).unwrap();
        let (lo, hi) = if p.x < q.x { (p, q) } else { (q, p) };
        assert_relative_eq!(lo.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(hi.x, 3.0, epsilon = 1e-12);
        for v in [lo, hi] {
            assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
            assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_no_segment_for_disjoint_or_coplanar() {
        let far = t2().map(|v| v + Vec3::new(0.0, 0.0, 10.0));
        assert!(intersection_segment(t1(), far, 1e-9).is_none());

        let coplanar = t1().map(|v| v + Vec3::new(1.0, 1.0, 0.0));
        assert!(intersection_segment(t1(), coplanar, 1e-9).is_none());
    }

    #[test]
    fn test_locate_point() {
        let tri = t1();
        assert_eq!(locate_point(Vec3::new(0.0, 0.0, 0.0), tri, 1e-9), PointLocation::Vertex(0));
        assert_eq!(locate_point(Vec3::new(2.0, 0.0, 0.0), tri, 1e-9), PointLocation::OnEdge(0));
        assert_eq!(locate_point(Vec3::new(2.0, 2.0, 0.0), tri, 1e-9), PointLocation::OnEdge(1));
        assert_eq!(locate_point(Vec3::new(0.0, 1.0, 0.0), tri, 1e-9), PointLocation::OnEdge(2));
        assert_eq!(locate_point(Vec3::new(1.0, 1.0, 0.0), tri, 1e-9), PointLocation::Inside);
    }

    #[test]
    fn test_split_adjacent_edges() {
        use PointLocation::*;
        let no_lookup = |_: [u32; 3], _: u32| Inside;
        // q on edge 1, p on edge 2
        let pieces = split_by_segment([0, 1, 2], (OnEdge(2), 10), (OnEdge(1), 11), no_lookup).unwrap();
        assert_eq!(pieces, vec![[11, 2, 10], [1, 11, 10], [1, 10, 0]]);
    }

    #[test]
    fn test_split_shapes() {
        use PointLocation::*;
        let no_lookup = |_: [u32; 3], _: u32| OnEdge(0);
        let count = |p, q| split_by_segment([0, 1, 2], p, q, no_lookup).map(|v| v.len());

        assert_eq!(count((OnEdge(0), 10), (Inside, 11)), Some(4));
        assert_eq!(count((Vertex(2), 10), (OnEdge(0), 11)), Some(2));
        assert_eq!(count((Vertex(0), 10), (Inside, 11)), Some(3));
        // Segment along an edge of the host
        assert_eq!(count((Vertex(0), 10), (OnEdge(0), 11)), None);
        assert_eq!(count((OnEdge(1), 10), (OnEdge(1), 11)), None);
        // q never found strictly inside a fan piece
        assert_eq!(count((Inside, 10), (Inside, 11)), None);
    }
}
