// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric predicates shared by the repair passes

use crate::utils::math::Vec3;

const EPS: f64 = 1e-9;

/// Signed volume of the tetrahedron (origin, a, b, c)
pub fn tetra_volume(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    a.dot(&b.cross(&c)) / 6.0
}

/// Möller–Trumbore ray/triangle test counting only hits in front of `origin`
pub fn ray_hits_triangle(origin: Vec3, direction: Vec3, [v0, v1, v2]: [Vec3; 3]) -> bool {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Parallel, scaled to the triangle so small parts are not skipped
    if a.abs() < EPS * edge1.norm() * edge2.norm() {
        return false;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    let t = f * edge2.dot(&q);
    t > EPS
}

/// Count forward ray hits against a set of triangles
pub fn count_ray_hits(
    origin: Vec3,
    direction: Vec3,
    triangles: impl IntoIterator<Item = [Vec3; 3]>,
) -> usize {
    triangles
        .into_iter()
        .filter(|tri| ray_hits_triangle(origin, direction, *tri))
        .count()
}

/// Signed solid angle subtended by triangle (a, b, c) at `p`
/// (Van Oosterom & Strackee). Positive when `p` sees the triangle's back side,
/// i.e. when `p` is inside a closed outward-oriented surface.
pub fn solid_angle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> f64 {
    let ra = a - p;
    let rb = b - p;
    let rc = c - p;
    let la = ra.norm();
    let lb = rb.norm();
    let lc = rc.norm();
    if la == 0.0 || lb == 0.0 || lc == 0.0 {
        return 0.0;
    }
    let numerator = ra.dot(&rb.cross(&rc));
    let denominator = la * lb * lc + ra.dot(&rb) * lc + rb.dot(&rc) * la + rc.dot(&ra) * lb;
    2.0 * numerator.atan2(denominator)
}

/// Generalized winding number of `p` with respect to a triangle soup.
///
/// Close to 1 inside a closed outward-oriented surface, 0 outside.
pub fn winding_number(p: Vec3, triangles: impl IntoIterator<Item = [Vec3; 3]>) -> f64 {
    let total: f64 = triangles
        .into_iter()
        .map(|[a, b, c]| solid_angle(p, a, b, c))
        .sum();
    total / (4.0 * std::f64::consts::PI)
}

/// Barycentric coordinates of `p` projected onto triangle (a, b, c).
/// `None` for a degenerate triangle.
pub fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<[f64; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f64::EPSILON * d00 * d11 {
        return None;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some([1.0 - v - w, v, w])
}
