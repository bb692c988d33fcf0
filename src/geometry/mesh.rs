// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh buffer with face-label provenance
//!
//! Positions, indices and face ids are the authoring arrays and the single
//! source of truth. Everything derived from them (the face index, the engine
//! handle, the validated mesh) is dropped on mutation and rebuilt on demand.

use ahash::AHashMap;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use super::bbox::BoundingBox;
use super::labels::FaceLabelRegistry;
use super::predicates::tetra_volume;
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::manifold::cache::ManifoldCache;
use crate::utils::math::{triangle_area, triangle_cross, Mat4, Vec3};

/// Cross-product magnitude at or below which a triangle has no area
pub(crate) const DEGENERATE_CROSS: f64 = 1e-12;

type VertexKey = [i64; 3];

/// Helper polyline attached to a mesh; never triangulated or repaired
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub name: String,
    pub points: Vec<[f64; 3]>,
}

/// Triangles of one face label, re-indexed over their own vertices
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMesh {
    pub name: String,
    /// `None` when the name is not registered on the mesh
    pub face_id: Option<u32>,
    pub positions: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl FaceMesh {
    fn empty(name: &str, face_id: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            face_id,
            positions: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

/// Triangle mesh whose triangles carry persistent face labels
pub struct MeshBuffer {
    kernel: Arc<Kernel>,
    pub(crate) positions: Vec<Vec3>,
    pub(crate) indices: Vec<u32>,
    pub(crate) face_ids: Vec<u32>,
    pub(crate) labels: FaceLabelRegistry,
    vertex_lookup: AHashMap<VertexKey, u32>,
    weld_epsilon: Option<f64>,
    dirty: bool,
    face_index: OnceCell<AHashMap<u32, Vec<usize>>>,
    pub(crate) cache: ManifoldCache,
    aux_edges: Vec<Polyline>,
    centerlines: Vec<Polyline>,
    feature: Option<String>,
}

impl MeshBuffer {
    /// Create an empty mesh bound to `kernel`
    pub fn new(kernel: &Arc<Kernel>) -> Self {
        Self {
            kernel: Arc::clone(kernel),
            positions: Vec::new(),
            indices: Vec::new(),
            face_ids: Vec::new(),
            labels: FaceLabelRegistry::new(),
            vertex_lookup: AHashMap::new(),
            weld_epsilon: None,
            dirty: true,
            face_index: OnceCell::new(),
            cache: ManifoldCache::new(kernel.reaper()),
            aux_edges: Vec::new(),
            centerlines: Vec::new(),
            feature: None,
        }
    }

    /// Tag the mesh with the feature that authored it, for diagnostics
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn set_feature(&mut self, feature: impl Into<String>) {
        self.feature = Some(feature.into());
    }

    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    /// Append a triangle labelled `face`. Winding is taken as given.
    /// Returns the new triangle's index.
    pub fn add_triangle(&mut self, face: &str, v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> usize {
        let face_id = self.labels.resolve(face, self.kernel.engine());
        let tri = [v0, v1, v2].map(|p| self.insert_vertex(Vec3::from(p)));
        self.push_triangle(tri, face_id)
    }

    /// Snap vertices to a grid of cell size `epsilon`, one representative per
    /// cell, then drop triangles that collapse and vertices left unused.
    ///
    /// Later insertions snap to the same grid. Returns the number of vertices
    /// removed.
    pub fn weld(&mut self, epsilon: f64) -> KernelResult<usize> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(KernelError::degenerate(format!(
                "weld epsilon must be positive, got {epsilon}"
            )));
        }

        let before = self.positions.len();
        let mut cells: AHashMap<VertexKey, u32> = AHashMap::with_capacity(before);
        let remap: Vec<u32> = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| *cells.entry(cell_key(*p, epsilon)).or_insert(i as u32))
            .collect();

        for index in &mut self.indices {
            *index = remap[*index as usize];
        }
        let keep: Vec<bool> = (0..self.triangle_count())
            .map(|t| !self.is_degenerate(t))
            .collect();

        self.weld_epsilon = Some(epsilon);
        let dropped = self.retain_triangles(&keep);
        self.compact_vertices();
        self.rebuild_lookup();
        self.mark_dirty();

        let removed = before - self.positions.len();
        tracing::debug!(epsilon, removed, dropped, "weld");
        Ok(removed)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.face_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.face_ids.is_empty()
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.positions.iter().map(|p| p.to_array()).collect()
    }

    pub fn triangles(&self) -> Vec<[u32; 3]> {
        self.indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    }

    pub fn face_ids(&self) -> &[u32] {
        &self.face_ids
    }

    /// True when the authoring arrays changed since the last engine rebuild
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Registered face names, in creation order
    pub fn face_names(&self) -> Vec<String> {
        self.labels.names()
    }

    pub fn face_id(&self, name: &str) -> Option<u32> {
        self.labels.id(name)
    }

    pub fn face_name(&self, id: u32) -> Option<&str> {
        self.labels.name(id)
    }

    /// Triangles labelled `name`. Unknown or emptied faces give an empty result.
    pub fn face(&self, name: &str) -> FaceMesh {
        let Some(id) = self.labels.id(name) else {
            return FaceMesh::empty(name, None);
        };
        let Some(triangles) = self.face_index().get(&id) else {
            return FaceMesh::empty(name, Some(id));
        };

        let mut face = FaceMesh::empty(name, Some(id));
        let mut local: AHashMap<u32, u32> = AHashMap::new();
        for &t in triangles {
            let tri = self.tri(t).map(|v| {
                *local.entry(v).or_insert_with(|| {
                    face.positions.push(self.positions[v as usize].to_array());
                    (face.positions.len() - 1) as u32
                })
            });
            face.triangles.push(tri);
        }
        face
    }

    /// Every non-empty face, in creation order
    pub fn faces(&self) -> Vec<FaceMesh> {
        self.labels
            .names()
            .iter()
            .map(|name| self.face(name))
            .filter(|face| !face.is_empty())
            .collect()
    }

    pub fn add_aux_edge(&mut self, name: &str, points: &[[f64; 3]]) -> KernelResult<()> {
        let polyline = checked_polyline(name, points)?;
        self.aux_edges.push(polyline);
        Ok(())
    }

    pub fn add_centerline(&mut self, name: &str, points: &[[f64; 3]]) -> KernelResult<()> {
        let polyline = checked_polyline(name, points)?;
        self.centerlines.push(polyline);
        Ok(())
    }

    pub fn aux_edges(&self) -> &[Polyline] {
        &self.aux_edges
    }

    pub fn centerlines(&self) -> &[Polyline] {
        &self.centerlines
    }

    pub fn translate(&mut self, offset: [f64; 3]) {
        self.transform(&Mat4::translation(offset.into()));
    }

    /// Scale about the origin. Negative factors mirror; winding is flipped
    /// to stay outward.
    pub fn scale(&mut self, factors: [f64; 3]) -> KernelResult<()> {
        if factors.iter().any(|f| *f == 0.0 || !f.is_finite()) {
            return Err(KernelError::degenerate(format!(
                "scale factors must be finite and non-zero, got {factors:?}"
            )));
        }
        self.transform(&Mat4::scaling(factors.into()));
        Ok(())
    }

    /// Rotate about +Z by `degrees`
    pub fn rotate_z(&mut self, degrees: f64) {
        self.transform(&Mat4::rotation_z(degrees.to_radians()));
    }

    /// Apply an affine transform to geometry and helper polylines
    pub(crate) fn transform(&mut self, matrix: &Mat4) {
        for p in &mut self.positions {
            *p = matrix.transform_point(*p);
        }
        for polyline in self.aux_edges.iter_mut().chain(self.centerlines.iter_mut()) {
            for p in &mut polyline.points {
                *p = matrix.transform_point(Vec3::from(*p)).to_array();
            }
        }
        if matrix.linear_determinant() < 0.0 {
            for t in 0..self.triangle_count() {
                self.flip_triangle(t);
            }
        }
        self.rebuild_lookup();
        self.mark_dirty();
    }

    /// Divergence-theorem volume; positive for a closed outward mesh
    pub fn signed_volume(&self) -> f64 {
        self.triangle_corners()
            .map(|[a, b, c]| tetra_volume(a, b, c))
            .sum()
    }

    pub fn surface_area(&self) -> f64 {
        self.triangle_corners()
            .map(|[a, b, c]| triangle_area(a, b, c))
            .sum()
    }

    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`, zeros when empty
    pub fn bounding_box(&self) -> [f64; 6] {
        BoundingBox::from_points(self.positions.iter().copied()).to_array()
    }

    /// Concatenate `other`'s geometry, labels and helper polylines without CSG
    pub fn append(&mut self, other: &MeshBuffer) {
        let remap = self.labels.merge(&other.labels);
        for t in 0..other.triangle_count() {
            let tri = other.corners(t).map(|p| self.insert_vertex(p));
            let id = other.face_ids[t];
            self.push_triangle(tri, remap.get(&id).copied().unwrap_or(id));
        }
        self.aux_edges.extend(other.aux_edges.iter().cloned());
        self.centerlines.extend(other.centerlines.iter().cloned());
        self.mark_dirty();
    }

    /// Remove vertices no triangle references. Returns the number removed.
    pub fn remove_orphaned_vertices(&mut self) -> usize {
        let removed = self.compact_vertices();
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    /// Remove triangles with a repeated index or no area
    pub fn remove_degenerate_triangles(&mut self) -> usize {
        let keep: Vec<bool> = (0..self.triangle_count())
            .map(|t| !self.is_degenerate(t))
            .collect();
        let removed = self.retain_triangles(&keep);
        if removed > 0 {
            self.compact_vertices();
        }
        removed
    }

    pub(crate) fn tri(&self, t: usize) -> [u32; 3] {
        let base = t * 3;
        [self.indices[base], self.indices[base + 1], self.indices[base + 2]]
    }

    pub(crate) fn set_tri(&mut self, t: usize, tri: [u32; 3]) {
        self.indices[t * 3..t * 3 + 3].copy_from_slice(&tri);
    }

    pub(crate) fn corners(&self, t: usize) -> [Vec3; 3] {
        self.tri(t).map(|v| self.positions[v as usize])
    }

    pub(crate) fn triangle_corners(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.triangle_count()).map(|t| self.corners(t))
    }

    /// Reverse winding by swapping the last two corners. Does not mark dirty.
    pub(crate) fn flip_triangle(&mut self, t: usize) {
        self.indices.swap(t * 3 + 1, t * 3 + 2);
    }

    pub(crate) fn is_degenerate(&self, t: usize) -> bool {
        let [a, b, c] = self.tri(t);
        if a == b || b == c || a == c {
            return true;
        }
        let [p0, p1, p2] = self.corners(t);
        triangle_cross(p0, p1, p2).norm() <= DEGENERATE_CROSS
    }

    /// Index of `p`, reusing an existing vertex with the same key
    pub(crate) fn insert_vertex(&mut self, p: Vec3) -> u32 {
        let key = match self.weld_epsilon {
            Some(eps) => cell_key(p, eps),
            None => exact_key(p),
        };
        let next = self.positions.len() as u32;
        let index = *self.vertex_lookup.entry(key).or_insert(next);
        if index == next {
            self.positions.push(p);
        }
        index
    }

    pub(crate) fn push_triangle(&mut self, tri: [u32; 3], face_id: u32) -> usize {
        self.indices.extend_from_slice(&tri);
        self.face_ids.push(face_id);
        self.mark_dirty();
        self.face_ids.len() - 1
    }

    /// Keep triangles whose flag is set. Vertices are left in place; callers
    /// compact afterwards. Returns the number removed.
    pub(crate) fn retain_triangles(&mut self, keep: &[bool]) -> usize {
        let before = self.triangle_count();
        let mut write = 0;
        for t in 0..before {
            if !keep[t] {
                continue;
            }
            if write != t {
                let tri = self.tri(t);
                self.set_tri(write, tri);
                self.face_ids[write] = self.face_ids[t];
            }
            write += 1;
        }
        self.indices.truncate(write * 3);
        self.face_ids.truncate(write);
        let removed = before - write;
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    /// Drop unreferenced vertices and rewrite indices. Returns the number removed.
    pub(crate) fn compact_vertices(&mut self) -> usize {
        let mut used = vec![false; self.positions.len()];
        for &i in &self.indices {
            used[i as usize] = true;
        }

        let mut new_indices = vec![0u32; self.positions.len()];
        let mut new_positions = Vec::with_capacity(self.positions.len());
        for (old, &is_used) in used.iter().enumerate() {
            if is_used {
                new_indices[old] = new_positions.len() as u32;
                new_positions.push(self.positions[old]);
            }
        }
        for i in &mut self.indices {
            *i = new_indices[*i as usize];
        }

        let removed = self.positions.len() - new_positions.len();
        self.positions = new_positions;
        if removed > 0 {
            self.rebuild_lookup();
        }
        removed
    }

    /// Discard everything derived from the authoring arrays
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
        self.face_index.take();
        self.cache.clear();
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn rebuild_lookup(&mut self) {
        self.vertex_lookup.clear();
        for (i, p) in self.positions.iter().enumerate() {
            let key = match self.weld_epsilon {
                Some(eps) => cell_key(*p, eps),
                None => exact_key(*p),
            };
            self.vertex_lookup.entry(key).or_insert(i as u32);
        }
    }

    fn face_index(&self) -> &AHashMap<u32, Vec<usize>> {
        self.face_index.get_or_init(|| {
            let mut index: AHashMap<u32, Vec<usize>> = AHashMap::new();
            for (t, id) in self.face_ids.iter().enumerate() {
                index.entry(*id).or_default().push(t);
            }
            index
        })
    }
}

impl Clone for MeshBuffer {
    /// Copies the authoring state; the copy starts without an engine handle.
    fn clone(&self) -> Self {
        Self {
            kernel: Arc::clone(&self.kernel),
            positions: self.positions.clone(),
            indices: self.indices.clone(),
            face_ids: self.face_ids.clone(),
            labels: self.labels.clone(),
            vertex_lookup: self.vertex_lookup.clone(),
            weld_epsilon: self.weld_epsilon,
            dirty: true,
            face_index: OnceCell::new(),
            cache: ManifoldCache::new(self.kernel.reaper()),
            aux_edges: self.aux_edges.clone(),
            centerlines: self.centerlines.clone(),
            feature: self.feature.clone(),
        }
    }
}

impl fmt::Debug for MeshBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshBuffer")
            .field("feature", &self.feature)
            .field("vertices", &self.vertex_count())
            .field("triangles", &self.triangle_count())
            .field("faces", &self.labels.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn exact_key(p: Vec3) -> VertexKey {
    // -0.0 and 0.0 are the same vertex
    [p.x, p.y, p.z].map(|c| if c == 0.0 { 0 } else { c.to_bits() as i64 })
}

fn cell_key(p: Vec3, epsilon: f64) -> VertexKey {
    [p.x, p.y, p.z].map(|c| (c / epsilon).floor() as i64)
}

fn checked_polyline(name: &str, points: &[[f64; 3]]) -> KernelResult<Polyline> {
    if points.len() < 2 {
        return Err(KernelError::degenerate(format!(
            "polyline '{name}' needs at least two points, got {}",
            points.len()
        )));
    }
    for (i, pair) in points.windows(2).enumerate() {
        let (a, b) = (Vec3::from(pair[0]), Vec3::from(pair[1]));
        if !a.is_finite() || !b.is_finite() {
            return Err(KernelError::degenerate(format!(
                "polyline '{name}' has a non-finite point near index {i}"
            )));
        }
        if (b - a).norm() == 0.0 {
            return Err(KernelError::degenerate(format!(
                "polyline '{name}' has a zero-length segment at index {i}"
            )));
        }
    }
    Ok(Polyline {
        name: name.to_string(),
        points: points.to_vec(),
    })
}
