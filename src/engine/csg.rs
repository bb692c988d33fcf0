// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean engine backed by `csgrs`
//!
//! Triangles become `csgrs` polygons whose metadata is the face id, so the
//! fragments `csgrs` splits off keep their parent's id. Results come back as
//! convex polygons and are fan-triangulated and vertex-merged here.

use ahash::AHashMap;
use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh};
use csgrs::traits::*;
use std::ops::Range;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::{BooleanEngine, BooleanOp, EngineMesh, Solid};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::geometry::labels::FaceIdAllocator;
use crate::geometry::topology::EdgeKey;
use crate::utils::math::Vec3;

const ENGINE_NAME: &str = "csgrs";

/// Engine-side state behind a [`Solid`]
#[derive(Debug, Clone)]
struct CsgSolid {
    csg: Mesh<u32>,
    mesh: EngineMesh,
    tolerance: f64,
}

impl CsgSolid {
    fn from_mesh(mesh: EngineMesh, tolerance: f64) -> Self {
        Self {
            csg: to_csg(&mesh),
            mesh,
            tolerance,
        }
    }

    fn into_solid(self) -> Solid {
        let (triangles, vertices) = (self.mesh.triangle_count(), self.mesh.vertex_count());
        Solid::new(ENGINE_NAME, self, triangles, vertices)
    }
}

/// Default engine: `csgrs` BSP booleans with face ids carried as polygon metadata
pub struct CsgEngine {
    ids: Arc<FaceIdAllocator>,
    config: EngineConfig,
}

impl CsgEngine {
    pub fn new(ids: Arc<FaceIdAllocator>, config: EngineConfig) -> Self {
        Self { ids, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn unwrap_solid<'a>(&self, solid: &'a Solid) -> Result<&'a CsgSolid, EngineError> {
        solid
            .downcast_ref::<CsgSolid>()
            .ok_or(EngineError::ForeignHandle {
                engine: ENGINE_NAME,
            })
    }

    fn validate(&self, mesh: &EngineMesh) -> Result<(), EngineError> {
        if mesh.face_ids.len() != mesh.triangles.len() {
            return Err(EngineError::FaceIdCount {
                triangles: mesh.triangles.len(),
                face_ids: mesh.face_ids.len(),
            });
        }
        if let Some(index) = mesh
            .positions
            .iter()
            .position(|p| !p.iter().all(|c| c.is_finite()))
        {
            return Err(EngineError::NonFiniteVertex { index });
        }
        let vertex_count = mesh.positions.len();
        for tri in &mesh.triangles {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(EngineError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

impl BooleanEngine for CsgEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn construct(&self, mesh: &EngineMesh) -> Result<Solid, EngineError> {
        self.validate(mesh)?;
        let merged = merge_vertices(mesh, self.config.merge_tolerance);
        check_edge_uses(&merged)?;
        debug!(
            triangles = merged.triangle_count(),
            vertices = merged.vertex_count(),
            merged = mesh.vertex_count().saturating_sub(merged.vertex_count()),
            "csgrs construct"
        );
        Ok(CsgSolid::from_mesh(merged, self.config.merge_tolerance).into_solid())
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanOp) -> Result<Solid, EngineError> {
        let a = self.unwrap_solid(a)?;
        let b = self.unwrap_solid(b)?;
        let result = match op {
            BooleanOp::Union => a.csg.union(&b.csg),
            BooleanOp::Subtract => a.csg.difference(&b.csg),
            BooleanOp::Intersect => a.csg.intersection(&b.csg),
        };

        let tolerance = a.tolerance.max(b.tolerance);
        let mesh = merge_vertices(&from_csg(&result), tolerance);
        debug!(%op, polygons = result.polygons.len(), triangles = mesh.triangle_count(), "csgrs boolean");
        Ok(CsgSolid::from_mesh(mesh, tolerance).into_solid())
    }

    fn simplify(&self, solid: &Solid, tolerance: Option<f64>) -> Result<Solid, EngineError> {
        let inner = self.unwrap_solid(solid)?;
        let tolerance = tolerance.unwrap_or(inner.tolerance.max(self.config.merge_tolerance));
        let mesh = merge_vertices(&inner.mesh, tolerance);
        Ok(CsgSolid::from_mesh(mesh, tolerance).into_solid())
    }

    fn set_tolerance(&self, solid: &Solid, tolerance: f64) -> Result<Solid, EngineError> {
        let inner = self.unwrap_solid(solid)?;
        if tolerance > inner.tolerance {
            return self.simplify(solid, Some(tolerance));
        }
        let mut copy = inner.clone();
        copy.tolerance = tolerance;
        Ok(copy.into_solid())
    }

    fn extract(&self, solid: &Solid) -> Result<EngineMesh, EngineError> {
        Ok(self.unwrap_solid(solid)?.mesh.clone())
    }

    fn reserve_ids(&self, n: u32) -> Range<u32> {
        self.ids.reserve(n)
    }
}

fn to_csg(mesh: &EngineMesh) -> Mesh<u32> {
    let polygons = mesh
        .triangles
        .iter()
        .zip(&mesh.face_ids)
        .filter_map(|(tri, &face_id)| {
            let [a, b, c] = tri.map(|i| Vec3::from(mesh.positions[i as usize]));
            let normal = (b - a).cross(&(c - a)).try_normalize()?.to_array();
            let vertices = [a, b, c]
                .iter()
                .map(|p| Vertex::new(p.to_array().into(), normal.into()))
                .collect();
            Some(Polygon::new(vertices, Some(face_id)))
        })
        .collect();
    Mesh {
        polygons,
        bounding_box: OnceLock::new(),
        metadata: None,
    }
}

/// Fan-triangulate the convex polygons `csgrs` returns into an unwelded mesh
fn from_csg(csg: &Mesh<u32>) -> EngineMesh {
    let mut mesh = EngineMesh::default();
    for polygon in csg.polygons.iter().filter(|p| p.vertices.len() >= 3) {
        let base = mesh.positions.len() as u32;
        let face_id = polygon.metadata.unwrap_or_default();
        mesh.positions
            .extend(polygon.vertices.iter().map(|v| [v.pos.x, v.pos.y, v.pos.z]));
        for k in 1..polygon.vertices.len() as u32 - 1 {
            mesh.triangles.push([base, base + k, base + k + 1]);
            mesh.face_ids.push(face_id);
        }
    }
    mesh
}

fn quantize(p: [f64; 3], tolerance: f64) -> [i64; 3] {
    if tolerance > 0.0 {
        p.map(|c| (c / tolerance).round() as i64)
    } else {
        p.map(|c| if c == 0.0 { 0 } else { c.to_bits() as i64 })
    }
}

/// Collapse vertices that share a tolerance cell, dropping triangles that
/// degenerate and vertices no triangle uses.
fn merge_vertices(mesh: &EngineMesh, tolerance: f64) -> EngineMesh {
    let mut cells: AHashMap<[i64; 3], u32> = AHashMap::new();
    let mut remap = vec![0u32; mesh.positions.len()];
    let mut representatives: Vec<[f64; 3]> = Vec::new();
    for (i, &p) in mesh.positions.iter().enumerate() {
        let next = representatives.len() as u32;
        let id = *cells.entry(quantize(p, tolerance)).or_insert(next);
        if id == next {
            representatives.push(p);
        }
        remap[i] = id;
    }

    let mut out = EngineMesh::default();
    let mut used: AHashMap<u32, u32> = AHashMap::new();
    for (tri, &face_id) in mesh.triangles.iter().zip(&mesh.face_ids) {
        let t = tri.map(|i| remap[i as usize]);
        if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
            continue;
        }
        let [a, b, c] = t.map(|i| Vec3::from(representatives[i as usize]));
        let longest = (b - a)
            .norm_squared()
            .max((c - b).norm_squared())
            .max((a - c).norm_squared());
        if (b - a).cross(&(c - a)).norm() <= 1e-12 * longest {
            continue;
        }
        let t = t.map(|i| {
            let next = out.positions.len() as u32;
            let id = *used.entry(i).or_insert(next);
            if id == next {
                out.positions.push(representatives[i as usize]);
            }
            id
        });
        out.triangles.push(t);
        out.face_ids.push(face_id);
    }
    out
}

fn check_edge_uses(mesh: &EngineMesh) -> Result<(), EngineError> {
    let mut uses: AHashMap<EdgeKey, usize> = AHashMap::new();
    for tri in &mesh.triangles {
        for k in 0..3 {
            *uses.entry(EdgeKey::new(tri[k], tri[(k + 1) % 3])).or_default() += 1;
        }
    }
    let worst = uses
        .into_iter()
        .filter(|(_, n)| *n > 2)
        .min_by_key(|(edge, _)| (edge.a, edge.b));
    match worst {
        Some((edge, n)) => Err(EngineError::NonManifoldEdge {
            a: edge.a,
            b: edge.b,
            uses: n,
        }),
        None => Ok(()),
    }
}
