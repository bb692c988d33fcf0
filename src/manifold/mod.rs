// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Manifoldization and boolean operations
//!
//! A buffer's engine handle is built lazily from its authoring arrays:
//! windings are made coherent and outward, the arrays are packed into an
//! [`EngineMesh`] and handed to the kernel's engine. The handle and the
//! engine's validated copy of the mesh live in the buffer's cache until the
//! buffer is mutated, released, or sits idle past the kernel's window.

pub(crate) mod cache;

use ahash::AHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::engine::{BooleanOp, EngineMesh, Solid};
use crate::error::{KernelError, KernelResult};
use crate::geometry::labels::FaceLabelRegistry;
use crate::geometry::MeshBuffer;
use crate::kernel::Kernel;
use crate::utils::math::Vec3;

impl MeshBuffer {
    pub fn union(&mut self, other: &mut MeshBuffer) -> KernelResult<MeshBuffer> {
        self.boolean(other, BooleanOp::Union)
    }

    pub fn subtract(&mut self, other: &mut MeshBuffer) -> KernelResult<MeshBuffer> {
        self.boolean(other, BooleanOp::Subtract)
    }

    pub fn intersect(&mut self, other: &mut MeshBuffer) -> KernelResult<MeshBuffer> {
        self.boolean(other, BooleanOp::Intersect)
    }

    /// Same as [`subtract`](Self::subtract)
    pub fn difference(&mut self, other: &mut MeshBuffer) -> KernelResult<MeshBuffer> {
        self.subtract(other)
    }

    /// Run `op` on both operands' engine handles and rebuild a labelled
    /// buffer from the result. Face labels of both operands are merged.
    pub fn boolean(&mut self, other: &mut MeshBuffer, op: BooleanOp) -> KernelResult<MeshBuffer> {
        let (a, _) = self.ensure_solid()?;
        let (b, _) = other.ensure_solid()?;

        let kernel = Arc::clone(self.kernel());
        let solid = kernel
            .engine()
            .boolean(&a, &b, op)
            .map_err(|source| KernelError::Boolean { op, source })?;
        let result = kernel
            .engine()
            .extract(&solid)
            .map_err(|source| KernelError::Boolean { op, source })?;

        let mut labels = self.labels.clone();
        let remap = labels.merge(&other.labels);
        debug!(%op, triangles = result.triangle_count(), "boolean");
        Ok(self.rebuilt_from(&kernel, solid, result, labels, &remap))
    }

    /// Collapse features below `tolerance` (engine default when `None`)
    pub fn simplify(&mut self, tolerance: Option<f64>) -> KernelResult<MeshBuffer> {
        if let Some(value) = tolerance {
            check_tolerance(value)?;
        }
        let (solid, _) = self.ensure_solid()?;
        let kernel = Arc::clone(self.kernel());
        self.rederive(&kernel, "simplify", kernel.engine().simplify(&solid, tolerance))
    }

    pub fn set_tolerance(&mut self, tolerance: f64) -> KernelResult<MeshBuffer> {
        check_tolerance(tolerance)?;
        let (solid, _) = self.ensure_solid()?;
        let kernel = Arc::clone(self.kernel());
        self.rederive(&kernel, "set_tolerance", kernel.engine().set_tolerance(&solid, tolerance))
    }

    /// Mesh as accepted by the engine: vertices merged, windings coherent
    /// and outward.
    pub fn validated_mesh(&mut self) -> KernelResult<Arc<EngineMesh>> {
        self.ensure_solid().map(|(_, validated)| validated)
    }

    /// Dispose of the engine handle now. Returns whether one was held.
    /// The next engine access rebuilds it.
    pub fn release(&mut self) -> bool {
        let held = self.cache.clear();
        if held {
            debug!("released engine handle");
        }
        held
    }

    pub fn has_engine_handle(&self) -> bool {
        self.cache.has_handle()
    }

    /// Cached handle, rebuilt when the buffer is dirty or the handle was
    /// released
    pub(crate) fn ensure_solid(&mut self) -> KernelResult<(Arc<Solid>, Arc<EngineMesh>)> {
        if !self.is_dirty() {
            if let Some(cached) = self.cache.get() {
                return Ok(cached);
            }
        }
        self.rebuild_solid()
    }

    fn rebuild_solid(&mut self) -> KernelResult<(Arc<Solid>, Arc<EngineMesh>)> {
        self.fix_windings();
        self.enforce_outward();

        let input = EngineMesh {
            positions: self.positions(),
            triangles: self.triangles(),
            face_ids: self.face_ids.clone(),
        };
        let kernel = Arc::clone(self.kernel());
        let built = kernel
            .engine()
            .construct(&input)
            .and_then(|solid| {
                let validated = kernel.engine().extract(&solid)?;
                Ok((solid, validated))
            });

        match built {
            Ok((solid, validated)) => {
                let (solid, validated) = (Arc::new(solid), Arc::new(validated));
                self.cache.store(Arc::clone(&solid), Arc::clone(&validated));
                self.mark_clean();
                debug!(
                    triangles = validated.triangle_count(),
                    vertices = validated.vertex_count(),
                    "rebuilt engine handle"
                );
                Ok((solid, validated))
            }
            Err(source) => {
                self.mark_dirty();
                Err(KernelError::ConstructionFailure {
                    feature: self.feature().map(str::to_string),
                    triangles: input.triangle_count(),
                    vertices: input.vertex_count(),
                    source,
                })
            }
        }
    }

    fn rederive(
        &self,
        kernel: &Arc<Kernel>,
        operation: &'static str,
        solid: Result<Solid, crate::error::EngineError>,
    ) -> KernelResult<MeshBuffer> {
        let wrap = |source| KernelError::Simplify { operation, source };
        let solid = solid.map_err(wrap)?;
        let result = kernel.engine().extract(&solid).map_err(wrap)?;
        Ok(self.rebuilt_from(kernel, solid, result, self.labels.clone(), &AHashMap::new()))
    }

    /// Fresh buffer over an engine result, its cache seeded with `solid`.
    /// Face ids are passed through `remap`; ids with no registered name are
    /// labelled `face_{id}`.
    fn rebuilt_from(
        &self,
        kernel: &Arc<Kernel>,
        solid: Solid,
        mesh: EngineMesh,
        mut labels: FaceLabelRegistry,
        remap: &AHashMap<u32, u32>,
    ) -> MeshBuffer {
        let mut out = MeshBuffer::new(kernel);
        if let Some(feature) = self.feature() {
            out.set_feature(feature);
        }

        let vertex_ids: Vec<u32> = mesh
            .positions
            .iter()
            .map(|p| out.insert_vertex(Vec3::from(*p)))
            .collect();
        for (tri, &id) in mesh.triangles.iter().zip(&mesh.face_ids) {
            let mut id = remap.get(&id).copied().unwrap_or(id);
            if !labels.contains_id(id) {
                warn!(face_id = id, "engine returned an unregistered face id");
                id = labels.insert(id, &format!("face_{id}"));
            }
            out.push_triangle(tri.map(|v| vertex_ids[v as usize]), id);
        }
        out.labels = labels;

        out.cache.store(Arc::new(solid), Arc::new(mesh));
        out.mark_clean();
        out
    }
}

fn check_tolerance(value: f64) -> KernelResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(KernelError::degenerate(format!(
            "tolerance must be finite and non-negative, got {value}"
        )))
    }
}
