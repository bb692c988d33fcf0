// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean engine interface
//!
//! The kernel never computes booleans itself. It hands validated meshes to a
//! [`BooleanEngine`], which owns the resulting [`Solid`] handles and must
//! carry every input triangle's face id onto the triangles it produces.

pub mod csg;
pub mod instrument;

pub use csg::CsgEngine;
pub use instrument::{Instrumented, MetricsRecorder, OperationMetrics, OperationSummary};

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::ops::Range;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtract => "subtract",
            BooleanOp::Intersect => "intersect",
        };
        f.write_str(name)
    }
}

/// Engine input/output layout: positions, index triples, one face id per triangle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMesh {
    pub positions: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
    pub face_ids: Vec<u32>,
}

impl EngineMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Opaque handle to an engine-owned solid
pub struct Solid {
    engine: &'static str,
    inner: Box<dyn Any + Send + Sync>,
    triangles: usize,
    vertices: usize,
}

impl Solid {
    pub fn new<T: Any + Send + Sync>(
        engine: &'static str,
        inner: T,
        triangles: usize,
        vertices: usize,
    ) -> Self {
        Self {
            engine,
            inner: Box::new(inner),
            triangles,
            vertices,
        }
    }

    /// Name of the engine that created this solid
    pub fn engine(&self) -> &'static str {
        self.engine
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices
    }
}

impl fmt::Debug for Solid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solid")
            .field("engine", &self.engine)
            .field("triangles", &self.triangles)
            .field("vertices", &self.vertices)
            .finish()
    }
}

/// Boolean-CSG engine contract
///
/// Every operation that produces a solid propagates each output triangle's
/// originating face id.
pub trait BooleanEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Merge border vertices as needed and build a solid from `mesh`.
    fn construct(&self, mesh: &EngineMesh) -> Result<Solid, EngineError>;

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanOp) -> Result<Solid, EngineError>;

    /// Collapse features smaller than `tolerance` (engine default when `None`)
    fn simplify(&self, solid: &Solid, tolerance: Option<f64>) -> Result<Solid, EngineError>;

    fn set_tolerance(&self, solid: &Solid, tolerance: f64) -> Result<Solid, EngineError>;

    /// Triangle mesh of a solid
    fn extract(&self, solid: &Solid) -> Result<EngineMesh, EngineError>;

    /// Mint `n` globally unique face ids
    fn reserve_ids(&self, n: u32) -> Range<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_downcast() {
        let solid = Solid::new("test", 42u32, 1, 3);
        assert_eq!(solid.downcast_ref::<u32>(), Some(&42));
        assert!(solid.downcast_ref::<String>().is_none());
        assert_eq!(solid.engine(), "test");
    }

    #[test]
    fn test_op_display() {
        assert_eq!(BooleanOp::Subtract.to_string(), "subtract");
    }
}
