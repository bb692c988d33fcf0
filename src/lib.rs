// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Facemesh mesh kernel
//!
//! Triangle meshes whose triangles carry persistent, named face labels that
//! survive boolean composition. Provides winding repair, a lazily cached
//! adapter to a boolean-CSG engine, a mesh-repair toolkit, seam extraction
//! between faces and STL I/O.
//!
//! ```no_run
//! use facemesh::{FaceNaming, Kernel, Primitive};
//!
//! let kernel = Kernel::new().shared();
//! let mut block = Primitive::cube([2.0; 3], false).to_mesh(&kernel, &FaceNaming::per_side("block"));
//! let mut drill = Primitive::cylinder(4.0, 0.5, 32).to_mesh(&kernel, &FaceNaming::uniform("hole"));
//! drill.translate([1.0, 1.0, -1.0]);
//!
//! let part = block.subtract(&mut drill)?;
//! assert!(!part.face("hole").is_empty());
//! # Ok::<(), facemesh::KernelError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod manifold;
pub(crate) mod utils;

pub use config::{EngineConfig, KernelConfig, RepairConfig};
pub use engine::{BooleanEngine, BooleanOp, CsgEngine, EngineMesh, Instrumented, MetricsRecorder, Solid};
pub use error::{EngineError, KernelError, KernelResult};
pub use geometry::{
    BoundaryPolyline, FaceIdAllocator, FaceMesh, FaceNaming, IslandOptions, MeshBuffer, MeshStats, Polyline,
    Primitive,
};
pub use io::{export_stl, import_stl, import_stl_file, write_binary_stl};
pub use kernel::Kernel;
