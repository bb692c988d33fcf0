// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - labelled meshes and the operations on them

pub mod analytics;
pub(crate) mod bbox;
pub mod boundary;
pub mod labels;
pub mod mesh;
pub mod orientation;
pub(crate) mod predicates;
pub mod primitives;
pub mod repair;
pub mod topology;
pub(crate) mod triangle_intersection;

pub use analytics::MeshStats;
pub use boundary::BoundaryPolyline;
pub use labels::{FaceIdAllocator, FaceLabelRegistry};
pub use mesh::{FaceMesh, MeshBuffer, Polyline};
pub use primitives::{FaceNaming, Primitive};
pub use repair::IslandOptions;
