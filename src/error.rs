// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the mesh kernel.

use thiserror::Error;

use crate::engine::BooleanOp;

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors raised by kernel operations.
///
/// Repair operations never return an error for "nothing to do"; they return
/// zero instead. Querying an unknown face name is not an error either.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The boolean engine rejected the authoring mesh during rebuild.
    #[error(
        "engine rejected mesh{}: {triangles} triangles, {vertices} vertices: {source}",
        feature_suffix(.feature)
    )]
    ConstructionFailure {
        /// Feature that authored the mesh, if known.
        feature: Option<String>,
        /// Triangle count handed to the engine.
        triangles: usize,
        /// Vertex count handed to the engine.
        vertices: usize,
        #[source]
        source: EngineError,
    },

    /// An operation that needs non-degenerate geometry got degenerate input.
    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },

    /// The engine failed while running a boolean or simplify.
    #[error("{op} failed: {source}")]
    Boolean {
        op: BooleanOp,
        #[source]
        source: EngineError,
    },

    /// The engine failed while simplifying or changing a solid's tolerance.
    #[error("{operation} failed: {source}")]
    Simplify {
        operation: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

fn feature_suffix(feature: &Option<String>) -> String {
    match feature {
        Some(name) => format!(" from feature '{name}'"),
        None => String::new(),
    }
}

impl KernelError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        KernelError::DegenerateInput {
            reason: reason.into(),
        }
    }
}

/// Errors raised by a [`BooleanEngine`](crate::engine::BooleanEngine).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An undirected edge is used by more than two triangles.
    #[error("edge ({a}, {b}) is used by {uses} triangles")]
    NonManifoldEdge {
        /// Lower vertex index.
        a: u32,
        /// Higher vertex index.
        b: u32,
        /// Number of triangles using the edge.
        uses: usize,
    },

    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex { index: usize },

    #[error("vertex index {index} out of range ({vertex_count} vertices)")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{triangles} triangles but {face_ids} face ids")]
    FaceIdCount { triangles: usize, face_ids: usize },

    /// A solid created by another engine was passed in.
    #[error("solid was not created by engine '{engine}'")]
    ForeignHandle { engine: &'static str },
}
