// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel services shared by all meshes

use std::sync::Arc;

use crate::config::KernelConfig;
use crate::engine::{BooleanEngine, CsgEngine};
use crate::geometry::labels::FaceIdAllocator;
use crate::manifold::cache::IdleReaper;

/// Process-wide kernel: boolean engine, face-id counter, configuration and
/// the idle-release reaper for engine handles.
///
/// Create one per process and share it; every [`MeshBuffer`](crate::MeshBuffer)
/// is bound to a kernel through an `Arc`.
pub struct Kernel {
    engine: Arc<dyn BooleanEngine>,
    config: KernelConfig,
    reaper: IdleReaper,
}

impl Kernel {
    /// Create a kernel with default configuration and the BSP engine
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        let ids = Arc::new(FaceIdAllocator::new());
        let engine = CsgEngine::new(ids, config.engine.clone());
        Self::with_engine(Arc::new(engine), config)
    }

    /// Use a caller-supplied engine. The engine owns face-id allocation.
    pub fn with_engine(engine: Arc<dyn BooleanEngine>, config: KernelConfig) -> Self {
        let reaper = IdleReaper::new(config.idle_release());
        Self {
            engine,
            config,
            reaper,
        }
    }

    /// Wrap in an `Arc`, ready for [`MeshBuffer::new`](crate::MeshBuffer::new)
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn engine(&self) -> &dyn BooleanEngine {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Release every engine handle idle longer than the configured window.
    /// Returns the number released.
    pub fn release_idle(&self) -> usize {
        self.reaper.sweep_now()
    }

    pub(crate) fn reaper(&self) -> &IdleReaper {
        &self.reaper
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("engine", &self.engine.name())
            .field("idle_release", &self.reaper.window())
            .finish()
    }
}
