// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Face labels
//!
//! Face ids come from one [`FaceIdAllocator`] per process. Because ids are
//! never reused, the label maps of independently built meshes can be merged
//! by plain union.

use ahash::AHashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::engine::BooleanEngine;

/// Monotonic face-id counter shared by every mesh of a kernel
#[derive(Debug)]
pub struct FaceIdAllocator {
    next: AtomicU32,
}

impl FaceIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    /// Reserve `n` consecutive fresh ids
    pub fn reserve(&self, n: u32) -> Range<u32> {
        let start = self.next.fetch_add(n, Ordering::Relaxed);
        start..start + n
    }
}

impl Default for FaceIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bijective face name <-> id map of one mesh
#[derive(Debug, Clone, Default)]
pub struct FaceLabelRegistry {
    by_name: AHashMap<String, u32>,
    by_id: AHashMap<u32, String>,
}

impl FaceLabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, minting a fresh one from `engine` on first use
    pub fn resolve(&mut self, name: &str, engine: &dyn BooleanEngine) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = engine.reserve_ids(1).start;
        self.bind(name.to_string(), id);
        id
    }

    /// Register `id` under `name`.
    ///
    /// Returns the id triangles carrying `id` must use: if `name` is already
    /// bound to another id, that id wins so the maps stay bijective.
    pub fn insert(&mut self, id: u32, name: &str) -> u32 {
        if let Some(existing) = self.by_id.get(&id) {
            if existing == name {
                return id;
            }
        }
        if let Some(&canonical) = self.by_name.get(name) {
            return canonical;
        }
        self.bind(name.to_string(), id);
        id
    }

    /// Union `other` into `self`, returning ids of `other` that were rebound.
    pub fn merge(&mut self, other: &FaceLabelRegistry) -> AHashMap<u32, u32> {
        let mut remap = AHashMap::new();
        let mut entries: Vec<_> = other.by_id.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        for (&id, name) in entries {
            let canonical = self.insert(id, name);
            if canonical != id {
                remap.insert(id, canonical);
            }
        }
        remap
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn contains_id(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Names sorted by id, i.e. in creation order
    pub fn names(&self) -> Vec<String> {
        let mut entries: Vec<_> = self.by_id.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        entries.into_iter().map(|(_, name)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn bind(&mut self, name: String, id: u32) {
        self.by_id.insert(id, name.clone());
        self.by_name.insert(name, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::CsgEngine;
    use std::sync::Arc;

    fn engine() -> CsgEngine {
        CsgEngine::new(Arc::new(FaceIdAllocator::new()), EngineConfig::default())
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let ids = FaceIdAllocator::new();
        assert_eq!(ids.reserve(3), 1..4);
        assert_eq!(ids.reserve(1), 4..5);
        assert_eq!(ids.reserve(0), 5..5);
    }

    #[test]
    fn test_resolve_reuses_ids() {
        let engine = engine();
        let mut labels = FaceLabelRegistry::new();
        let top = labels.resolve("top", &engine);
        let side = labels.resolve("side", &engine);
        assert_ne!(top, side);
        assert_eq!(labels.resolve("top", &engine), top);
        assert_eq!(labels.name(side), Some("side"));
        assert_eq!(labels.names(), vec!["top".to_string(), "side".to_string()]);
    }

    #[test]
    fn test_merge_keeps_bijection() {
        let engine = engine();
        let mut a = FaceLabelRegistry::new();
        let mut b = FaceLabelRegistry::new();
        let x = a.resolve("X", &engine);
        let y = b.resolve("Y", &engine);
        let x_in_b = b.resolve("X", &engine);

        let remap = a.merge(&b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.id("Y"), Some(y));
        assert_eq!(remap.get(&x_in_b), Some(&x));
        assert!(!a.contains_id(x_in_b));
    }
}
