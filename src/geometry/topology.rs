// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Edge connectivity utilities

use ahash::AHashMap;

/// Undirected edge, smaller vertex index first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub a: u32,
    pub b: u32,
}

impl EdgeKey {
    pub fn new(v0: u32, v1: u32) -> Self {
        if v0 < v1 {
            Self { a: v0, b: v1 }
        } else {
            Self { a: v1, b: v0 }
        }
    }
}

/// One triangle's use of an undirected edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeUse {
    pub triangle: usize,
    /// Position of the edge in the triangle: edge k runs corner k -> k+1
    pub corner: usize,
    /// True when the triangle traverses the edge from `a` to `b`
    pub forward: bool,
}

/// Undirected edge -> every triangle using it
#[derive(Debug, Default)]
pub struct EdgeMap {
    edges: AHashMap<EdgeKey, Vec<EdgeUse>>,
}

impl EdgeMap {
    /// Build from a flat index array (three indices per triangle)
    pub fn build(indices: &[u32]) -> Self {
        let mut edges: AHashMap<EdgeKey, Vec<EdgeUse>> =
            AHashMap::with_capacity(indices.len() * 3 / 2);
        for (triangle, tri) in indices.chunks_exact(3).enumerate() {
            for corner in 0..3 {
                let (v0, v1) = (tri[corner], tri[(corner + 1) % 3]);
                edges.entry(EdgeKey::new(v0, v1)).or_default().push(EdgeUse {
                    triangle,
                    corner,
                    forward: v0 < v1,
                });
            }
        }
        Self { edges }
    }

    pub fn uses(&self, key: &EdgeKey) -> &[EdgeUse] {
        self.edges.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &[EdgeUse])> {
        self.edges.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Edges used by exactly two triangles, sorted for deterministic sweeps
    pub fn manifold_pairs(&self) -> Vec<(EdgeKey, EdgeUse, EdgeUse)> {
        let mut pairs: Vec<_> = self
            .edges
            .iter()
            .filter_map(|(key, uses)| match uses.as_slice() {
                [u0, u1] => Some((*key, *u0, *u1)),
                _ => None,
            })
            .collect();
        pairs.sort_by_key(|(key, _, _)| *key);
        pairs
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Connected components of triangles joined across edges with exactly two uses.
///
/// Returns one list of triangle indices per component, largest first.
pub fn manifold_components(indices: &[u32]) -> Vec<Vec<usize>> {
    let triangle_count = indices.len() / 3;
    let edges = EdgeMap::build(indices);
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); triangle_count];
    for (_, u0, u1) in edges.manifold_pairs() {
        adjacency[u0.triangle].push(u1.triangle);
        adjacency[u1.triangle].push(u0.triangle);
    }

    let mut component_of = vec![usize::MAX; triangle_count];
    let mut components: Vec<Vec<usize>> = Vec::new();
    for seed in 0..triangle_count {
        if component_of[seed] != usize::MAX {
            continue;
        }
        let id = components.len();
        let mut members = vec![seed];
        component_of[seed] = id;
        let mut stack = vec![seed];
        while let Some(t) = stack.pop() {
            for &n in &adjacency[t] {
                if component_of[n] == usize::MAX {
                    component_of[n] = id;
                    members.push(n);
                    stack.push(n);
                }
            }
        }
        members.sort_unstable();
        components.push(members);
    }

    // Stable: ties keep discovery order
    components.sort_by(|a, b| b.len().cmp(&a.len()));
    components
}
