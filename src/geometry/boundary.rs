// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boundary polylines between differently labelled faces

use ahash::AHashSet;
use std::collections::BTreeMap;

use super::topology::{EdgeKey, EdgeMap};
use super::MeshBuffer;
use crate::engine::EngineMesh;
use crate::error::KernelResult;

/// Chain of seam edges separating two faces
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolyline {
    /// Ordered vertex positions; a closed loop does not repeat its start
    pub points: Vec<[f64; 3]>,
    /// Names of the two faces, in lexicographic order
    pub faces: (String, String),
    pub closed: bool,
}

impl MeshBuffer {
    /// Seams between faces, as polylines over the validated mesh.
    ///
    /// Every edge shared by exactly two triangles with different labels is
    /// grouped by its (unordered) pair of face names. Within a group, open
    /// chains are walked first from their end vertices, then the remaining
    /// edges are walked as closed loops.
    pub fn get_boundary_edge_polylines(&mut self) -> KernelResult<Vec<BoundaryPolyline>> {
        let mesh = self.validated_mesh()?;
        Ok(self.seam_polylines(&mesh))
    }

    fn seam_polylines(&self, mesh: &EngineMesh) -> Vec<BoundaryPolyline> {
        let indices: Vec<u32> = mesh.triangles.iter().flatten().copied().collect();
        let edges = EdgeMap::build(&indices);

        let mut groups: BTreeMap<(String, String), Vec<EdgeKey>> = BTreeMap::new();
        for (key, u0, u1) in edges.manifold_pairs() {
            let (f0, f1) = (mesh.face_ids[u0.triangle], mesh.face_ids[u1.triangle]);
            if f0 == f1 {
                continue;
            }
            let (n0, n1) = (self.label_or_id(f0), self.label_or_id(f1));
            if n0 == n1 {
                continue;
            }
            let pair = if n0 < n1 { (n0, n1) } else { (n1, n0) };
            groups.entry(pair).or_default().push(key);
        }

        let mut out = Vec::new();
        for (faces, keys) in groups {
            for (chain, closed) in walk_chains(&keys) {
                out.push(BoundaryPolyline {
                    points: chain.iter().map(|&v| mesh.positions[v as usize]).collect(),
                    faces: faces.clone(),
                    closed,
                });
            }
        }
        out
    }

    fn label_or_id(&self, id: u32) -> String {
        match self.labels.name(id) {
            Some(name) => name.to_string(),
            None => format!("face_{id}"),
        }
    }
}

/// Split an edge set into maximal chains: open chains from vertices whose
/// degree is not two, then closed loops
fn walk_chains(keys: &[EdgeKey]) -> Vec<(Vec<u32>, bool)> {
    let mut adjacency: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for key in keys {
        adjacency.entry(key.a).or_default().push(key.b);
        adjacency.entry(key.b).or_default().push(key.a);
    }
    for neighbors in adjacency.values_mut() {
        neighbors.sort_unstable();
    }

    let mut used: AHashSet<EdgeKey> = AHashSet::with_capacity(keys.len());
    let mut chains = Vec::new();

    let ends: Vec<u32> = adjacency
        .iter()
        .filter(|(_, n)| n.len() != 2)
        .map(|(v, _)| *v)
        .collect();
    for start in ends {
        while let Some(chain) = walk(start, &adjacency, &mut used) {
            chains.push((chain, false));
        }
    }

    let starts: Vec<u32> = adjacency.keys().copied().collect();
    for start in starts {
        while let Some(chain) = walk(start, &adjacency, &mut used) {
            let closed = chain.len() > 2 && chain.first() == chain.last();
            let mut chain = chain;
            if closed {
                chain.pop();
            }
            chains.push((chain, closed));
        }
    }
    chains
}

/// Follow unused edges from `start` until stuck. `None` when `start` has no
/// unused edge.
fn walk(start: u32, adjacency: &BTreeMap<u32, Vec<u32>>, used: &mut AHashSet<EdgeKey>) -> Option<Vec<u32>> {
    let next_from = |v: u32, used: &AHashSet<EdgeKey>| {
        adjacency
            .get(&v)?
            .iter()
            .copied()
            .find(|&n| !used.contains(&EdgeKey::new(v, n)))
    };

    let mut current = start;
    let mut chain = vec![start];
    let first = next_from(current, used)?;
    used.insert(EdgeKey::new(current, first));
    chain.push(first);
    current = first;

    while let Some(next) = next_from(current, used) {
        used.insert(EdgeKey::new(current, next));
        chain.push(next);
        current = next;
        if current == start {
            break;
        }
    }
    Some(chain)
}
