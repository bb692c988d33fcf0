// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding box utilities

use crate::utils::math::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(&point);
        self.max = self.max.max(&point);
    }

    /// Boxes touching within `tolerance` count as overlapping
    pub fn overlaps(&self, other: &BoundingBox, tolerance: f64) -> bool {
        (0..3).all(|axis| {
            self.min[axis] <= other.max[axis] + tolerance
                && other.min[axis] <= self.max[axis] + tolerance
        })
    }

    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`, all zero when empty
    pub fn to_array(&self) -> [f64; 6] {
        if self.is_empty() {
            return [0.0; 6];
        }
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }
}
