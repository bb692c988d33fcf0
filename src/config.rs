// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel configuration system

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{KernelError, KernelResult};

/// Default config file looked up by [`KernelConfig::load`]
pub const CONFIG_FILE: &str = "facemesh.toml";

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Idle window after which cached engine handles are released.
    /// `None` disables auto-release.
    pub idle_release_ms: Option<u64>,
    /// Repair toolkit parameters
    pub repair: RepairConfig,
    /// Boolean engine parameters
    pub engine: EngineConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            idle_release_ms: Some(30_000),
            repair: RepairConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Repair toolkit parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Largest component `remove_small_islands` considers an island
    pub island_max_triangles: usize,
    /// Area below which a seam triangle is a flip candidate
    pub tiny_area_threshold: f64,
    pub tiny_max_iterations: usize,
    pub split_max_iterations: usize,
    /// Intersection segments shorter than this are ignored
    pub split_min_segment: f64,
    /// Barycentric slack when snapping segment endpoints to edges/vertices
    pub barycentric_tolerance: f64,
    /// Magnitude of the random probe offset used by the raycast vote
    pub raycast_jitter: f64,
    pub raycast_seed: u64,
    /// Probe offset as a fraction of sqrt(triangle area)
    pub winding_offset_scale: f64,
    pub winding_crossing_tolerance: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            island_max_triangles: 64,
            tiny_area_threshold: 1e-6,
            tiny_max_iterations: 10,
            split_max_iterations: 8,
            split_min_segment: 1e-9,
            barycentric_tolerance: 1e-9,
            raycast_jitter: 1e-6,
            raycast_seed: 0x5eed,
            winding_offset_scale: 1e-3,
            winding_crossing_tolerance: 0.1,
        }
    }
}

/// Boolean engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vertices closer than this are merged on construction
    pub merge_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            merge_tolerance: 1e-9,
        }
    }
}

impl KernelConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: KernelConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };

        if let Ok(ms) = std::env::var("FACEMESH_IDLE_RELEASE_MS") {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("FACEMESH_IDLE_RELEASE_MS is not an integer: {ms:?}"))?;
            config.idle_release_ms = (ms > 0).then_some(ms);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn idle_release(&self) -> Option<Duration> {
        self.idle_release_ms.map(Duration::from_millis)
    }

    /// Reject values no operation can work with
    pub fn validate(&self) -> KernelResult<()> {
        let positive = [
            ("repair.tiny_area_threshold", self.repair.tiny_area_threshold),
            ("repair.winding_offset_scale", self.repair.winding_offset_scale),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(KernelError::Config {
                    reason: format!("{key} must be positive, got {value}"),
                });
            }
        }

        let non_negative = [
            ("repair.split_min_segment", self.repair.split_min_segment),
            ("repair.barycentric_tolerance", self.repair.barycentric_tolerance),
            ("repair.raycast_jitter", self.repair.raycast_jitter),
            ("repair.winding_crossing_tolerance", self.repair.winding_crossing_tolerance),
            ("engine.merge_tolerance", self.engine.merge_tolerance),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(KernelError::Config {
                    reason: format!("{key} must be non-negative, got {value}"),
                });
            }
        }

        if self.idle_release_ms == Some(0) {
            return Err(KernelError::Config {
                reason: "idle_release_ms must be omitted rather than 0".into(),
            });
        }
        Ok(())
    }
}
