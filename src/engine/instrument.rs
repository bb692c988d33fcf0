// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine call metrics collection and reporting

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug_span;

use super::{BooleanEngine, BooleanOp, EngineMesh, Solid};
use crate::error::EngineError;

/// Performance metrics for a single engine call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetrics {
    pub name: String,
    pub duration: Duration,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub succeeded: bool,
}

impl OperationMetrics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: Duration::default(),
            vertex_count: 0,
            triangle_count: 0,
            succeeded: true,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// Aggregate over all calls of one operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationSummary {
    pub calls: usize,
    pub failures: usize,
    pub total_ms: f64,
    pub max_triangles: usize,
}

/// Shared sink for [`OperationMetrics`]
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    records: Arc<Mutex<Vec<OperationMetrics>>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, metrics: OperationMetrics) {
        self.records.lock().push(metrics);
    }

    pub fn snapshot(&self) -> Vec<OperationMetrics> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Per-operation totals, keyed by operation name
    pub fn summary(&self) -> BTreeMap<String, OperationSummary> {
        let mut out: BTreeMap<String, OperationSummary> = BTreeMap::new();
        for m in self.records.lock().iter() {
            let entry = out.entry(m.name.clone()).or_default();
            entry.calls += 1;
            entry.failures += usize::from(!m.succeeded);
            entry.total_ms += m.duration_ms();
            entry.max_triangles = entry.max_triangles.max(m.triangle_count);
        }
        out
    }

    /// Export summary as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.summary()).unwrap_or_default()
    }
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Wraps an engine and records every call into a [`MetricsRecorder`]
pub struct Instrumented<E> {
    inner: E,
    recorder: MetricsRecorder,
}

impl<E: BooleanEngine> Instrumented<E> {
    pub fn new(inner: E, recorder: MetricsRecorder) -> Self {
        Self { inner, recorder }
    }

    pub fn recorder(&self) -> &MetricsRecorder {
        &self.recorder
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    fn measure(
        &self,
        name: &str,
        call: impl FnOnce(&E) -> Result<Solid, EngineError>,
    ) -> Result<Solid, EngineError> {
        let _span = debug_span!("engine", op = name, engine = self.inner.name()).entered();
        let timer = Timer::start();
        let result = call(&self.inner);
        let mut metrics = OperationMetrics::new(name);
        metrics.duration = timer.elapsed();
        match &result {
            Ok(solid) => {
                metrics.vertex_count = solid.vertex_count();
                metrics.triangle_count = solid.triangle_count();
            }
            Err(_) => metrics.succeeded = false,
        }
        self.recorder.record(metrics);
        result
    }
}

impl<E: BooleanEngine> BooleanEngine for Instrumented<E> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn construct(&self, mesh: &EngineMesh) -> Result<Solid, EngineError> {
        self.measure("construct", |e| e.construct(mesh))
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanOp) -> Result<Solid, EngineError> {
        let name = op.to_string();
        self.measure(&name, |e| e.boolean(a, b, op))
    }

    fn simplify(&self, solid: &Solid, tolerance: Option<f64>) -> Result<Solid, EngineError> {
        self.measure("simplify", |e| e.simplify(solid, tolerance))
    }

    fn set_tolerance(&self, solid: &Solid, tolerance: f64) -> Result<Solid, EngineError> {
        self.measure("set_tolerance", |e| e.set_tolerance(solid, tolerance))
    }

    fn extract(&self, solid: &Solid) -> Result<EngineMesh, EngineError> {
        let _span = debug_span!("engine", op = "extract", engine = self.inner.name()).entered();
        let timer = Timer::start();
        let result = self.inner.extract(solid);
        let mut metrics = OperationMetrics::new("extract");
        metrics.duration = timer.elapsed();
        match &result {
            Ok(mesh) => {
                metrics.vertex_count = mesh.vertex_count();
                metrics.triangle_count = mesh.triangle_count();
            }
            Err(_) => metrics.succeeded = false,
        }
        self.recorder.record(metrics);
        result
    }

    fn reserve_ids(&self, n: u32) -> Range<u32> {
        self.inner.reserve_ids(n)
    }
}
