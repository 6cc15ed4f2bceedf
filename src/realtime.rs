//! Memory-bounded realtime sample store.
//!
//! One FIFO ring per active parameter, all sharing a single memory budget.
//! The per-parameter cap is derived from the budget and the number of active
//! parameters:
//!
//! ```text
//! max_points_per_param = max(1, budget_bytes / (POINT_SIZE_BYTES * active_parameters))
//! ```
//!
//! and eviction happens inline with every append, so memory stays bounded at
//! every observable instant.

use crate::error::{EngineError, Result};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Size of a single stored point in bytes.
pub const POINT_SIZE_BYTES: usize = 12;

const BYTES_PER_MB: usize = 1024 * 1024;

/// A realtime sample: milliseconds since the session epoch and a value.
///
/// Packed to 12 bytes; `f32` instead of `f64` halves the value cost so more
/// history fits into the same budget.
#[repr(C, packed(4))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RealtimePoint {
    timestamp: i64, // 8 bytes
    value: f32,     // 4 bytes
}

impl RealtimePoint {
    pub fn new(timestamp: i64, value: f32) -> Self {
        Self { timestamp, value }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

/// FIFO ring holding the points of one parameter, oldest first.
#[derive(Debug, Default)]
struct ParameterRing {
    points: VecDeque<RealtimePoint>,
}

impl ParameterRing {
    fn last_timestamp(&self) -> Option<i64> {
        self.points.back().map(RealtimePoint::timestamp)
    }

    /// Drops oldest points until at most `cap` remain. Returns how many were
    /// evicted.
    fn trim_to(&mut self, cap: usize) -> usize {
        let excess = self.points.len().saturating_sub(cap);
        self.points.drain(..excess);
        if self.points.capacity() > cap.saturating_mul(2).max(64) {
            self.points.shrink_to(cap);
        }
        excess
    }

    fn history(&self) -> Vec<RealtimePoint> {
        self.points.iter().copied().collect()
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

/// Statistics about the realtime buffer, for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BufferStats {
    pub memory_budget_mb: usize,
    pub point_size_bytes: usize,
    pub max_points_per_param: usize,
    pub active_parameters: usize,
    pub total_points: usize,
    pub used_bytes: usize,
    pub fill_percent: f64,
}

/// Per-parameter bounded store shared by a realtime session.
///
/// All methods take `&self`; ingestion may run on another thread than the
/// readers. Readers only ever get copies via [`RealtimeBuffer::snapshot`].
pub struct RealtimeBuffer {
    buffers: DashMap<String, ParameterRing>,
    memory_budget_mb: AtomicUsize,
    max_points_per_param: AtomicUsize,
}

impl RealtimeBuffer {
    /// Creates a buffer for `parameters` under a budget of `memory_budget_mb`.
    pub fn new<S: AsRef<str>>(memory_budget_mb: usize, parameters: &[S]) -> Result<Self> {
        check_budget(memory_budget_mb)?;
        let buffers = DashMap::new();
        for name in parameters {
            buffers.insert(name.as_ref().to_string(), ParameterRing::default());
        }
        let cap = max_points_for_budget(memory_budget_mb, buffers.len());
        info!(
            "Realtime buffer: {} MB budget, {} parameters, {} points per parameter",
            memory_budget_mb,
            buffers.len(),
            cap
        );
        Ok(Self {
            buffers,
            memory_budget_mb: AtomicUsize::new(memory_budget_mb),
            max_points_per_param: AtomicUsize::new(cap),
        })
    }

    /// Appends a point to `parameter`.
    ///
    /// Rejects timestamps older than the parameter's last point with
    /// [`EngineError::Order`]; equal timestamps are accepted. Evicts the
    /// oldest points once the parameter exceeds its cap.
    pub fn append(&self, parameter: &str, timestamp: i64, value: f32) -> Result<()> {
        let mut ring = self
            .buffers
            .get_mut(parameter)
            .ok_or_else(|| EngineError::invalid(format!("parameter '{parameter}' is not active")))?;

        if let Some(last) = ring.last_timestamp() {
            if timestamp < last {
                return Err(EngineError::Order {
                    parameter: parameter.to_string(),
                    timestamp,
                    last,
                });
            }
        }

        ring.points.push_back(RealtimePoint::new(timestamp, value));
        // Loaded under the entry lock so a concurrent budget change either
        // sees this point or is seen by it.
        let cap = self.max_points_per_param.load(Ordering::Acquire);
        ring.trim_to(cap);
        Ok(())
    }

    /// Sets a new memory budget and evicts every parameter over the new cap.
    pub fn set_memory_budget(&self, memory_budget_mb: usize) -> Result<()> {
        check_budget(memory_budget_mb)?;
        self.memory_budget_mb
            .store(memory_budget_mb, Ordering::Release);
        self.recompute_cap();
        Ok(())
    }

    /// Replaces the set of active parameters.
    ///
    /// Parameters that stay active keep their points; dropped parameters lose
    /// theirs. The cap is recomputed for the new count.
    pub fn set_active_parameters<S: AsRef<str>>(&self, parameters: &[S]) {
        self.buffers
            .retain(|name, _| parameters.iter().any(|p| p.as_ref() == name));
        for name in parameters {
            self.buffers
                .entry(name.as_ref().to_string())
                .or_default();
        }
        self.recompute_cap();
    }

    /// Discards all points; the active set stays.
    pub fn clear(&self) {
        for mut ring in self.buffers.iter_mut() {
            ring.points.clear();
            ring.points.shrink_to_fit();
        }
        debug!("Realtime buffer cleared");
    }

    /// Point-in-time copy of one parameter's points, oldest first.
    pub fn snapshot(&self, parameter: &str) -> Option<Vec<RealtimePoint>> {
        self.buffers.get(parameter).map(|ring| ring.history())
    }

    /// First and last stored timestamp across all parameters.
    pub fn time_range(&self) -> Option<(i64, i64)> {
        self.buffers
            .iter()
            .filter_map(|ring| {
                let first = ring.points.front()?.timestamp();
                let last = ring.points.back()?.timestamp();
                Some((first, last))
            })
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
    }

    pub fn point_count(&self, parameter: &str) -> usize {
        self.buffers.get(parameter).map_or(0, |ring| ring.len())
    }

    pub fn total_points(&self) -> usize {
        self.buffers.iter().map(|ring| ring.len()).sum()
    }

    /// Bytes currently held: the sum of point counts times the point size.
    pub fn memory_usage_bytes(&self) -> usize {
        self.total_points() * POINT_SIZE_BYTES
    }

    pub fn max_points_per_param(&self) -> usize {
        self.max_points_per_param.load(Ordering::Acquire)
    }

    pub fn memory_budget_mb(&self) -> usize {
        self.memory_budget_mb.load(Ordering::Acquire)
    }

    /// Active parameter names, sorted.
    pub fn parameters(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .buffers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn active_parameter_count(&self) -> usize {
        self.buffers.len()
    }

    /// Returns statistics about the buffer.
    pub fn stats(&self) -> BufferStats {
        let memory_budget_mb = self.memory_budget_mb();
        let total_points = self.total_points();
        let used_bytes = total_points * POINT_SIZE_BYTES;
        let budget_bytes = (memory_budget_mb * BYTES_PER_MB).max(1);

        BufferStats {
            memory_budget_mb,
            point_size_bytes: POINT_SIZE_BYTES,
            max_points_per_param: self.max_points_per_param(),
            active_parameters: self.active_parameter_count(),
            total_points,
            used_bytes,
            fill_percent: used_bytes as f64 / budget_bytes as f64 * 100.0,
        }
    }

    fn recompute_cap(&self) {
        let cap = max_points_for_budget(self.memory_budget_mb(), self.buffers.len());
        self.max_points_per_param.store(cap, Ordering::Release);

        let mut evicted = 0;
        for mut ring in self.buffers.iter_mut() {
            evicted += ring.trim_to(cap);
        }
        info!(
            "Realtime cap now {} points per parameter ({} evicted)",
            cap, evicted
        );
    }
}

/// Points per parameter that fit into `memory_budget_mb` shared by
/// `parameter_count` parameters. Never less than one.
pub fn max_points_for_budget(memory_budget_mb: usize, parameter_count: usize) -> usize {
    let budget_bytes = memory_budget_mb.saturating_mul(BYTES_PER_MB);
    let per_param = POINT_SIZE_BYTES * parameter_count.max(1);
    (budget_bytes / per_param).max(1)
}

fn check_budget(memory_budget_mb: usize) -> Result<()> {
    if memory_budget_mb == 0 {
        return Err(EngineError::invalid("memory budget must be at least 1 MB"));
    }
    Ok(())
}
