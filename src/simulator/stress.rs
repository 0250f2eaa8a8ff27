//! Synthetic stress load: a trigonometric busy loop plus a bounded, pruned
//! payload of throwaway allocations, and the approximate self-reported
//! performance reading derived from it.
//!
//! Nothing here measures the host. The load exists so a polling UI has
//! something to stutter on.

#![allow(clippy::cast_precision_loss)]

use std::hint::black_box;
use std::mem::size_of;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::StressConfig;

// ──────────────────── cpu ────────────────────

/// Run `iterations` rounds of `sqrt(r) * sin(i) * cos(i)` and return the sum.
pub fn burn_cpu<R: Rng>(iterations: u64, rng: &mut R) -> f64 {
    let mut acc = 0.0_f64;
    for i in 0..iterations {
        let x = i as f64;
        let r: f64 = rng.random::<f64>() * 800_000.0;
        acc += r.sqrt() * x.sin() * x.cos();
    }
    black_box(acc)
}

// ──────────────────── memory ────────────────────

/// One throwaway payload object.
#[derive(Debug, Clone)]
pub struct StressObject {
    /// Random identifier.
    pub id: f64,
    /// `object_width` copies of one random fill value.
    pub data: Vec<f64>,
    /// Allocation time, epoch milliseconds.
    pub timestamp_ms: i64,
    /// Random filler scalar.
    pub stress: f64,
}

/// Result of one [`StressPayload::allocate_batch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Batches held after this call.
    pub batches: usize,
    /// Batches dropped by a prune, if one happened.
    pub pruned: Option<usize>,
}

/// Growing-then-pruned list of allocation batches.
#[derive(Debug, Default)]
pub struct StressPayload {
    batches: Vec<Vec<StressObject>>,
    objects: usize,
    object_width: usize,
}

impl StressPayload {
    /// Empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate one batch; prune to `retain_batches` once above `prune_threshold`.
    ///
    /// A retain bound above the threshold is treated as the threshold.
    pub fn allocate_batch<R: Rng>(
        &mut self,
        config: &StressConfig,
        now_ms: i64,
        rng: &mut R,
    ) -> BatchOutcome {
        let fill: f64 = rng.random();
        let batch: Vec<StressObject> = (0..config.batch_objects)
            .map(|_| StressObject {
                id: rng.random(),
                data: vec![fill; config.object_width],
                timestamp_ms: now_ms,
                stress: rng.random::<f64>() * 800_000.0,
            })
            .collect();
        self.objects += batch.len();
        self.object_width = config.object_width;
        self.batches.push(batch);

        let mut pruned = None;
        if self.batches.len() > config.prune_threshold {
            let keep = config.retain_batches.min(config.prune_threshold);
            let drop_count = self.batches.len().saturating_sub(keep);
            let removed: usize = self.batches.drain(..drop_count).map(|b| b.len()).sum();
            self.objects -= removed;
            pruned = Some(drop_count);
        }

        BatchOutcome {
            batches: self.batches.len(),
            pruned,
        }
    }

    /// Release every batch.
    pub fn clear(&mut self) {
        self.batches = Vec::new();
        self.objects = 0;
    }

    /// Batches currently held.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Objects across all held batches.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects
    }

    /// Rough heap footprint of the payload.
    #[must_use]
    pub fn approx_bytes(&self) -> u64 {
        let per_object = size_of::<StressObject>() + self.object_width * size_of::<f64>();
        (self.objects * per_object) as u64
    }

    /// Copy of the current counts.
    #[must_use]
    pub fn stats(&self) -> PayloadStats {
        PayloadStats {
            batches: self.batch_count(),
            objects: self.object_count(),
            approx_bytes: self.approx_bytes(),
        }
    }
}

/// Copyable summary of the payload, safe to hand out of a lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadStats {
    /// Batches held.
    pub batches: usize,
    /// Objects held.
    pub objects: usize,
    /// See [`StressPayload::approx_bytes`].
    pub approx_bytes: u64,
}

/// Upper bound of payload bytes: one full prune threshold of batches.
#[must_use]
pub fn payload_budget_bytes(config: &StressConfig) -> u64 {
    let per_object = size_of::<StressObject>() + config.object_width * size_of::<f64>();
    (config.prune_threshold * config.batch_objects * per_object) as u64
}

// ──────────────────── performance snapshot ────────────────────

/// Approximate self-reported performance reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    /// Memory pressure, 0..=100.
    pub memory_usage_percent: f64,
    /// CPU load, 0..=95.
    pub cpu_usage_percent: f64,
    /// Response latency in milliseconds.
    pub response_time_ms: f64,
    /// Whether stress mode was active when the reading was taken.
    pub is_stressed: bool,
}

/// Idle CPU readings stay below this.
pub const IDLE_CPU_MAX: f64 = 20.0;
/// Idle memory readings stay below this.
pub const IDLE_MEMORY_MAX: f64 = 10.0;
/// Lower bound of idle response times.
pub const IDLE_RESPONSE_MIN: f64 = 50.0;
/// Upper bound of idle response times.
pub const IDLE_RESPONSE_MAX: f64 = 150.0;

/// Derive a reading from the stress flag and payload size.
///
/// Stressed values grow with the payload; idle values are small random baselines.
pub fn synthetic_performance<R: Rng>(
    stressed: bool,
    payload: PayloadStats,
    budget_bytes: u64,
    rng: &mut R,
) -> PerformanceSnapshot {
    if !stressed {
        return PerformanceSnapshot {
            memory_usage_percent: rng.random::<f64>() * IDLE_MEMORY_MAX,
            cpu_usage_percent: rng.random::<f64>() * IDLE_CPU_MAX,
            response_time_ms: rng.random::<f64>() * (IDLE_RESPONSE_MAX - IDLE_RESPONSE_MIN)
                + IDLE_RESPONSE_MIN,
            is_stressed: false,
        };
    }

    let batches = payload.batches as f64;
    let fill = if budget_bytes == 0 {
        0.0
    } else {
        (payload.approx_bytes as f64 / budget_bytes as f64).min(1.0)
    };

    PerformanceSnapshot {
        memory_usage_percent: (10.0 + 85.0 * fill + rng.random::<f64>() * 5.0).min(100.0),
        cpu_usage_percent: (30.0 + rng.random::<f64>() * 50.0 + batches * 2.0).min(95.0),
        response_time_ms: rng.random::<f64>() * 500.0 + 200.0 + batches * 10.0,
        is_stressed: true,
    }
}
