//! The metrics simulator: owns the history window, advances it on a base tick,
//! and optionally runs a stress tick that biases samples and burns resources.
//!
//! `running` and `stressed` are independent flags; all four combinations are
//! legal. Each simulator is an explicit instance: construct one per consumer
//! or share it behind an `Arc`.
//!
//! ```rust,no_run
//! use metrics_simulator::core::config::Config;
//! use metrics_simulator::metrics::sample::MetricField;
//! use metrics_simulator::metrics::views::ViewShape;
//! use metrics_simulator::simulator::Simulator;
//!
//! let sim = Simulator::new(&Config::default()).expect("default config is valid");
//! sim.start().expect("spawn base tick");
//! let view = sim.view(ViewShape::XyPairs, MetricField::CpuUsage);
//! assert_eq!(view.len(), 60);
//! sim.stop();
//! ```

pub mod status;
pub mod stress;
pub mod ticker;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::core::config::{Config, SimulatorConfig, StressConfig};
use crate::core::errors::Result;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::metrics::generator::SampleGenerator;
use crate::metrics::history::History;
use crate::metrics::sample::{MetricField, MetricSample};
use crate::metrics::views::{self, View, ViewShape};

use self::status::StatusReport;
use self::stress::{
    PayloadStats, PerformanceSnapshot, StressPayload, burn_cpu, payload_budget_bytes,
    synthetic_performance,
};
use self::ticker::{TickHandle, spawn_ticker};

const BASE_TICK_THREAD: &str = "msim-base-tick";
const STRESS_TICK_THREAD: &str = "msim-stress-tick";

// ──────────────────── counters ────────────────────

#[derive(Debug, Default)]
struct Counters {
    samples_generated: AtomicU64,
    stress_ticks: AtomicU64,
    payload_prunes: AtomicU64,
}

/// Cumulative counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Samples appended to the history.
    pub samples_generated: u64,
    /// Stress ticks that ran a busy loop and allocated a batch.
    pub stress_ticks: u64,
    /// Stress ticks that pruned the payload.
    pub payload_prunes: u64,
}

// ──────────────────── shared state ────────────────────

/// State reachable from the tick threads.
struct Shared {
    simulator_config: SimulatorConfig,
    stress_config: StressConfig,
    generator: SampleGenerator,
    history: RwLock<History>,
    stress_since: Mutex<Option<Instant>>,
    payload: Mutex<StressPayload>,
    rng: Mutex<StdRng>,
    counters: Counters,
    logger: Option<ActivityLoggerHandle>,
}

impl Shared {
    fn is_stressed(&self) -> bool {
        self.stress_since.lock().is_some()
    }

    fn log(&self, event: ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.send(event);
        }
    }

    /// Generate a sample stamped `now` and append it under one write guard.
    fn advance_at(&self, now: DateTime<Utc>) -> MetricSample {
        let stressed = self.is_stressed();
        let sample = self.generator.generate(now, stressed, &mut *self.rng.lock());
        let mut history = self.history.write();
        history.push(sample);
        let stored = history.latest().copied().unwrap_or(sample);
        drop(history);
        self.counters
            .samples_generated
            .fetch_add(1, Ordering::Relaxed);
        stored
    }

    /// One stress tick: busy loop, then one payload batch.
    fn stress_tick(&self) {
        if !self.is_stressed() {
            return;
        }
        // Seed a local RNG so the busy loop does not hold the shared lock.
        let mut local = StdRng::seed_from_u64(rand::random());
        burn_cpu(self.stress_config.cpu_iterations, &mut local);

        let outcome = self.payload.lock().allocate_batch(
            &self.stress_config,
            Utc::now().timestamp_millis(),
            &mut local,
        );
        self.counters.stress_ticks.fetch_add(1, Ordering::Relaxed);
        if let Some(dropped) = outcome.pruned {
            self.counters.payload_prunes.fetch_add(1, Ordering::Relaxed);
            self.log(ActivityEvent::PayloadPruned {
                dropped_batches: dropped,
                retained_batches: outcome.batches,
            });
        }
    }
}

// ──────────────────── simulator ────────────────────

/// Synthetic server-metrics source with a bounded history window.
pub struct Simulator {
    shared: Arc<Shared>,
    base_tick: Mutex<Option<TickHandle>>,
    stress_tick: Mutex<Option<TickHandle>>,
}

impl Simulator {
    /// Simulator seeded with a full window of back-dated samples ending now.
    ///
    /// Rejects a config that fails [`Config::validate`].
    pub fn new(config: &Config) -> Result<Self> {
        Self::build(config, None, None)
    }

    /// Like [`Simulator::new`], logging lifecycle events through `logger`.
    pub fn with_logger(config: &Config, logger: ActivityLoggerHandle) -> Result<Self> {
        Self::build(config, None, Some(logger))
    }

    /// Simulator over a caller-supplied window instead of a generated one.
    pub fn from_history(config: &Config, history: History) -> Result<Self> {
        Self::build(config, Some(history), None)
    }

    fn build(
        config: &Config,
        history: Option<History>,
        logger: Option<ActivityLoggerHandle>,
    ) -> Result<Self> {
        config.validate()?;
        let mut rng = config.simulator.seed.map_or_else(
            || StdRng::from_rng(&mut rand::rng()),
            StdRng::seed_from_u64,
        );
        let generator = SampleGenerator::from_config(&config.stress);
        let history = history.unwrap_or_else(|| {
            History::seeded(
                config.simulator.capacity,
                Utc::now(),
                config.simulator.tick_interval(),
                &generator,
                false,
                &mut rng,
            )
        });

        Ok(Self {
            shared: Arc::new(Shared {
                simulator_config: config.simulator.clone(),
                stress_config: config.stress.clone(),
                generator,
                history: RwLock::new(history),
                stress_since: Mutex::new(None),
                payload: Mutex::new(StressPayload::new()),
                rng: Mutex::new(rng),
                counters: Counters::default(),
                logger,
            }),
            base_tick: Mutex::new(None),
            stress_tick: Mutex::new(None),
        })
    }

    // ──────── commands ────────

    /// Begin the base tick. No-op when already running; returns whether a tick
    /// was started by this call.
    pub fn start(&self) -> Result<bool> {
        let mut slot = self.base_tick.lock();
        if slot.is_some() {
            return Ok(false);
        }
        let shared = Arc::clone(&self.shared);
        let period = self.shared.simulator_config.tick_interval();
        *slot = Some(spawn_ticker(BASE_TICK_THREAD, period, move || {
            shared.advance_at(Utc::now());
        })?);
        drop(slot);

        self.shared.log(ActivityEvent::SimulatorStarted {
            capacity: self.shared.simulator_config.capacity,
            tick_interval_ms: self.shared.simulator_config.tick_interval_ms,
        });
        Ok(true)
    }

    /// Cancel the base tick. History is left untouched. Returns whether a tick
    /// was running. No append happens after this returns.
    pub fn stop(&self) -> bool {
        let mut slot = self.base_tick.lock();
        let Some(handle) = slot.take() else {
            return false;
        };
        handle.cancel();
        drop(slot);

        self.shared.log(ActivityEvent::SimulatorStopped {
            samples_generated: self.counters().samples_generated,
        });
        true
    }

    /// Enter stress mode and start the stress tick. No-op when already stressed.
    pub fn enter_stress_mode(&self) -> Result<bool> {
        let mut slot = self.stress_tick.lock();
        if slot.is_some() {
            return Ok(false);
        }
        // Register the worker before raising the flag so a reader that sees
        // the flag also sees the worker.
        let shared = Arc::clone(&self.shared);
        let period = self.shared.stress_config.tick_interval();
        *slot = Some(spawn_ticker(STRESS_TICK_THREAD, period, move || {
            shared.stress_tick();
        })?);
        *self.shared.stress_since.lock() = Some(Instant::now());
        drop(slot);

        self.shared.log(ActivityEvent::StressEntered {
            tick_interval_ms: self.shared.stress_config.tick_interval_ms,
        });
        Ok(true)
    }

    /// Leave stress mode: clear the flag, cancel the stress tick, release the
    /// payload. Returns whether stress mode was active.
    pub fn exit_stress_mode(&self) -> bool {
        let mut slot = self.stress_tick.lock();
        if slot.is_none() {
            return false;
        }
        let elapsed_secs = self
            .shared
            .stress_since
            .lock()
            .take()
            .map_or(0, |since| since.elapsed().as_secs());
        if let Some(handle) = slot.take() {
            handle.cancel();
        }

        let mut payload = self.shared.payload.lock();
        let released = payload.batch_count();
        payload.clear();
        drop(payload);
        drop(slot);

        self.shared.log(ActivityEvent::StressExited {
            elapsed_secs,
            released_batches: released,
        });
        true
    }

    /// Generate and append one sample stamped with the current time.
    pub fn advance(&self) -> MetricSample {
        self.shared.advance_at(Utc::now())
    }

    /// Generate and append one sample stamped `now`.
    pub fn advance_at(&self, now: DateTime<Utc>) -> MetricSample {
        self.shared.advance_at(now)
    }

    // ──────── queries ────────

    /// Generate a sample for `now` without touching the history.
    pub fn generate_sample(&self, now: DateTime<Utc>) -> MetricSample {
        let stressed = self.is_stressed();
        self.shared
            .generator
            .generate(now, stressed, &mut *self.shared.rng.lock())
    }

    /// Whether `start` has been called without a matching `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.base_tick.lock().is_some()
    }

    /// Whether stress mode is active.
    #[must_use]
    pub fn is_stressed(&self) -> bool {
        self.shared.is_stressed()
    }

    /// Whether the base tick worker is still alive. False when not running.
    #[must_use]
    pub fn base_tick_alive(&self) -> bool {
        self.base_tick.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether the stress tick worker is still alive. False when not stressed.
    #[must_use]
    pub fn stress_tick_alive(&self) -> bool {
        self.stress_tick.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whole seconds since stress mode was entered, 0 when inactive.
    #[must_use]
    pub fn elapsed_stress_seconds(&self) -> u64 {
        self.shared
            .stress_since
            .lock()
            .map_or(0, |since| since.elapsed().as_secs())
    }

    /// Current stress payload counts.
    #[must_use]
    pub fn payload_stats(&self) -> PayloadStats {
        self.shared.payload.lock().stats()
    }

    /// Approximate performance self-report; see [`synthetic_performance`].
    pub fn synthetic_performance_snapshot(&self) -> PerformanceSnapshot {
        let stressed = self.is_stressed();
        let payload = self.payload_stats();
        let budget = payload_budget_bytes(&self.shared.stress_config);
        synthetic_performance(stressed, payload, budget, &mut *self.shared.rng.lock())
    }

    /// Newest sample, `None` for an empty window.
    #[must_use]
    pub fn latest(&self) -> Option<MetricSample> {
        self.shared.history.read().latest().copied()
    }

    /// Owned copy of the whole window, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.shared.history.read().to_vec()
    }

    /// Samples in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.history.read().len()
    }

    /// Whether the window holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.history.read().is_empty()
    }

    /// Maximum samples the window retains.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.history.read().capacity()
    }

    /// Project the current window for one field into `shape`.
    #[must_use]
    pub fn view(&self, shape: ViewShape, field: MetricField) -> View {
        views::render(shape, &self.snapshot(), field)
    }

    /// [`Simulator::view`] for callers holding names; unknown names are rejected.
    pub fn view_by_name(&self, shape: &str, field: &str) -> Result<View> {
        views::render_by_name(shape, &self.snapshot(), field)
    }

    /// Cumulative counters since construction.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        let c = &self.shared.counters;
        CounterSnapshot {
            samples_generated: c.samples_generated.load(Ordering::Relaxed),
            stress_ticks: c.stress_ticks.load(Ordering::Relaxed),
            payload_prunes: c.payload_prunes.load(Ordering::Relaxed),
        }
    }

    /// Everything a once-per-second poller reads, in one call.
    pub fn status(&self) -> StatusReport {
        StatusReport::collect(self)
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.exit_stress_mode();
        self.stop();
    }
}
