//! Poll bundle: what each presentation consumer reads once per second.

use serde::{Deserialize, Serialize};

use crate::metrics::sample::MetricSample;
use crate::simulator::stress::{PayloadStats, PerformanceSnapshot};
use crate::simulator::{CounterSnapshot, Simulator};

/// Point-in-time status of one simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Base tick requested.
    pub running: bool,
    /// Stress mode active.
    pub stressed: bool,
    /// Base tick worker still alive; false after a worker panic.
    pub base_tick_alive: bool,
    /// Stress tick worker still alive; false after a worker panic.
    pub stress_tick_alive: bool,
    /// Whole seconds in stress mode, 0 when idle.
    pub elapsed_stress_seconds: u64,
    /// Samples in the window.
    pub history_len: usize,
    /// Window capacity.
    pub capacity: usize,
    /// Newest sample.
    pub latest: Option<MetricSample>,
    /// Synthetic self-reported performance.
    pub performance: PerformanceSnapshot,
    /// Stress payload counts.
    pub payload: PayloadStats,
    /// Cumulative counters.
    pub counters: CounterSnapshot,
}

impl StatusReport {
    /// Read every field from `simulator`.
    #[must_use]
    pub fn collect(simulator: &Simulator) -> Self {
        Self {
            running: simulator.is_running(),
            stressed: simulator.is_stressed(),
            base_tick_alive: simulator.base_tick_alive(),
            stress_tick_alive: simulator.stress_tick_alive(),
            elapsed_stress_seconds: simulator.elapsed_stress_seconds(),
            history_len: simulator.len(),
            capacity: simulator.capacity(),
            latest: simulator.latest(),
            performance: simulator.synthetic_performance_snapshot(),
            payload: simulator.payload_stats(),
            counters: simulator.counters(),
        }
    }

    /// Whether a requested tick worker has died.
    #[must_use]
    pub const fn has_dead_tick(&self) -> bool {
        (self.running && !self.base_tick_alive) || (self.stressed && !self.stress_tick_alive)
    }

    /// One-line human summary; `None` readings render as dashes.
    /// A dead tick worker is flagged at the end.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let (cpu, mem, rt) = self.latest.map_or_else(
            || ("-".to_string(), "-".to_string(), "-".to_string()),
            |s| {
                (
                    format!("{:5.1}%", s.cpu_usage),
                    format!("{:5.1}%", s.memory_usage),
                    format!("{:6.1}ms", s.response_time),
                )
            },
        );
        let stress = if self.stressed {
            format!("STRESS {}s", self.elapsed_stress_seconds)
        } else {
            "idle".to_string()
        };
        let mut line = format!(
            "cpu {cpu} mem {mem} rt {rt} | window {}/{} | {stress} | self cpu {:.0}% mem {:.0}% rt {:.0}ms",
            self.history_len,
            self.capacity,
            self.performance.cpu_usage_percent,
            self.performance.memory_usage_percent,
            self.performance.response_time_ms,
        );
        if self.has_dead_tick() {
            line.push_str(" | TICK DOWN");
        }
        line
    }
}
