//! Metric sample model: one timestamped set of seven synthetic server readings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{MsimError, Result};

/// One point in time of the simulated server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    /// When the sample was taken (UTC).
    pub timestamp: DateTime<Utc>,
    /// CPU usage, 0..=100 %.
    pub cpu_usage: f64,
    /// Memory usage, 0..=100 %.
    pub memory_usage: f64,
    /// Disk usage, 0..=100 %.
    pub disk_usage: f64,
    /// Inbound network rate, >= 0.
    pub network_in: f64,
    /// Outbound network rate, >= 0.
    pub network_out: f64,
    /// Open connections, a whole number >= 0.
    pub active_connections: f64,
    /// Response time in milliseconds, >= 0.
    pub response_time: f64,
}

impl MetricSample {
    /// Read one field.
    #[must_use]
    pub const fn value(&self, field: MetricField) -> f64 {
        match field {
            MetricField::CpuUsage => self.cpu_usage,
            MetricField::MemoryUsage => self.memory_usage,
            MetricField::DiskUsage => self.disk_usage,
            MetricField::NetworkIn => self.network_in,
            MetricField::NetworkOut => self.network_out,
            MetricField::ActiveConnections => self.active_connections,
            MetricField::ResponseTime => self.response_time,
        }
    }

    /// Write one field, clamped to its valid range.
    pub fn set(&mut self, field: MetricField, value: f64) {
        let clamped = field.clamp(value);
        match field {
            MetricField::CpuUsage => self.cpu_usage = clamped,
            MetricField::MemoryUsage => self.memory_usage = clamped,
            MetricField::DiskUsage => self.disk_usage = clamped,
            MetricField::NetworkIn => self.network_in = clamped,
            MetricField::NetworkOut => self.network_out = clamped,
            MetricField::ActiveConnections => self.active_connections = clamped,
            MetricField::ResponseTime => self.response_time = clamped,
        }
    }

    /// A sample with every reading at zero.
    #[must_use]
    pub const fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            network_in: 0.0,
            network_out: 0.0,
            active_connections: 0.0,
            response_time: 0.0,
        }
    }

    /// Whether every reading lies inside its field's range.
    #[must_use]
    pub fn is_within_bounds(&self) -> bool {
        MetricField::ALL
            .iter()
            .all(|field| field.contains(self.value(*field)))
    }
}

/// Selectable metric reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricField {
    /// `cpu_usage`
    CpuUsage,
    /// `memory_usage`
    MemoryUsage,
    /// `disk_usage`
    DiskUsage,
    /// `network_in`
    NetworkIn,
    /// `network_out`
    NetworkOut,
    /// `active_connections`
    ActiveConnections,
    /// `response_time`
    ResponseTime,
}

impl MetricField {
    /// Every field, in display order.
    pub const ALL: [Self; 7] = [
        Self::CpuUsage,
        Self::MemoryUsage,
        Self::DiskUsage,
        Self::NetworkIn,
        Self::NetworkOut,
        Self::ActiveConnections,
        Self::ResponseTime,
    ];

    /// Canonical snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu_usage",
            Self::MemoryUsage => "memory_usage",
            Self::DiskUsage => "disk_usage",
            Self::NetworkIn => "network_in",
            Self::NetworkOut => "network_out",
            Self::ActiveConnections => "active_connections",
            Self::ResponseTime => "response_time",
        }
    }

    const fn camel_name(self) -> &'static str {
        match self {
            Self::CpuUsage => "cpuUsage",
            Self::MemoryUsage => "memoryUsage",
            Self::DiskUsage => "diskUsage",
            Self::NetworkIn => "networkIn",
            Self::NetworkOut => "networkOut",
            Self::ActiveConnections => "activeConnections",
            Self::ResponseTime => "responseTime",
        }
    }

    /// Human-readable series label including units.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CpuUsage => "CPU usage (%)",
            Self::MemoryUsage => "Memory usage (%)",
            Self::DiskUsage => "Disk usage (%)",
            Self::NetworkIn => "Network in (MB/s)",
            Self::NetworkOut => "Network out (MB/s)",
            Self::ActiveConnections => "Active connections",
            Self::ResponseTime => "Response time (ms)",
        }
    }

    /// Series colour as a CSS `rgba()` string.
    #[must_use]
    pub fn color(self, alpha: f64) -> String {
        let (r, g, b) = match self {
            Self::CpuUsage => (255, 99, 132),
            Self::MemoryUsage => (54, 162, 235),
            Self::DiskUsage => (255, 205, 86),
            Self::NetworkIn => (75, 192, 192),
            Self::NetworkOut => (153, 102, 255),
            Self::ActiveConnections => (255, 159, 64),
            Self::ResponseTime => (199, 199, 199),
        };
        format!("rgba({r}, {g}, {b}, {alpha})")
    }

    /// Percentages are bounded above by 100.
    #[must_use]
    pub const fn is_percentage(self) -> bool {
        matches!(self, Self::CpuUsage | Self::MemoryUsage | Self::DiskUsage)
    }

    /// Clamp a raw value into the field's valid range. NaN becomes 0.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        let value = if matches!(self, Self::ActiveConnections) {
            value.floor()
        } else {
            value
        };
        if self.is_percentage() {
            value.clamp(0.0, 100.0)
        } else {
            value.max(0.0)
        }
    }

    /// Whether `value` is inside the field's range.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        if self.is_percentage() {
            (0.0..=100.0).contains(&value)
        } else {
            value >= 0.0
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricField {
    type Err = MsimError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.name() == trimmed || field.camel_name() == trimmed)
            .ok_or_else(|| MsimError::unknown_metric(raw))
    }
}
