//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use metrics_simulator::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{MsimError, Result};

// Metrics
pub use crate::metrics::generator::SampleGenerator;
pub use crate::metrics::history::History;
pub use crate::metrics::sample::{MetricField, MetricSample};
pub use crate::metrics::views::{View, ViewShape};

// Simulator
pub use crate::simulator::Simulator;
pub use crate::simulator::status::StatusReport;
pub use crate::simulator::stress::PerformanceSnapshot;
pub use crate::simulator::ticker::{TickHandle, spawn_ticker};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
