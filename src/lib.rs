#![forbid(unsafe_code)]

//! Metrics Simulator (msim): synthetic server metrics for dashboards.
//!
//! A [`Simulator`](simulator::Simulator) keeps a bounded sliding window of
//! fabricated metric samples, appends one per tick while running, and can be
//! pushed into a stress mode that biases values upward and burns CPU and
//! memory in the background. The window is exposed as five chart-ready view
//! shapes.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use metrics_simulator::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use metrics_simulator::core::config::Config;
//! use metrics_simulator::metrics::views::{ViewShape, render};
//! ```

pub mod prelude;

pub mod core;
#[cfg(feature = "daemon")]
pub mod daemon;
pub mod logger;
pub mod metrics;
pub mod simulator;
