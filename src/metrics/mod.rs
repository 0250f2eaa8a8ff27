//! Metric data model: samples, generation, the bounded history window, and
//! view transforms.

pub mod generator;
pub mod history;
pub mod sample;
pub mod views;
