//! Synthetic sample generation: smooth oscillation + bounded noise + stress bias.
//!
//! Each reading is `base + noise * spread * multiplier + oscillation * weight
//! + offset * scale`, clamped to the field's range. The oscillation term is
//! `sin(epoch_ms / 10_000) * 0.3`, a slow ~63 s wave shared by all fields.

#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::core::config::StressConfig;
use crate::metrics::sample::{MetricField, MetricSample};

/// Period divisor of the shared oscillation term (milliseconds).
const OSCILLATION_PERIOD_MS: f64 = 10_000.0;
/// Amplitude of the shared oscillation term.
const OSCILLATION_AMPLITUDE: f64 = 0.3;

/// Per-field generation coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldProfile {
    /// Constant floor.
    pub base: f64,
    /// Width of the uniform noise term.
    pub spread: f64,
    /// Scale of the shared oscillation term.
    pub oscillation_weight: f64,
    /// Scale of the stress offset.
    pub offset_scale: f64,
}

impl FieldProfile {
    /// Coefficients for `field`.
    #[must_use]
    pub const fn for_field(field: MetricField) -> Self {
        let (base, spread, oscillation_weight, offset_scale) = match field {
            MetricField::CpuUsage => (30.0, 40.0, 20.0, 1.0),
            MetricField::MemoryUsage => (40.0, 30.0, 15.0, 1.0),
            MetricField::DiskUsage => (20.0, 20.0, 10.0, 1.0),
            MetricField::NetworkIn => (0.0, 1_000.0, 200.0, 10.0),
            MetricField::NetworkOut => (0.0, 800.0, 150.0, 8.0),
            MetricField::ActiveConnections => (0.0, 500.0, 100.0, 5.0),
            MetricField::ResponseTime => (0.0, 200.0, 50.0, 2.0),
        };
        Self {
            base,
            spread,
            oscillation_weight,
            offset_scale,
        }
    }
}

/// Bias applied while stress mode is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressBias {
    /// Noise multiplier.
    pub multiplier: f64,
    /// Offset added before scaling per field.
    pub offset: f64,
}

impl StressBias {
    /// No bias: unit multiplier, zero offset.
    pub const IDLE: Self = Self {
        multiplier: 1.0,
        offset: 0.0,
    };

    /// Bias from `value_multiplier` and `value_offset`.
    #[must_use]
    pub fn from_config(config: &StressConfig) -> Self {
        Self {
            multiplier: config.value_multiplier,
            offset: config.value_offset,
        }
    }
}

impl Default for StressBias {
    fn default() -> Self {
        Self::from_config(&StressConfig::default())
    }
}

/// Produces samples from a timestamp, the stress state and a random source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGenerator {
    stress_bias: StressBias,
}

impl SampleGenerator {
    /// Generator applying `stress_bias` to stressed samples.
    #[must_use]
    pub const fn new(stress_bias: StressBias) -> Self {
        Self { stress_bias }
    }

    /// Generator biased by the configured stress values.
    #[must_use]
    pub fn from_config(config: &StressConfig) -> Self {
        Self::new(StressBias::from_config(config))
    }

    /// The shared oscillation term at `now`.
    #[must_use]
    pub fn oscillation(now: DateTime<Utc>) -> f64 {
        (now.timestamp_millis() as f64 / OSCILLATION_PERIOD_MS).sin() * OSCILLATION_AMPLITUDE
    }

    /// Generate one sample. Every field is clamped after combining its terms.
    pub fn generate<R: Rng>(
        &self,
        now: DateTime<Utc>,
        stressed: bool,
        rng: &mut R,
    ) -> MetricSample {
        let bias = if stressed {
            self.stress_bias
        } else {
            StressBias::IDLE
        };
        let oscillation = Self::oscillation(now);

        let mut sample = MetricSample::zeroed(now);
        for field in MetricField::ALL {
            let profile = FieldProfile::for_field(field);
            let noise: f64 = rng.random();
            let raw = profile.base
                + noise * profile.spread * bias.multiplier
                + oscillation * profile.oscillation_weight
                + bias.offset * profile.offset_scale;
            sample.set(field, raw);
        }
        sample
    }
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self::new(StressBias::default())
    }
}
