//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{MsimError, Result};

/// Full simulator configuration model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulator: SimulatorConfig,
    pub stress: StressConfig,
    pub paths: PathsConfig,
}

/// Sliding-window and base-tick settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of samples retained in the history window.
    pub capacity: usize,
    /// Base tick period; one sample is appended per tick.
    pub tick_interval_ms: u64,
    /// Fixed RNG seed for reproducible runs. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Stress-mode load generator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StressConfig {
    pub tick_interval_ms: u64,
    /// Iterations of the trigonometric busy loop per stress tick.
    pub cpu_iterations: u64,
    /// Objects allocated per payload batch.
    pub batch_objects: usize,
    /// Width of the `f64` vector carried by each payload object.
    pub object_width: usize,
    /// Prune the payload once it holds more than this many batches.
    pub prune_threshold: usize,
    /// Batches kept (newest first) after a prune.
    pub retain_batches: usize,
    /// Spread multiplier applied to random terms while stressed.
    pub value_multiplier: f64,
    /// Positive bias added to generated values while stressed.
    pub value_offset: f64,
}

/// Filesystem paths used by msim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            capacity: 60,
            tick_interval_ms: 1_000,
            seed: None,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            cpu_iterations: 800_000,
            batch_objects: 2_000,
            object_width: 80,
            prune_threshold: 50,
            retain_batches: 30,
            value_multiplier: 2.0,
            value_offset: 30.0,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[MSIM-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("msim").join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("msim")
                .join("activity.jsonl"),
        }
    }
}

impl SimulatorConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl StressConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| MsimError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(MsimError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // simulator
        if let Some(raw) = lookup("MSIM_SIMULATOR_CAPACITY") {
            self.simulator.capacity = parse_env("MSIM_SIMULATOR_CAPACITY", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_SIMULATOR_TICK_INTERVAL_MS") {
            self.simulator.tick_interval_ms = parse_env("MSIM_SIMULATOR_TICK_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_SIMULATOR_SEED") {
            self.simulator.seed = Some(parse_env("MSIM_SIMULATOR_SEED", &raw)?);
        }

        // stress
        if let Some(raw) = lookup("MSIM_STRESS_TICK_INTERVAL_MS") {
            self.stress.tick_interval_ms = parse_env("MSIM_STRESS_TICK_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_STRESS_CPU_ITERATIONS") {
            self.stress.cpu_iterations = parse_env("MSIM_STRESS_CPU_ITERATIONS", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_STRESS_BATCH_OBJECTS") {
            self.stress.batch_objects = parse_env("MSIM_STRESS_BATCH_OBJECTS", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_STRESS_OBJECT_WIDTH") {
            self.stress.object_width = parse_env("MSIM_STRESS_OBJECT_WIDTH", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_STRESS_PRUNE_THRESHOLD") {
            self.stress.prune_threshold = parse_env("MSIM_STRESS_PRUNE_THRESHOLD", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_STRESS_RETAIN_BATCHES") {
            self.stress.retain_batches = parse_env("MSIM_STRESS_RETAIN_BATCHES", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_STRESS_VALUE_MULTIPLIER") {
            self.stress.value_multiplier = parse_env("MSIM_STRESS_VALUE_MULTIPLIER", &raw)?;
        }
        if let Some(raw) = lookup("MSIM_STRESS_VALUE_OFFSET") {
            self.stress.value_offset = parse_env("MSIM_STRESS_VALUE_OFFSET", &raw)?;
        }

        // paths
        if let Some(raw) = lookup("MSIM_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Reject values the simulator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.simulator.capacity == 0 {
            return Err(MsimError::InvalidConfig {
                details: "simulator.capacity must be >= 1".to_string(),
            });
        }
        for (name, val) in [
            ("simulator.tick_interval_ms", self.simulator.tick_interval_ms),
            ("stress.tick_interval_ms", self.stress.tick_interval_ms),
        ] {
            if val == 0 {
                return Err(MsimError::InvalidConfig {
                    details: format!("{name} must be >= 1"),
                });
            }
        }

        let stress = &self.stress;
        if stress.batch_objects == 0 || stress.object_width == 0 {
            return Err(MsimError::InvalidConfig {
                details: "stress.batch_objects and stress.object_width must be >= 1".to_string(),
            });
        }
        if stress.prune_threshold == 0 {
            return Err(MsimError::InvalidConfig {
                details: "stress.prune_threshold must be >= 1".to_string(),
            });
        }
        if stress.retain_batches >= stress.prune_threshold {
            return Err(MsimError::InvalidConfig {
                details: format!(
                    "stress.retain_batches ({}) must be < stress.prune_threshold ({})",
                    stress.retain_batches, stress.prune_threshold
                ),
            });
        }
        if !stress.value_multiplier.is_finite() || stress.value_multiplier < 1.0 {
            return Err(MsimError::InvalidConfig {
                details: format!(
                    "stress.value_multiplier must be >= 1, got {}",
                    stress.value_multiplier
                ),
            });
        }
        if !stress.value_offset.is_finite() || stress.value_offset < 0.0 {
            return Err(MsimError::InvalidConfig {
                details: format!(
                    "stress.value_offset must be >= 0, got {}",
                    stress.value_offset
                ),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| MsimError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
