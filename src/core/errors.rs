//! MSIM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, MsimError>;

/// Top-level error type for the metrics simulator.
#[derive(Debug, Error)]
pub enum MsimError {
    #[error("[MSIM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MSIM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MSIM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MSIM-2001] unknown metric field: {name:?}")]
    UnknownMetric { name: String },

    #[error("[MSIM-2002] unknown view shape: {name:?}")]
    UnknownView { name: String },

    #[error("[MSIM-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MSIM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MSIM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl MsimError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MSIM-1001",
            Self::MissingConfig { .. } => "MSIM-1002",
            Self::ConfigParse { .. } => "MSIM-1003",
            Self::UnknownMetric { .. } => "MSIM-2001",
            Self::UnknownView { .. } => "MSIM-2002",
            Self::Serialization { .. } => "MSIM-2101",
            Self::Io { .. } => "MSIM-3002",
            Self::Runtime { .. } => "MSIM-3900",
        }
    }

    /// Whether the caller supplied something the simulator does not know.
    #[must_use]
    pub const fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::UnknownMetric { .. } | Self::UnknownView { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for an unknown metric name.
    #[must_use]
    pub fn unknown_metric(name: impl Into<String>) -> Self {
        Self::UnknownMetric { name: name.into() }
    }
}

impl From<serde_json::Error> for MsimError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for MsimError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_unique() {
        let errors: Vec<MsimError> = vec![
            MsimError::InvalidConfig {
                details: String::new(),
            },
            MsimError::MissingConfig {
                path: PathBuf::new(),
            },
            MsimError::ConfigParse {
                context: "",
                details: String::new(),
            },
            MsimError::unknown_metric("x"),
            MsimError::UnknownView {
                name: String::new(),
            },
            MsimError::Serialization {
                context: "",
                details: String::new(),
            },
            MsimError::io("/tmp", std::io::Error::other("boom")),
            MsimError::Runtime {
                details: String::new(),
            },
        ];
        let mut codes: Vec<&str> = errors.iter().map(MsimError::code).collect();
        let before = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), before);
    }

    #[test]
    fn display_carries_code_prefix() {
        let err = MsimError::unknown_metric("gpuUsage");
        let text = err.to_string();
        assert!(text.starts_with("[MSIM-2001]"));
        assert!(text.contains("gpuUsage"));
    }

    #[test]
    fn lookup_failures_are_classified() {
        assert!(MsimError::unknown_metric("x").is_lookup_failure());
        assert!(
            MsimError::UnknownView {
                name: "pie".to_string()
            }
            .is_lookup_failure()
        );
        assert!(
            !MsimError::Runtime {
                details: String::new()
            }
            .is_lookup_failure()
        );
    }

    #[test]
    fn toml_errors_map_to_config_parse() {
        let parse: std::result::Result<toml::Table, _> = toml::from_str("= nope");
        let err: MsimError = parse.expect_err("invalid toml").into();
        assert_eq!(err.code(), "MSIM-1003");
    }
}
