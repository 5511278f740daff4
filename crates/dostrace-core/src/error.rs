//! Core error types for dostrace.
//!
//! Errors only exist at construction boundaries: loading or validating a
//! configuration and opening an output sink. The per-event entry points the
//! host emulator calls never return errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading or validating a trace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file.
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid TOML or has mistyped keys.
    #[error("Invalid configuration document: {0}")]
    Parse(#[from] toml::de::Error),

    /// The `[debugtrace]` section exists but is not a table.
    #[error("The [debugtrace] section must be a table")]
    SectionNotTable,

    /// A numeric option is outside its accepted range.
    #[error("Option '{option}' is out of range: {value} (expected {expected})")]
    OutOfRange {
        /// Option name.
        option: &'static str,
        /// The rejected value.
        value: i64,
        /// Human-readable accepted range.
        expected: &'static str,
    },

    /// An interrupt exclusion token is not exactly two hex digits.
    #[error("Invalid interrupt exclusion token '{0}' (expected two hex digits)")]
    InvalidExclusion(String),
}

/// Errors while opening the trace output sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The log file could not be created.
    #[error("cannot open log file '{path}': {source}")]
    Open {
        /// The requested log file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;
