//! Crate-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the overlay from starting or running.
///
/// Remote failures are not in here: a missing Streamer.bot connection or a
/// failed action only degrades the overlay and is reported through logs.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The log file could not be opened.
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        /// Requested log file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The log subscriber could not be installed.
    #[error("cannot install logger: {0}")]
    Logging(String),
    /// The terminal program could not be built or failed while running.
    #[error("terminal error: {0}")]
    Terminal(String),
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
