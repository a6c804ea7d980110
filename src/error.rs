use std::io;

use thiserror::Error;

/// Failures of the fallible setup paths.
///
/// Emitting log lines never fails; these only come back from opening a
/// log store or loading configuration.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse logger configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid logger configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LogError>;
