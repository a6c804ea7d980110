use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LogError, Result};
use crate::level::{Level, LogFlags};

/// Default ring size of the rotating store.
pub const DEFAULT_MAX_FILES: usize = 10;
/// Default rotation interval: twenty minutes.
pub const DEFAULT_MAX_INTERVAL_SECS: u64 = 20 * 60;

/// Rotating log store parameters.
///
/// The store stays disabled unless a directory is given and `max_files`
/// is non-zero. A zero `max_file_size` or `max_interval_secs` turns that
/// rotation trigger off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub dir: Option<PathBuf>,
    pub max_files: usize,
    pub max_file_size: u64,
    pub max_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_files: DEFAULT_MAX_FILES,
            max_file_size: 0,
            max_interval_secs: DEFAULT_MAX_INTERVAL_SECS,
        }
    }
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some() && self.max_files > 0
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_interval_secs(mut self, secs: u64) -> Self {
        self.max_interval_secs = secs;
        self
    }
}

/// Logger configuration, loadable from TOML.
///
/// ```
/// use dbg_logger::{Level, LoggerConfig};
///
/// let config = LoggerConfig::from_toml_str(
///     r#"
///     level = "info"
///     wall_clock = true
///
///     [store]
///     dir = "/tmp/logs"
///     max_files = 4
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.level, Level::Info);
/// assert_eq!(config.store.max_files, 4);
/// assert_eq!(config.store.max_interval_secs, 1200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    pub level: Level,
    pub wall_clock: bool,
    pub monotonic_clock: bool,
    pub level_tag: bool,
    pub store: StoreConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Debug,
            wall_clock: false,
            monotonic_clock: true,
            level_tag: true,
            store: StoreConfig::default(),
        }
    }
}

impl LoggerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Prefix flags selected by the boolean switches.
    pub fn flags(&self) -> LogFlags {
        let mut flags = LogFlags::empty();
        if self.wall_clock {
            flags |= LogFlags::WALL_CLOCK;
        }
        if self.monotonic_clock {
            flags |= LogFlags::MONOTONIC_CLOCK;
        }
        if self.level_tag {
            flags |= LogFlags::LEVEL_TAG;
        }
        flags
    }

    fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.store.dir {
            if dir.as_os_str().is_empty() {
                return Err(LogError::InvalidConfig("store.dir is empty".into()));
            }
        }
        Ok(())
    }
}
