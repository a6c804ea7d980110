use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LogError;

/// Verbosity scale. A call is emitted when its level is at or below the
/// logger's threshold; `Suppressed` as a threshold silences everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Suppressed = 0,
    Error = 1,
    Warning = 2,
    Sys = 3,
    Info = 4,
    #[default]
    Debug = 5,
}

impl Level {
    /// Single-letter tag rendered in `[X] ` prefixes.
    pub const fn tag(self) -> &'static str {
        match self {
            Level::Suppressed => "U",
            Level::Error => "E",
            Level::Warning => "W",
            Level::Sys => "S",
            Level::Info => "I",
            Level::Debug => "D",
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Values above `Debug` clamp to `Debug`.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Suppressed,
            1 => Level::Error,
            2 => Level::Warning,
            3 => Level::Sys,
            4 => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Suppressed => "suppressed",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Sys => "sys",
            Level::Info => "info",
            Level::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "suppressed" | "off" | "none" => Ok(Level::Suppressed),
            "error" | "err" | "e" => Ok(Level::Error),
            "warning" | "warn" | "w" => Ok(Level::Warning),
            "sys" | "s" => Ok(Level::Sys),
            "info" | "i" => Ok(Level::Info),
            "debug" | "d" => Ok(Level::Debug),
            other => Err(LogError::InvalidConfig(format!("unknown level `{}`", other))),
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

/// Which prefixes an emission renders before its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogFlags(u8);

impl LogFlags {
    /// `[YYYY-MM-DD HH:MM:SS] `
    pub const WALL_CLOCK: Self = Self(0x01);
    /// `[secs.usecs] `
    pub const MONOTONIC_CLOCK: Self = Self(0x02);
    /// `[E] `, `[W] `, ...
    pub const LEVEL_TAG: Self = Self(0x04);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0x07)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & 0x07)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LogFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LogFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Where an emission comes from, and the module's own verbosity ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub label: &'static str,
    pub line: u32,
    pub module: &'static str,
    pub threshold: Level,
}

/// Captures the current file, line and module as a [`CallSite`].
///
/// ```
/// use dbg_logger::{call_site, Level};
///
/// let site = call_site!(Level::Info);
/// assert_eq!(site.threshold, Level::Info);
/// assert!(site.line > 0);
/// ```
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::call_site!($crate::Level::Debug)
    };
    ($threshold:expr) => {
        $crate::CallSite {
            label: file!(),
            line: line!(),
            module: module_path!(),
            threshold: $threshold,
        }
    };
}
