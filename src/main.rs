//! dbg_logger command line tool
//!
//! Usage:
//!   some_command | dbg_logger --dir /userdata/log          # log each stdin line
//!   dbg_logger --config logger.toml --emit-level warning   # settings from TOML
//!   dbg_logger --hex < frame.bin                           # hex dump table of stdin

use std::io::{self, BufRead, Read};
use std::path::PathBuf;

use clap::Parser;
use dbg_logger::{
    global, init_global, install_log_bridge, log_println, Level, LogError, LoggerConfig,
};
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbg_logger")]
#[command(about = "Pipe stdin through a leveled logger with rotating log files", long_about = None)]
struct Cli {
    /// TOML configuration file; the options below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log directory; omit for console-only logging
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Maximum number of log files kept in the directory
    #[arg(long)]
    max_files: Option<usize>,

    /// Rotate once the current file exceeds this many bytes (0 disables)
    #[arg(long)]
    max_size: Option<u64>,

    /// Rotate once the current file is older than this many seconds (0 disables)
    #[arg(long)]
    interval: Option<u64>,

    /// Threshold: suppressed, error, warning, sys, info or debug
    #[arg(short, long)]
    level: Option<Level>,

    /// Level each stdin line is logged at
    #[arg(short, long, default_value = "info")]
    emit_level: Level,

    /// Prefix lines with calendar time
    #[arg(long)]
    wall_clock: bool,

    /// Dump stdin as a hex table instead of logging lines
    #[arg(long)]
    hex: bool,
}

impl Cli {
    fn logger_config(&self) -> Result<LoggerConfig, LogError> {
        let mut config = match &self.config {
            Some(path) => LoggerConfig::from_file(path)?,
            None => LoggerConfig::default(),
        };
        if let Some(dir) = &self.dir {
            config.store.dir = Some(dir.clone());
        }
        if let Some(max_files) = self.max_files {
            config.store.max_files = max_files;
        }
        if let Some(max_size) = self.max_size {
            config.store.max_file_size = max_size;
        }
        if let Some(interval) = self.interval {
            config.store.max_interval_secs = interval;
        }
        if let Some(level) = self.level {
            config.level = level;
        }
        if self.wall_clock {
            config.wall_clock = true;
        }
        Ok(config)
    }
}

/// Sends the crate's own diagnostics to stderr.
///
/// The subscriber is set directly rather than through `init()`, which would
/// also claim the `log` facade and lock out [`install_log_bridge`].
fn install_diagnostics() -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

fn main() -> Result<(), LogError> {
    if let Err(err) = install_diagnostics() {
        eprintln!("dbg_logger: diagnostics disabled: {}", err);
    }

    let cli = Cli::parse();
    let config = cli.logger_config()?;
    if !init_global(&config) && config.store.is_enabled() {
        tracing::warn!("continuing without log files");
    }
    if let Err(err) = install_log_bridge() {
        tracing::warn!(error = %err, "log facade already claimed");
    }
    log::debug!("logging at {} into {:?}", config.level, config.store.dir);

    let logger = global();
    let result = if cli.hex {
        let mut bytes = Vec::new();
        io::stdin().lock().read_to_end(&mut bytes).map(|_| {
            logger.hex_dump(cli.emit_level, logger.flags(), &bytes);
        })
    } else {
        pipe_lines(cli.emit_level)
    };

    logger.shutdown();
    result.map_err(LogError::from)
}

fn pipe_lines(level: Level) -> io::Result<()> {
    let logger = global();
    for line in io::stdin().lock().lines() {
        let line = line?;
        log_println!(logger, level, "%s", line.as_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_bridge_installs_after_diagnostics() {
        install_diagnostics().unwrap();
        install_log_bridge().unwrap();
        assert_eq!(log::max_level(), log::LevelFilter::Trace);
        let metadata = log::Metadata::builder().level(log::Level::Info).build();
        assert!(log::Log::enabled(log::logger(), &metadata));
    }
}
