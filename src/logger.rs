use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Timelike};
use lazy_static::lazy_static;
use parking_lot::{Mutex, MutexGuard};
use tracing::warn;

use crate::args::Arg;
use crate::config::{LoggerConfig, StoreConfig};
use crate::efficient_clock::{Clock, SystemClock};
use crate::format::format_to;
use crate::level::{CallSite, Level, LogFlags};
use crate::log_store::LogStore;
use crate::sink::{FlushHandler, StreamSink};

/// Size of the line cache in front of the console and the log file.
pub const LOG_CACHE_SIZE: usize = 256;

const HEX_BORDER: &str =
    "+------------+-------------------------------------------------+------------------+\n";
const HEX_HEADER: &str =
    "|   offset   | 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F |      ascii       |\n";
const HEX_ROW: &str = "| 0x%08lx | %.*hhq%s | %-16s |\n";
const HEX_FILL: &str = " ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? ??";
const HEX_ROW_BYTES: usize = 16;

/// Destination of every flushed line: the console first, then the
/// current file of the rotating store when one is open.
pub struct LogOutput {
    console: Box<dyn Write + Send>,
    console_failed: bool,
    store: Option<LogStore>,
}

impl FlushHandler for LogOutput {
    fn handle_flush(&mut self, bytes: &[u8]) {
        let written = self
            .console
            .write_all(bytes)
            .and_then(|()| self.console.flush());
        match written {
            Ok(()) => self.console_failed = false,
            // reported once per run of failures
            Err(err) if !self.console_failed => {
                self.console_failed = true;
                warn!(error = %err, "failed to write console");
            }
            Err(_) => {}
        }
        if let Some(store) = self.store.as_mut() {
            store.write(bytes);
        }
    }
}

type LogSink = StreamSink<LOG_CACHE_SIZE, LogOutput>;

/// Leveled, prefixed text logger.
///
/// Every emission that passes the level check takes the single internal
/// lock, gives the rotating store a chance to rotate, renders the selected
/// prefixes and expands its template into a line cache. Complete lines go
/// to the console and the store's current file while the lock is held, so
/// lines from different threads never interleave.
///
/// # Thread Safety
///
/// `Logger` is `Send + Sync`. The level threshold is an atomic, so calls
/// that are filtered out never touch the lock.
///
/// # Examples
///
/// ```
/// use dbg_logger::{log_println, Level, Logger, LoggerConfig};
///
/// let mut config = LoggerConfig::default();
/// config.monotonic_clock = false;
/// let logger = Logger::with_output(
///     &config,
///     Vec::new(),
///     std::sync::Arc::new(dbg_logger::SystemClock),
/// );
/// log_println!(logger, Level::Info, "sensor %s ready after %d ms", "imu", 12);
/// log_println!(logger, Level::Debug, "shown: threshold defaults to debug");
/// logger.set_level(Level::Warning);
/// assert_eq!(log_println!(logger, Level::Info, "filtered"), 0);
/// ```
pub struct Logger {
    level: AtomicU8,
    flags: AtomicU8,
    clock: Arc<dyn Clock>,
    state: Mutex<LogSink>,
}

impl Logger {
    /// Creates a logger writing to standard output, with the store
    /// described by `config.store` when it is enabled.
    pub fn new(config: &LoggerConfig) -> Self {
        Self::with_output(config, io::stdout(), Arc::new(SystemClock))
    }

    /// Standard output only, default level and prefixes.
    pub fn console_only() -> Self {
        Self::new(&LoggerConfig::default())
    }

    /// Creates a logger with an explicit console writer and clock.
    ///
    /// A store that cannot be opened is reported through `tracing` and the
    /// logger carries on console-only.
    ///
    /// # Arguments
    ///
    /// * `config` - Level, prefix switches and store parameters
    /// * `console` - Receives every flushed line
    /// * `clock` - Time source for prefixes, file names and rotation
    pub fn with_output<W>(config: &LoggerConfig, console: W, clock: Arc<dyn Clock>) -> Self
    where
        W: Write + Send + 'static,
    {
        let store = open_store(&config.store, &*clock);
        let output = LogOutput {
            console: Box::new(console),
            console_failed: false,
            store,
        };
        Self {
            level: AtomicU8::new(config.level.as_u8()),
            flags: AtomicU8::new(config.flags().bits()),
            clock,
            state: Mutex::new(StreamSink::new(output)),
        }
    }

    /// Replaces the rotating store. The current store, if any, is flushed
    /// and closed first. Returns whether a store is active afterwards.
    pub fn init(&self, config: &StoreConfig) -> bool {
        let mut state = self.state.lock();
        state.flush();
        if let Some(previous) = state.handler_mut().store.take() {
            previous.close();
        }
        let store = open_store(config, &*self.clock);
        let active = store.is_some();
        state.handler_mut().store = store;
        active
    }

    /// Flushes pending output and closes the store. Console output keeps
    /// working; closing an already closed store does nothing.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.flush();
        if let Some(store) = state.handler_mut().store.take() {
            store.close();
        }
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Sets the prefixes used by the convenience macros and the `log` bridge.
    pub fn set_flags(&self, flags: LogFlags) {
        self.flags.store(flags.bits(), Ordering::Relaxed);
    }

    pub fn flags(&self) -> LogFlags {
        LogFlags::from_bits_truncate(self.flags.load(Ordering::Relaxed))
    }

    /// Whether a call at `level` would be emitted. `Suppressed` never is.
    #[inline]
    pub fn is_enabled(&self, level: Level) -> bool {
        level != Level::Suppressed && level <= self.level()
    }

    /// Emits one record.
    ///
    /// Returns the number of bytes produced, prefixes included, or 0 when
    /// the level is filtered out.
    pub fn emit(&self, level: Level, flags: LogFlags, template: &str, args: &[Arg<'_>]) -> usize {
        if !self.is_enabled(level) {
            return 0;
        }
        let mut state = self.lock_refreshed();
        self.render(&mut *state, level, flags, template, args)
    }

    /// Emits one record tagged `[label, line]: `, additionally filtered by
    /// the call site's own threshold.
    pub fn emit_at(
        &self,
        site: &CallSite,
        level: Level,
        flags: LogFlags,
        template: &str,
        args: &[Arg<'_>],
    ) -> usize {
        if !self.is_enabled(level) || level > site.threshold {
            return 0;
        }
        let mut state = self.lock_refreshed();
        let sink = &mut *state;
        let mut n = self.write_prefix(sink, level, flags);
        n += format_to(sink, "[%s, %u]: ", &crate::args![site.label, site.line]);
        n += format_to(sink, template, args);
        n
    }

    /// Renders `bytes` as a bordered table of 16-byte rows with an offset
    /// column and an ASCII column. Every table line carries the prefixes.
    ///
    /// ```text
    /// +------------+-------------------------------------------------+------------------+
    /// |   offset   | 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F |      ascii       |
    /// +------------+-------------------------------------------------+------------------+
    /// | 0x00000000 | 68 65 6c 6c 6f ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? | hello            |
    /// +------------+-------------------------------------------------+------------------+
    /// ```
    pub fn hex_dump(&self, level: Level, flags: LogFlags, bytes: &[u8]) -> usize {
        if !self.is_enabled(level) {
            return 0;
        }
        let mut state = self.lock_refreshed();
        let sink = &mut *state;
        let mut n = self.render(sink, level, flags, HEX_BORDER, &[]);
        n += self.render(sink, level, flags, HEX_HEADER, &[]);
        n += self.render(sink, level, flags, HEX_BORDER, &[]);
        for (row, chunk) in bytes.chunks(HEX_ROW_BYTES).enumerate() {
            let mut ascii = [b'.'; HEX_ROW_BYTES];
            for (cell, &byte) in ascii.iter_mut().zip(chunk) {
                if byte.is_ascii_graphic() || byte == b' ' {
                    *cell = byte;
                }
            }
            let ascii = std::str::from_utf8(&ascii[..chunk.len()]).unwrap_or_default();
            let fill = &HEX_FILL[..(HEX_ROW_BYTES - chunk.len()) * 3];
            n += self.render(
                sink,
                level,
                flags,
                HEX_ROW,
                &crate::args![row * HEX_ROW_BYTES, chunk.len(), chunk, fill, ascii],
            );
        }
        n += self.render(sink, level, flags, HEX_BORDER, &[]);
        n
    }

    /// Pushes cached bytes out and flushes the store's file.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.flush();
        if let Some(store) = state.handler_mut().store.as_mut() {
            store.flush();
        }
    }

    /// Path of the file currently receiving output, if a store is open.
    pub fn current_log_file(&self) -> Option<PathBuf> {
        self.state.lock().handler().store.as_ref().and_then(LogStore::current_path)
    }

    fn lock_refreshed(&self) -> MutexGuard<'_, LogSink> {
        let mut state = self.state.lock();
        if let Some(store) = state.handler_mut().store.as_mut() {
            store.refresh(&*self.clock);
        }
        state
    }

    fn render(
        &self,
        sink: &mut LogSink,
        level: Level,
        flags: LogFlags,
        template: &str,
        args: &[Arg<'_>],
    ) -> usize {
        self.write_prefix(sink, level, flags) + format_to(sink, template, args)
    }

    fn write_prefix(&self, sink: &mut LogSink, level: Level, flags: LogFlags) -> usize {
        let mut n = 0;
        if flags.contains(LogFlags::WALL_CLOCK) {
            let now = self.clock.wall_clock();
            n += format_to(
                sink,
                "[%04d-%02d-%02d %02d:%02d:%02d] ",
                &crate::args![
                    now.year(),
                    now.month(),
                    now.day(),
                    now.hour(),
                    now.minute(),
                    now.second()
                ],
            );
        }
        if flags.contains(LogFlags::MONOTONIC_CLOCK) {
            let now_us = self.clock.monotonic_us();
            n += format_to(
                sink,
                "[%5lu.%06lu] ",
                &crate::args![now_us / 1_000_000, now_us % 1_000_000],
            );
        }
        if flags.contains(LogFlags::LEVEL_TAG) && level != Level::Suppressed {
            n += format_to(sink, "[%s] ", &crate::args![level.tag()]);
        }
        n
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.flush();
        if let Some(store) = state.handler_mut().store.as_mut() {
            store.flush();
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.is_enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = Level::from(record.level());
        if !self.is_enabled(level) {
            return;
        }
        let message = record.args().to_string();
        self.emit(
            level,
            self.flags(),
            "[%s] %s\n",
            &crate::args![record.target(), message.as_str()],
        );
    }

    fn flush(&self) {
        Logger::flush(self);
    }
}

fn open_store(config: &StoreConfig, clock: &dyn Clock) -> Option<LogStore> {
    match LogStore::open(config, clock) {
        Ok(store) => store,
        Err(err) => {
            warn!(
                dir = ?config.dir,
                error = %err,
                "log store unavailable, logging to console only"
            );
            None
        }
    }
}

lazy_static! {
    static ref GLOBAL_LOGGER: Logger = Logger::console_only();
}

/// The process-wide logger, created console-only on first use.
pub fn global() -> &'static Logger {
    &GLOBAL_LOGGER
}

/// Applies `config` to the process-wide logger. Returns whether a store
/// is active afterwards.
pub fn init_global(config: &LoggerConfig) -> bool {
    let logger = global();
    logger.set_level(config.level);
    logger.set_flags(config.flags());
    logger.init(&config.store)
}

/// Routes the `log` facade (`log::info!` and friends) into [`global`].
pub fn install_log_bridge() -> Result<(), log::SetLoggerError> {
    log::set_logger(global())?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Emits a record with the logger's current prefixes and no line break.
///
/// Arguments are only evaluated when the level passes.
#[macro_export]
macro_rules! log_printf {
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        let level: $crate::Level = $level;
        if logger.is_enabled(level) {
            logger.emit(level, logger.flags(), $template, &$crate::args![$($arg),*])
        } else {
            0
        }
    }};
}

/// Like [`log_printf!`] with a trailing line break.
#[macro_export]
macro_rules! log_println {
    ($logger:expr, $level:expr, $template:literal $(, $arg:expr)* $(,)?) => {
        $crate::log_printf!($logger, $level, concat!($template, "\n") $(, $arg)*)
    };
}

/// Like [`log_println!`], tagged with the calling file and line.
#[macro_export]
macro_rules! log_fl {
    ($logger:expr, $level:expr, $template:literal $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        let level: $crate::Level = $level;
        if logger.is_enabled(level) {
            logger.emit_at(
                &$crate::call_site!(),
                level,
                logger.flags(),
                concat!($template, "\n"),
                &$crate::args![$($arg),*],
            )
        } else {
            0
        }
    }};
}

/// Emits a record without any prefix.
#[macro_export]
macro_rules! log_raw {
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        let level: $crate::Level = $level;
        if logger.is_enabled(level) {
            logger.emit(level, $crate::LogFlags::empty(), $template, &$crate::args![$($arg),*])
        } else {
            0
        }
    }};
}

/// Hex dump table of a byte slice with the logger's current prefixes.
#[macro_export]
macro_rules! log_hex {
    ($logger:expr, $level:expr, $bytes:expr $(,)?) => {{
        let logger = &$logger;
        logger.hex_dump($level, logger.flags(), $bytes)
    }};
}
