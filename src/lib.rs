//! # dbg_logger
//!
//! A printf-style formatting engine with a leveled logger and a rotating
//! log-file store on top of it.
//!
//! ## Key Features
//!
//! * Self-contained number rendering: integers in bases 2/8/10/16, fixed,
//!   scientific and general floats with round-half-to-even
//! * C template syntax (`%-08.3f`, `%*d`, `%#x`, ...) plus `%q`/`%Q` raw
//!   hex dumps of byte slices
//! * Bounded output into caller buffers, always terminated
//! * Line-cached streaming to the console and the current log file
//! * Log files rotated by size or age in a ring of at most N files, with
//!   the ring recovered from file names after a restart
//!
//! ## Main Components
//!
//! * `format`: template expansion (`snprintf`, `sprintf`, `printf`, `format_to`)
//! * `numeric`: digit conversion and float decomposition
//! * `sink`: `MemorySink` and `StreamSink` byte destinations
//! * `Logger`: level filtering, prefixes and hex dump tables
//! * `LogStore`: the rotating file ring
//!
//! ## Quick Start
//!
//! ```
//! use dbg_logger::{args, log_hex, log_println, snprintf, Level, Logger, LoggerConfig};
//!
//! let mut buf = [0u8; 16];
//! let n = snprintf(&mut buf, "%#x|%-6s|", &args![255, "ab"]);
//! assert_eq!(&buf[..n], b"0xff|ab    |");
//!
//! let logger = Logger::new(&LoggerConfig::default());
//! log_println!(logger, Level::Info, "temperature %.1f C", 25.46);
//! log_hex!(logger, Level::Debug, b"\x01\x02hello");
//! ```

pub mod args;
pub mod config;
pub mod efficient_clock;
pub mod error;
pub mod format;
pub mod level;
pub mod log_store;
pub mod logger;
pub mod numeric;
pub mod sink;

pub use args::Arg;
pub use config::{LoggerConfig, StoreConfig};
pub use efficient_clock::{Clock, ManualClock, SystemClock};
pub use error::{LogError, Result};
pub use format::{format_to, printf, snprintf, sprintf};
pub use level::{CallSite, Level, LogFlags};
pub use log_store::{FileName, LogFileEntry, LogStore};
pub use logger::{global, init_global, install_log_bridge, Logger};
pub use sink::{FlushHandler, MemorySink, Sink, StreamSink};
