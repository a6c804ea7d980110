use dbg_logger::{
    call_site, log_fl, log_hex, log_printf, log_println, log_raw, CallSite, Clock, Level,
    LogFlags, Logger, LoggerConfig, ManualClock, StoreConfig,
};
use chrono::NaiveDate;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn manual_clock() -> Arc<ManualClock> {
    let start = NaiveDate::from_ymd_opt(2025, 4, 17)
        .unwrap()
        .and_hms_opt(15, 55, 5)
        .unwrap();
    Arc::new(ManualClock::new(start))
}

fn console_logger(config: &LoggerConfig) -> (Logger, SharedBuffer, Arc<ManualClock>) {
    let console = SharedBuffer::default();
    let clock = manual_clock();
    let logger = Logger::with_output(config, console.clone(), clock.clone() as Arc<dyn Clock>);
    (logger, console, clock)
}

fn bare_config() -> LoggerConfig {
    LoggerConfig {
        monotonic_clock: false,
        level_tag: false,
        ..LoggerConfig::default()
    }
}

#[test]
fn test_all_prefixes() {
    let (logger, console, clock) = console_logger(&LoggerConfig::default());
    clock.advance(Duration::from_micros(3_000_042));

    let flags = LogFlags::WALL_CLOCK | LogFlags::MONOTONIC_CLOCK | LogFlags::LEVEL_TAG;
    let n = logger.emit(Level::Info, flags, "hello %d\n", &dbg_logger::args![7]);

    let expected = "[2025-04-17 15:55:08] [    3.000042] [I] hello 7\n";
    assert_eq!(console.contents(), expected);
    assert_eq!(n, expected.len());
}

#[test]
fn test_default_flags_from_config() {
    let (logger, console, clock) = console_logger(&LoggerConfig::default());
    clock.advance(Duration::from_secs(12));

    log_println!(logger, Level::Warning, "disk %d%% full", 91);
    assert_eq!(console.contents(), "[   12.000000] [W] disk 91% full\n");
}

#[test]
fn test_level_filtering() {
    let (logger, console, _) = console_logger(&bare_config());
    logger.set_level(Level::Warning);

    assert_eq!(log_println!(logger, Level::Info, "hidden"), 0);
    assert_eq!(log_println!(logger, Level::Debug, "hidden"), 0);
    assert!(log_println!(logger, Level::Warning, "shown") > 0);
    assert!(log_println!(logger, Level::Error, "shown too") > 0);
    assert_eq!(console.contents(), "shown\nshown too\n");

    logger.set_level(Level::Suppressed);
    assert_eq!(log_println!(logger, Level::Error, "silenced"), 0);
    assert_eq!(logger.level(), Level::Suppressed);
}

#[test]
fn test_suppressed_calls_are_never_emitted() {
    let (logger, console, _) = console_logger(&bare_config());
    assert_eq!(logger.level(), Level::Debug);
    assert_eq!(logger.emit(Level::Suppressed, LogFlags::empty(), "never\n", &[]), 0);
    assert!(console.contents().is_empty());
}

#[test]
fn test_arguments_skipped_when_filtered() {
    let (logger, _, _) = console_logger(&bare_config());
    logger.set_level(Level::Error);
    let mut evaluated = false;
    log_printf!(logger, Level::Debug, "%d", {
        evaluated = true;
        1
    });
    assert!(!evaluated);
}

#[test]
fn test_raw_has_no_prefix() {
    let (logger, console, _) = console_logger(&LoggerConfig::default());
    log_raw!(logger, Level::Info, "raw %s|", "text");
    logger.flush();
    assert_eq!(console.contents(), "raw text|");
}

#[test]
fn test_partial_lines_wait_for_flush() {
    let (logger, console, _) = console_logger(&bare_config());
    log_printf!(logger, Level::Info, "no newline yet");
    assert!(console.contents().is_empty());
    log_printf!(logger, Level::Info, ", done\n");
    assert_eq!(console.contents(), "no newline yet, done\n");
}

#[test]
fn test_call_site_prefix_and_threshold() {
    let (logger, console, _) = console_logger(&bare_config());
    let site = CallSite {
        label: "sensor.rs",
        line: 42,
        module: "sensor",
        threshold: Level::Info,
    };

    assert_eq!(
        logger.emit_at(&site, Level::Debug, LogFlags::empty(), "too chatty\n", &[]),
        0
    );
    logger.emit_at(&site, Level::Info, LogFlags::LEVEL_TAG, "ready\n", &[]);
    assert_eq!(console.contents(), "[I] [sensor.rs, 42]: ready\n");
}

#[test]
fn test_fl_macro_tags_file_and_line() {
    let (logger, console, _) = console_logger(&bare_config());
    let line = line!() + 1;
    log_fl!(logger, Level::Sys, "boot %s", "ok");
    assert_eq!(
        console.contents(),
        format!("[{}, {}]: boot ok\n", file!(), line)
    );

    let site = call_site!(Level::Error);
    assert_eq!(site.module, module_path!());
}

#[test]
fn test_hex_dump_table() {
    let (logger, console, _) = console_logger(&bare_config());
    let bytes: Vec<u8> = (0u8..18).collect();
    let n = log_hex!(logger, Level::Info, &bytes);

    let border = format!("+{}+{}+{}+", "-".repeat(12), "-".repeat(49), "-".repeat(18));
    let full_row = format!(
        "| 0x00000000 | {} | {} |",
        (0..16).map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" "),
        ".".repeat(16)
    );
    let partial_row = format!("| 0x00000010 | 10 11{} | {:<16} |", " ??".repeat(14), "..");
    let expected = [
        border.as_str(),
        "|   offset   | 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F |      ascii       |",
        border.as_str(),
        full_row.as_str(),
        partial_row.as_str(),
        border.as_str(),
    ]
    .join("\n")
        + "\n";

    assert_eq!(console.contents(), expected);
    assert_eq!(n, expected.len());
}

#[test]
fn test_hex_dump_ascii_column() {
    let (logger, console, _) = console_logger(&bare_config());
    logger.hex_dump(Level::Info, LogFlags::empty(), b"hi there\x7f\x00");
    let contents = console.contents();
    let row = contents.lines().nth(3).unwrap();
    assert!(row.ends_with("| hi there..       |"), "{}", row);
    assert!(row.contains("68 69 20 74 68 65 72 65 7f 00 ??"));
}

#[test]
fn test_concurrent_lines_do_not_interleave() {
    let (logger, console, _) = console_logger(&bare_config());
    let logger = Arc::new(logger);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..100 {
                    log_println!(logger, Level::Info, "thread %d line %03d %s", t, i, "payload");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let contents = console.contents();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 400);
    for line in lines {
        assert!(line.starts_with("thread "), "{}", line);
        assert!(line.ends_with(" payload"), "{}", line);
    }
}

#[test]
fn test_log_facade_bridge() {
    let (logger, console, _) = console_logger(&bare_config());
    log::Log::log(
        &logger,
        &log::Record::builder()
            .args(format_args!("value {}", 5))
            .level(log::Level::Warn)
            .target("bridge")
            .build(),
    );
    assert_eq!(console.contents(), "[bridge] value 5\n");

    logger.set_level(Level::Error);
    assert!(!log::Log::enabled(
        &logger,
        &log::Metadata::builder().level(log::Level::Warn).build()
    ));
}

#[test]
fn test_file_output_follows_console() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggerConfig {
        store: StoreConfig::new(dir.path()),
        ..bare_config()
    };
    let (logger, console, _) = console_logger(&config);

    log_println!(logger, Level::Info, "persisted %d", 1);
    let path = logger.current_log_file().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), console.contents());

    logger.shutdown();
    assert!(logger.current_log_file().is_none());
    log_println!(logger, Level::Info, "console only");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "persisted 1\n");
}

struct BrokenConsole;

impl Write for BrokenConsole {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_console_failure_keeps_file_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggerConfig {
        store: StoreConfig::new(dir.path()),
        ..bare_config()
    };
    let logger = Logger::with_output(&config, BrokenConsole, manual_clock() as Arc<dyn Clock>);

    assert_eq!(log_println!(logger, Level::Info, "first %d", 1), 8);
    assert_eq!(log_println!(logger, Level::Info, "second %d", 2), 9);

    let path = logger.current_log_file().unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "first 1\nsecond 2\n");
}

#[test]
fn test_size_rotation_through_logger() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggerConfig {
        store: StoreConfig::new(dir.path())
            .with_max_files(3)
            .with_max_file_size(64),
        ..bare_config()
    };
    let (logger, _, _) = console_logger(&config);

    let padding = "-".repeat(30);
    for i in 1..=10 {
        log_raw!(logger, Level::Info, "line %02d %s\n", i, padding.as_str());
    }

    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 3);
    let current = std::fs::read_to_string(logger.current_log_file().unwrap()).unwrap();
    assert_eq!(current, format!("line 09 {0}\nline 10 {0}\n", padding));
}

#[test]
fn test_reinit_switches_directory() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let (logger, _, _) = console_logger(&bare_config());
    assert!(logger.current_log_file().is_none());

    assert!(logger.init(&StoreConfig::new(first.path())));
    log_println!(logger, Level::Info, "first");
    assert!(logger.init(&StoreConfig::new(second.path())));
    log_println!(logger, Level::Info, "second");

    let current = logger.current_log_file().unwrap();
    assert!(current.starts_with(second.path()));
    assert_eq!(std::fs::read_to_string(current).unwrap(), "second\n");
    assert!(!logger.init(&StoreConfig::default()));
}

#[test]
fn test_unusable_directory_degrades_to_console() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"occupied").unwrap();

    let config = LoggerConfig {
        store: StoreConfig::new(blocker.join("logs")),
        ..bare_config()
    };
    let (logger, console, _) = console_logger(&config);
    assert!(logger.current_log_file().is_none());
    log_println!(logger, Level::Error, "still here");
    assert_eq!(console.contents(), "still here\n");
}
