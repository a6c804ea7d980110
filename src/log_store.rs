use std::fmt;
use std::fs::{self, File};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::args;
use crate::config::StoreConfig;
use crate::efficient_clock::Clock;
use crate::error::Result;
use crate::format::snprintf;
use crate::numeric::{parse_digits, Base};

/// Length of a log file name: `0000000a_20250417_155505.log`.
pub const FILE_NAME_LEN: usize = 28;

const FILE_NAME_TEMPLATE: &str = "%08x_%04d%02d%02d_%02d%02d%02d.log";

/// A log file name of the exact `<generation>_<YYYYMMDD>_<HHMMSS>.log` shape.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileName([u8; FILE_NAME_LEN]);

impl FileName {
    /// Renders the name for `generation` created at `at`.
    pub fn render(generation: u32, at: &NaiveDateTime) -> Self {
        let mut buf = [0u8; FILE_NAME_LEN + 1];
        snprintf(
            &mut buf,
            FILE_NAME_TEMPLATE,
            &args![
                generation,
                at.year(),
                at.month(),
                at.day(),
                at.hour(),
                at.minute(),
                at.second()
            ],
        );
        let mut name = [0u8; FILE_NAME_LEN];
        name.copy_from_slice(&buf[..FILE_NAME_LEN]);
        Self(name)
    }

    /// Parses a directory entry name, returning it with its generation.
    /// Anything but the exact shape is rejected.
    pub fn parse(name: &str) -> Option<(Self, u32)> {
        let bytes: &[u8; FILE_NAME_LEN] = name.as_bytes().try_into().ok()?;
        if bytes[8] != b'_' || bytes[17] != b'_' || &bytes[24..] != b".log" {
            return None;
        }
        let all_decimal = |digits: &[u8]| digits.iter().all(u8::is_ascii_digit);
        if !all_decimal(&bytes[9..17]) || !all_decimal(&bytes[18..24]) {
            return None;
        }
        let generation = parse_digits(&bytes[..8], Base::Hex)?;
        Some((Self(*bytes), generation as u32))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileName").field(&self.as_str()).finish()
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The file occupying one ring slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFileEntry {
    pub slot: usize,
    pub name: FileName,
    pub generation: u32,
}

/// Ring of at most `max_files` log files in one directory.
///
/// Generation `g` always lands in slot `g % max_files`, so a new file
/// evicts the file written `max_files` generations earlier. The ring is
/// rebuilt from file names when the store is opened, which is what lets
/// generations keep increasing across restarts.
pub struct LogStore {
    dir: PathBuf,
    max_files: usize,
    max_size: u64,
    max_interval_us: u64,
    slots: Vec<Option<LogFileEntry>>,
    file: Option<LineWriter<File>>,
    current: Option<LogFileEntry>,
    current_size: u64,
    created_at_us: u64,
    next_generation: u32,
}

impl LogStore {
    /// Opens the store described by `config`.
    ///
    /// Returns `Ok(None)` when the configuration leaves the store disabled.
    /// On success the directory exists, stale files have been removed and
    /// a fresh current file is open.
    pub fn open(config: &StoreConfig, clock: &dyn Clock) -> Result<Option<Self>> {
        let dir = match &config.dir {
            Some(dir) if config.max_files > 0 => dir.clone(),
            _ => return Ok(None),
        };
        fs::create_dir_all(&dir)?;

        let mut store = Self {
            dir,
            max_files: config.max_files,
            max_size: config.max_file_size,
            max_interval_us: config.max_interval_secs.saturating_mul(1_000_000),
            slots: vec![None; config.max_files],
            file: None,
            current: None,
            current_size: 0,
            created_at_us: 0,
            next_generation: 0,
        };
        store.recover()?;
        store.create_file(clock)?;
        Ok(Some(store))
    }

    fn slot_of(&self, generation: u32) -> usize {
        (generation as u64 % self.max_files as u64) as usize
    }

    /// Rebuilds the slot table from the directory, keeping the highest
    /// generation per slot and deleting every other matching file.
    fn recover(&mut self) -> Result<()> {
        let mut highest: Option<u32> = None;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let os_name = entry.file_name();
            let Some((name, generation)) = os_name.to_str().and_then(FileName::parse) else {
                continue;
            };
            highest = Some(highest.map_or(generation, |max| max.max(generation)));

            let slot = self.slot_of(generation);
            let candidate = LogFileEntry {
                slot,
                name,
                generation,
            };
            let stale = match self.slots[slot] {
                None => {
                    self.slots[slot] = Some(candidate);
                    continue;
                }
                Some(occupant) if occupant.generation >= generation => candidate,
                Some(occupant) => {
                    self.slots[slot] = Some(candidate);
                    occupant
                }
            };
            self.remove_file(&stale);
        }

        self.next_generation = highest.map_or(0, |max| max.wrapping_add(1));
        debug!(
            dir = %self.dir.display(),
            recovered = self.entries().count(),
            next_generation = self.next_generation,
            "recovered log store"
        );
        Ok(())
    }

    /// Starts the file for `next_generation`, replacing the current one and
    /// evicting the previous occupant of its slot.
    fn create_file(&mut self, clock: &dyn Clock) -> Result<()> {
        let generation = self.next_generation;
        let name = FileName::render(generation, &clock.wall_clock());
        let path = self.dir.join(name.as_str());
        let file = File::create(&path)?;

        if let Some(mut previous) = self.file.replace(LineWriter::new(file)) {
            if let Err(err) = previous.flush() {
                warn!(error = %err, "failed to flush previous log file");
            }
        }

        let slot = self.slot_of(generation);
        if let Some(occupant) = self.slots[slot].take() {
            self.remove_file(&occupant);
        }
        let entry = LogFileEntry {
            slot,
            name,
            generation,
        };
        self.slots[slot] = Some(entry);
        self.current = Some(entry);
        self.next_generation = generation.wrapping_add(1);
        self.current_size = 0;
        self.created_at_us = clock.monotonic_us();

        debug!(path = %path.display(), generation, slot, "opened log file");
        Ok(())
    }

    fn remove_file(&self, entry: &LogFileEntry) {
        let path = self.dir.join(entry.name.as_str());
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed log file"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to remove log file"),
        }
    }

    /// Rotates when the current file is older than the interval or larger
    /// than the size limit. At most one new file per call; a failed
    /// rotation keeps writing to the current file.
    pub fn refresh(&mut self, clock: &dyn Clock) -> bool {
        let elapsed = clock.monotonic_us().saturating_sub(self.created_at_us);
        let expired = self.max_interval_us > 0 && elapsed > self.max_interval_us;
        let oversized = self.max_size > 0 && self.current_size > self.max_size;
        if !expired && !oversized {
            return false;
        }
        match self.create_file(clock) {
            Ok(()) => true,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "log rotation failed");
                false
            }
        }
    }

    /// Appends to the current file. Failures are reported and dropped.
    pub fn write(&mut self, bytes: &[u8]) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        match file.write_all(bytes) {
            Ok(()) => self.current_size += bytes.len() as u64,
            Err(err) => warn!(error = %err, "failed to write log file"),
        }
    }

    pub fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            if let Err(err) = file.flush() {
                warn!(error = %err, "failed to flush log file");
            }
        }
    }

    /// Flushes and closes the current file.
    pub fn close(mut self) {
        self.flush();
        self.file = None;
        debug!(dir = %self.dir.display(), "closed log store");
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn current(&self) -> Option<&LogFileEntry> {
        self.current.as_ref()
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.current.map(|entry| self.dir.join(entry.name.as_str()))
    }

    /// Bytes written to the current file since it was opened.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn next_generation(&self) -> u32 {
        self.next_generation
    }

    /// Occupied slots in slot order.
    pub fn entries(&self) -> impl Iterator<Item = &LogFileEntry> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 17)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_render_name() {
        let name = FileName::render(10, &at(15, 55, 5));
        assert_eq!(name.as_str(), "0000000a_20250417_155505.log");
    }

    #[test]
    fn test_parse_name() {
        let (name, generation) = FileName::parse("0000001f_20250417_155505.log").unwrap();
        assert_eq!(generation, 31);
        assert_eq!(name, FileName::render(31, &at(15, 55, 5)));
    }

    #[test]
    fn test_parse_rejects_near_misses() {
        for name in [
            "0000001f_20250417_155505.txt",
            "0000001f-20250417_155505.log",
            "0000001g_20250417_155505.log",
            "0000001f_2025041a_155505.log",
            "0000001f_20250417_155505.log.1",
            "1f_20250417_155505.log",
            "",
        ] {
            assert!(FileName::parse(name).is_none(), "{}", name);
        }
    }
}
