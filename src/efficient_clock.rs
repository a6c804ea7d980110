//! Time sources for log prefixes and file rotation.
//!
//! The logger needs two clocks: a monotonic microsecond counter for
//! `[secs.usecs]` prefixes and interval-based rotation, and calendar time
//! for wall-clock prefixes and log file names. Both sit behind [`Clock`]
//! so tests can drive rotation deterministically with a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use lazy_static::lazy_static;
use parking_lot::Mutex;

lazy_static! {
    /// Anchor of the monotonic clock, fixed the first time it is read.
    static ref PROCESS_EPOCH: Instant = Instant::now();
}

/// Source of monotonic and calendar time.
pub trait Clock: Send + Sync {
    /// Microseconds since an arbitrary, fixed epoch. Never decreases.
    fn monotonic_us(&self) -> u64;

    /// Local calendar time.
    fn wall_clock(&self) -> NaiveDateTime;
}

/// The process clocks: [`get_timestamp`] and the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline(always)]
    fn monotonic_us(&self) -> u64 {
        get_timestamp()
    }

    fn wall_clock(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Returns microseconds elapsed since the process epoch.
///
/// # Examples
///
/// ```
/// # use dbg_logger::efficient_clock::get_timestamp;
/// let first = get_timestamp();
/// let second = get_timestamp();
/// assert!(second >= first);
/// ```
#[inline(always)]
pub fn get_timestamp() -> u64 {
    PROCESS_EPOCH.elapsed().as_micros() as u64
}

/// Clock that only moves when told to.
///
/// [`ManualClock::advance`] moves both time sources together, which is
/// what size- and interval-rotation tests need.
///
/// # Examples
///
/// ```
/// # use dbg_logger::efficient_clock::{Clock, ManualClock};
/// # use std::time::Duration;
/// let start = chrono::NaiveDate::from_ymd_opt(2025, 4, 17)
///     .unwrap()
///     .and_hms_opt(15, 55, 5)
///     .unwrap();
/// let clock = ManualClock::new(start);
/// clock.advance(Duration::from_secs(2));
/// assert_eq!(clock.monotonic_us(), 2_000_000);
/// assert_eq!(clock.wall_clock(), start + chrono::Duration::seconds(2));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now_us: AtomicU64,
    wall: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now_us: AtomicU64::new(0),
            wall: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_us.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
        let mut wall = self.wall.lock();
        if let Ok(step) = chrono::Duration::from_std(by) {
            *wall += step;
        }
    }

    /// Moves calendar time only; the monotonic counter is untouched.
    pub fn set_wall_clock(&self, at: NaiveDateTime) {
        *self.wall.lock() = at;
    }
}

impl Clock for ManualClock {
    fn monotonic_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }

    fn wall_clock(&self) -> NaiveDateTime {
        *self.wall.lock()
    }
}
