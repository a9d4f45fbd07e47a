//! Time provider abstraction
//!
//! This module provides a [`Clock`] trait that abstracts over time sources,
//! allowing production code to use real system time while tests can use
//! controllable mock time. Calendar-day helpers live here because streak
//! accounting counts local calendar days, not elapsed time.

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDate, TimeZone};

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;

    /// Returns the current time as an RFC3339-formatted string.
    fn now_rfc3339(&self) -> String {
        chrono::Utc
            .timestamp_millis_opt(self.now_millis() as i64)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string())
    }

    /// Returns the current calendar date in the local timezone.
    ///
    /// Streaks count consecutive local days, so two instants on the same
    /// local date are the same "study day" regardless of elapsed time.
    fn today_local(&self) -> NaiveDate {
        Local
            .timestamp_millis_opt(self.now_millis() as i64)
            .single()
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Test clock with manually controlled time.
///
/// Unlike a real clock, time only moves when a test calls [`FixedClock::set`]
/// or one of the advance methods. Days advance in 24-hour steps, which keeps
/// calendar assertions stable in any local timezone as long as the base time
/// sits mid-day.
///
/// # Example
///
/// ```
/// use ulpan::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1_704_110_400_000); // 2024-01-01 12:00:00 UTC
/// let day_one = clock.today_local();
/// clock.advance_days(1);
/// assert_eq!(clock.today_local(), day_one.succ_opt().unwrap());
/// ```
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct FixedClock {
    millis: Mutex<u64>,
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a new fixed clock with the given initial time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Mutex::new(millis),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: u64) {
        *self.millis.lock().unwrap() += ms;
    }

    /// Advance the clock by whole 24-hour days.
    pub fn advance_days(&self, days: u64) {
        self.advance(days * 24 * 60 * 60 * 1000);
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        *self.millis.lock().unwrap() = ms;
    }

    /// Get the current time without any side effects.
    pub fn get(&self) -> u64 {
        *self.millis.lock().unwrap()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.get()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 12:00:00 UTC. Mid-day base: whole-day advances land
        // exactly one local calendar day apart in any fixed offset.
        Self::new(1_704_110_400_000)
    }
}
