//! Wall-clock source for capture timestamps.
//!
//! The pipeline takes its timestamp from an injected [`Clock`] so tests can
//! pin the hour (and therefore the lighting bucket).

use chrono::{Local, NaiveDateTime, SubsecRound, Timelike};

/// Source of the local wall-clock time.
pub trait Clock {
    /// Current local time, truncated to whole seconds.
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(0)
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Clock fixed at `hour`:00:00 on an arbitrary date.
    #[must_use]
    pub fn at_hour(hour: u32) -> Self {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 21).unwrap_or_default();
        let time = chrono::NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap_or_default();
        Self(NaiveDateTime::new(date, time))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0.trunc_subsecs(0)
    }
}

/// Hour of day (0-23) of a timestamp.
#[must_use]
pub fn hour_of(ts: &NaiveDateTime) -> u32 {
    ts.hour()
}

/// `YYYYMMDD_HHMMSS` stamp used in output file names.
#[must_use]
pub fn file_stamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y%m%d_%H%M%S").to_string()
}

/// `YYYY-MM-DD HH:MM:SS` stamp used in log lines.
#[must_use]
pub fn log_stamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
