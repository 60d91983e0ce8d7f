//! Weekly recurrence descriptor.
//!
//! # Responsibility
//! - Describe the (day-of-week, local time, UTC offset) triple of an event.
//! - Reject malformed descriptors before any time arithmetic runs.
//!
//! # Invariants
//! - `day_of_week` is in `0..=6` with Sunday = 0.
//! - `hour` is in `0..=23`, `minute` is in `0..=59`.
//! - `|utc_offset_minutes| <= 840` (UTC-14:00 ..= UTC+14:00).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Largest accepted distance from UTC, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Local wall-clock time of an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Parses `HH:MM` (24h). Range checks are left to `RecurrenceDescriptor::validate`.
    pub fn parse(value: &str) -> Option<Self> {
        let (hour, minute) = value.trim().split_once(':')?;
        Some(Self {
            hour: hour.parse().ok()?,
            minute: minute.parse().ok()?,
        })
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Weekly cadence of an event: same weekday, same local time, every 7 days.
///
/// The local time zone is a fixed offset. There is no daylight-saving
/// adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceDescriptor {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u32,
    pub time_of_day: TimeOfDay,
    /// Signed minutes east of UTC (`+120` for UTC+2).
    pub utc_offset_minutes: i32,
}

impl RecurrenceDescriptor {
    pub fn new(day_of_week: u32, time_of_day: TimeOfDay, utc_offset_minutes: i32) -> Self {
        Self {
            day_of_week,
            time_of_day,
            utc_offset_minutes,
        }
    }

    /// Validates every field and reports the first one out of range.
    pub fn validate(&self) -> Result<(), RecurrenceError> {
        if self.day_of_week > 6 {
            return Err(RecurrenceError::DayOfWeek(self.day_of_week));
        }
        if self.time_of_day.hour > 23 {
            return Err(RecurrenceError::Hour(self.time_of_day.hour));
        }
        if self.time_of_day.minute > 59 {
            return Err(RecurrenceError::Minute(self.time_of_day.minute));
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(RecurrenceError::UtcOffset(self.utc_offset_minutes));
        }
        Ok(())
    }
}

/// Malformed recurrence descriptor, or an instant too close to the
/// representable edges to carry an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceError {
    DayOfWeek(u32),
    Hour(u32),
    Minute(u32),
    UtcOffset(i32),
    OutOfRange(DateTime<Utc>),
}

impl Display for RecurrenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DayOfWeek(value) => {
                write!(f, "day_of_week must be within 0..=6 (Sunday=0), got {value}")
            }
            Self::Hour(value) => write!(f, "hour must be within 0..=23, got {value}"),
            Self::Minute(value) => write!(f, "minute must be within 0..=59, got {value}"),
            Self::UtcOffset(value) => write!(
                f,
                "utc_offset_minutes must be within -{MAX_UTC_OFFSET_MINUTES}..={MAX_UTC_OFFSET_MINUTES}, got {value}"
            ),
            Self::OutOfRange(now) => {
                write!(f, "no occurrence representable around {}", now.to_rfc3339())
            }
        }
    }
}

impl Error for RecurrenceError {}
