//! Previous/next occurrence computation for weekly recurrences.
//!
//! # Invariants
//! - `previous_occurrence(now) <= now < next_occurrence(now)`.
//! - An occurrence exactly at `now` is "previous", never "next".
//! - Consecutive occurrences are exactly `OCCURRENCE_PERIOD` apart.

use crate::model::recurrence::{RecurrenceDescriptor, RecurrenceError};
use chrono::{DateTime, Datelike, Days, NaiveTime, TimeDelta, Utc};

/// Distance between two occurrences of the same descriptor.
pub const OCCURRENCE_PERIOD: TimeDelta = TimeDelta::days(7);

/// Returns the latest occurrence instant `<= now`.
///
/// # Errors
/// - `RecurrenceError` when the descriptor is out of range.
/// - `RecurrenceError::OutOfRange` when no such occurrence is representable,
///   which only happens near `DateTime::<Utc>::MIN_UTC`/`MAX_UTC`.
pub fn previous_occurrence(
    now: DateTime<Utc>,
    recurrence: &RecurrenceDescriptor,
) -> Result<DateTime<Utc>, RecurrenceError> {
    recurrence.validate()?;
    let out_of_range = RecurrenceError::OutOfRange(now);

    let offset = TimeDelta::minutes(i64::from(recurrence.utc_offset_minutes));
    let local_now = now
        .naive_utc()
        .checked_add_signed(offset)
        .ok_or(out_of_range)?;
    let local_date = local_now.date();
    let days_back = (local_date.weekday().num_days_from_sunday() + 7 - recurrence.day_of_week) % 7;

    // Fields are range-checked by `validate` above.
    let time = NaiveTime::from_hms_opt(recurrence.time_of_day.hour, recurrence.time_of_day.minute, 0)
        .ok_or(RecurrenceError::Hour(recurrence.time_of_day.hour))?;
    let date = local_date
        .checked_sub_days(Days::new(u64::from(days_back)))
        .ok_or(out_of_range)?;

    let mut candidate = date
        .and_time(time)
        .checked_sub_signed(offset)
        .ok_or(out_of_range)?
        .and_utc();
    while candidate > now {
        candidate = candidate
            .checked_sub_signed(OCCURRENCE_PERIOD)
            .ok_or(out_of_range)?;
    }
    // An overflowing step lies past `now` by definition.
    while let Some(later) = candidate
        .checked_add_signed(OCCURRENCE_PERIOD)
        .filter(|later| *later <= now)
    {
        candidate = later;
    }
    Ok(candidate)
}

/// Returns the earliest occurrence instant `> now`.
///
/// # Errors
/// - `RecurrenceError` when the descriptor is out of range.
/// - `RecurrenceError::OutOfRange` when no such occurrence is representable.
pub fn next_occurrence(
    now: DateTime<Utc>,
    recurrence: &RecurrenceDescriptor,
) -> Result<DateTime<Utc>, RecurrenceError> {
    previous_occurrence(now, recurrence)?
        .checked_add_signed(OCCURRENCE_PERIOD)
        .ok_or(RecurrenceError::OutOfRange(now))
}

#[cfg(test)]
mod tests {
    use super::{next_occurrence, previous_occurrence, OCCURRENCE_PERIOD};
    use crate::model::recurrence::{RecurrenceDescriptor, RecurrenceError, TimeOfDay};
    use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};

    fn at(offset_hours: i32, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn wednesday_evening_utc_plus_two() -> RecurrenceDescriptor {
        RecurrenceDescriptor::new(3, TimeOfDay::new(19, 0), 120)
    }

    #[test]
    fn thursday_morning_sees_wednesday_evening_as_previous() {
        // 2024-05-15 is a Wednesday.
        let recurrence = wednesday_evening_utc_plus_two();
        let now = at(2, 2024, 5, 16, 8, 0);

        let previous = previous_occurrence(now, &recurrence).unwrap();
        let next = next_occurrence(now, &recurrence).unwrap();

        assert_eq!(previous, at(2, 2024, 5, 15, 19, 0));
        assert_eq!(next, at(2, 2024, 5, 22, 19, 0));
    }

    #[test]
    fn occurrence_instant_is_its_own_previous() {
        let recurrence = wednesday_evening_utc_plus_two();
        let boundary = at(2, 2024, 5, 15, 19, 0);

        assert_eq!(previous_occurrence(boundary, &recurrence).unwrap(), boundary);
        assert_eq!(
            next_occurrence(boundary, &recurrence).unwrap(),
            boundary + OCCURRENCE_PERIOD
        );
    }

    #[test]
    fn same_weekday_before_start_time_goes_back_a_week() {
        let recurrence = wednesday_evening_utc_plus_two();
        let now = at(2, 2024, 5, 15, 18, 59);

        assert_eq!(
            previous_occurrence(now, &recurrence).unwrap(),
            at(2, 2024, 5, 8, 19, 0)
        );
        assert_eq!(
            next_occurrence(now, &recurrence).unwrap(),
            at(2, 2024, 5, 15, 19, 0)
        );
    }

    #[test]
    fn local_weekday_differs_from_utc_weekday() {
        // Monday 01:30 at UTC+14 is still Sunday 11:30 UTC.
        let recurrence = RecurrenceDescriptor::new(1, TimeOfDay::new(1, 30), 840);
        let now = Utc.with_ymd_and_hms(2024, 5, 12, 12, 0, 0).unwrap();

        let previous = previous_occurrence(now, &recurrence).unwrap();
        assert_eq!(previous, Utc.with_ymd_and_hms(2024, 5, 12, 11, 30, 0).unwrap());

        // Saturday 22:00 at UTC-12 is Sunday 10:00 UTC.
        let western = RecurrenceDescriptor::new(6, TimeOfDay::new(22, 0), -720);
        let previous = previous_occurrence(now, &western).unwrap();
        assert_eq!(previous, Utc.with_ymd_and_hms(2024, 5, 12, 10, 0, 0).unwrap());
    }

    #[test]
    fn bracketing_and_weekly_gap_hold_across_a_sweep() {
        let descriptors = [
            RecurrenceDescriptor::new(0, TimeOfDay::new(0, 0), 0),
            RecurrenceDescriptor::new(3, TimeOfDay::new(19, 0), 120),
            RecurrenceDescriptor::new(5, TimeOfDay::new(23, 45), -570),
            RecurrenceDescriptor::new(6, TimeOfDay::new(6, 15), 840),
        ];
        let start = Utc.with_ymd_and_hms(2023, 12, 28, 0, 0, 0).unwrap();

        for recurrence in &descriptors {
            for step in 0..(24 * 16) {
                let now = start + TimeDelta::minutes(37 * step);
                let previous = previous_occurrence(now, recurrence).unwrap();
                let next = next_occurrence(now, recurrence).unwrap();

                assert!(previous <= now, "{recurrence:?} at {now}");
                assert!(now < next, "{recurrence:?} at {now}");
                assert_eq!(next - previous, OCCURRENCE_PERIOD);
                assert_eq!(next_occurrence(previous, recurrence).unwrap(), next);
            }
        }
    }

    #[test]
    fn invalid_descriptor_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap();
        let bad = RecurrenceDescriptor::new(3, TimeOfDay::new(24, 0), 0);
        assert_eq!(
            previous_occurrence(now, &bad),
            Err(RecurrenceError::Hour(24))
        );
        let bad_offset = RecurrenceDescriptor::new(3, TimeOfDay::new(19, 0), 900);
        assert_eq!(
            next_occurrence(now, &bad_offset),
            Err(RecurrenceError::UtcOffset(900))
        );
    }

    #[test]
    fn representable_edges_report_out_of_range_instead_of_panicking() {
        let far_east = RecurrenceDescriptor::new(3, TimeOfDay::new(19, 0), 840);
        let utc = RecurrenceDescriptor::new(3, TimeOfDay::new(19, 0), 0);
        let max = DateTime::<Utc>::MAX_UTC;
        let min = DateTime::<Utc>::MIN_UTC;

        assert_eq!(
            previous_occurrence(max, &far_east),
            Err(RecurrenceError::OutOfRange(max))
        );
        assert_eq!(
            previous_occurrence(min, &utc),
            Err(RecurrenceError::OutOfRange(min))
        );
        assert_eq!(
            next_occurrence(max, &utc),
            Err(RecurrenceError::OutOfRange(max))
        );

        // The last occurrence before the upper edge still exists.
        let previous = previous_occurrence(max, &utc).unwrap();
        assert!(previous <= max);
        assert!(max - previous < OCCURRENCE_PERIOD);
    }
}
