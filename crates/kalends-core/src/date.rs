//! Date markers, ranges and calendar units
//!
//! Provides the wall-clock date arithmetic every derivation leans on:
//! - `DateMarker` - A naive date-time in the calendar's own time zone
//! - `DateRange` - A half-open `[start, end)` range
//! - `OpenDateRange` - A range whose bounds may be missing (valid ranges)
//! - `Unit` - The calendar units a view can be measured in

use crate::duration::Duration;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A date-time expressed in the calendar's wall clock
pub type DateMarker = NaiveDateTime;

const MS_PER_DAY: i64 = 86_400_000;

/// Calendar units, from coarsest to finest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl Unit {
    /// Parse a unit name as used in option values
    pub fn parse(name: &str) -> Option<Unit> {
        match name.trim_end_matches('s') {
            "year" => Some(Unit::Year),
            "month" => Some(Unit::Month),
            "week" => Some(Unit::Week),
            "day" => Some(Unit::Day),
            "hour" => Some(Unit::Hour),
            "minute" => Some(Unit::Minute),
            "second" => Some(Unit::Second),
            "millisecond" => Some(Unit::Millisecond),
            _ => None,
        }
    }

    /// The option-facing name of this unit
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Year => "year",
            Unit::Month => "month",
            Unit::Week => "week",
            Unit::Day => "day",
            Unit::Hour => "hour",
            Unit::Minute => "minute",
            Unit::Second => "second",
            Unit::Millisecond => "millisecond",
        }
    }

    /// Units of a day or longer render as all-day ranges
    pub fn is_all_day(&self) -> bool {
        matches!(self, Unit::Year | Unit::Month | Unit::Week | Unit::Day)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A half-open range of date markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateMarker,
    pub end: DateMarker,
}

impl DateRange {
    pub fn new(start: DateMarker, end: DateMarker) -> Self {
        Self { start, end }
    }

    /// Whether `marker` falls inside `[start, end)`
    pub fn contains(&self, marker: DateMarker) -> bool {
        marker >= self.start && marker < self.end
    }

    /// Whether `other` lies entirely inside this range
    pub fn contains_range(&self, other: &DateRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// The overlap of two ranges, if any
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(DateRange { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whole days covered, rounding partial days up
    pub fn day_count(&self) -> i64 {
        let ms = (self.end - self.start).num_milliseconds();
        (ms + MS_PER_DAY - 1).div_euclid(MS_PER_DAY)
    }
}

/// A range whose start and/or end may be unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OpenDateRange {
    pub start: Option<DateMarker>,
    pub end: Option<DateMarker>,
}

impl OpenDateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, marker: DateMarker) -> bool {
        self.start.is_none_or(|start| marker >= start) && self.end.is_none_or(|end| marker < end)
    }

    /// Clamp a range into this one, `None` when they do not overlap
    pub fn constrain_range(&self, range: &DateRange) -> Option<DateRange> {
        let start = match self.start {
            Some(s) => range.start.max(s),
            None => range.start,
        };
        let end = match self.end {
            Some(e) => range.end.min(e),
            None => range.end,
        };
        (start < end).then_some(DateRange { start, end })
    }

    pub fn intersects(&self, range: &DateRange) -> bool {
        self.constrain_range(range).is_some()
    }

    /// Move a marker inside the range; the end bound is exclusive so markers past it land one ms before
    pub fn constrain_marker(&self, marker: DateMarker) -> DateMarker {
        if let Some(start) = self.start {
            if marker < start {
                return start;
            }
        }
        if let Some(end) = self.end {
            if marker >= end {
                return end - TimeDelta::milliseconds(1);
            }
        }
        marker
    }
}

/// Check whether `marker` is inside `range`
pub fn range_contains_marker(range: &DateRange, marker: DateMarker) -> bool {
    range.contains(marker)
}

/// Midnight of the marker's day
pub fn start_of_day(marker: DateMarker) -> DateMarker {
    marker.date().and_time(NaiveTime::MIN)
}

/// Shift by whole days; a result past chrono's range keeps `marker`
pub fn add_days(marker: DateMarker, days: i64) -> DateMarker {
    TimeDelta::try_days(days)
        .and_then(|delta| marker.checked_add_signed(delta))
        .unwrap_or(marker)
}

pub fn add_ms(marker: DateMarker, ms: i64) -> DateMarker {
    TimeDelta::try_milliseconds(ms)
        .and_then(|delta| marker.checked_add_signed(delta))
        .unwrap_or(marker)
}

/// Day of week with Sunday as 0
pub fn day_of_week(marker: DateMarker) -> u32 {
    marker.weekday().num_days_from_sunday()
}

/// Add whole months, clamping to the last valid day of the target month
pub fn add_months(marker: DateMarker, months: i32) -> DateMarker {
    let shifted = if months >= 0 {
        marker.checked_add_months(Months::new(months as u32))
    } else {
        marker.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(marker)
}

/// Add a calendar duration: months and years first, then days, then time
pub fn add_duration(marker: DateMarker, duration: &Duration) -> DateMarker {
    let months = duration.years.saturating_mul(12).saturating_add(duration.months);
    let marker = if months != 0 { add_months(marker, months) } else { marker };
    let marker = add_days(marker, duration.days as i64);
    add_ms(marker, duration.milliseconds)
}

pub fn subtract_duration(marker: DateMarker, duration: &Duration) -> DateMarker {
    add_duration(marker, &duration.negate())
}

/// Start of the week containing `marker`, weeks beginning on `first_day` (0 = Sunday)
pub fn start_of_week(marker: DateMarker, first_day: u32) -> DateMarker {
    let back = (day_of_week(marker) + 7 - first_day % 7) % 7;
    start_of_day(add_days(marker, -(back as i64)))
}

/// Truncate a marker to the start of a unit
pub fn start_of(marker: DateMarker, unit: Unit, first_day: u32) -> DateMarker {
    let date = marker.date();
    match unit {
        Unit::Year => ymd(date.year(), 1, 1),
        Unit::Month => ymd(date.year(), date.month(), 1),
        Unit::Week => start_of_week(marker, first_day),
        Unit::Day => start_of_day(marker),
        Unit::Hour => date.and_hms_opt(marker.hour(), 0, 0).unwrap_or(marker),
        Unit::Minute => date
            .and_hms_opt(marker.hour(), marker.minute(), 0)
            .unwrap_or(marker),
        Unit::Second => date
            .and_hms_opt(marker.hour(), marker.minute(), marker.second())
            .unwrap_or(marker),
        Unit::Millisecond => marker,
    }
}

fn ymd(year: i32, month: u32, day: u32) -> DateMarker {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// Whole months between two markers, if they are exactly whole
pub fn diff_whole_months(start: DateMarker, end: DateMarker) -> Option<i32> {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    (add_months(start, months) == end).then_some(months)
}

/// Whole days between two markers, if they are exactly whole
pub fn diff_whole_days(start: DateMarker, end: DateMarker) -> Option<i64> {
    let ms = (end - start).num_milliseconds();
    (ms % MS_PER_DAY == 0).then_some(ms / MS_PER_DAY)
}

/// The coarsest unit that evenly divides the span from `start` to `end`
pub fn greatest_unit_between(start: DateMarker, end: DateMarker) -> (Unit, i64) {
    if let Some(months) = diff_whole_months(start, end) {
        if months != 0 && months % 12 == 0 {
            return (Unit::Year, (months / 12) as i64);
        }
        if months != 0 {
            return (Unit::Month, months as i64);
        }
    }
    if let Some(days) = diff_whole_days(start, end) {
        if days != 0 && days % 7 == 0 {
            return (Unit::Week, days / 7);
        }
        return (Unit::Day, days);
    }
    let ms = (end - start).num_milliseconds();
    Duration::ms(ms).greatest_unit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateMarker {
        ymd(y, m, d)
    }

    #[test]
    fn test_range_is_half_open() {
        let range = DateRange::new(at(2024, 1, 1), at(2024, 1, 2));
        assert!(range.contains(at(2024, 1, 1)));
        assert!(!range.contains(at(2024, 1, 2)));
    }

    #[test]
    fn test_start_of_week_respects_first_day() {
        // 2024-01-03 is a Wednesday
        let wed = at(2024, 1, 3);
        assert_eq!(start_of_week(wed, 0), at(2023, 12, 31));
        assert_eq!(start_of_week(wed, 1), at(2024, 1, 1));
    }

    #[test]
    fn test_add_months_clamps() {
        assert_eq!(add_months(at(2024, 1, 31), 1), at(2024, 2, 29));
        assert_eq!(add_months(at(2024, 3, 15), -2), at(2024, 1, 15));
    }

    #[test]
    fn test_out_of_range_shift_keeps_marker() {
        let marker = at(2024, 5, 15);
        assert_eq!(add_days(marker, 100_000_000), marker);
        assert_eq!(add_days(marker, i64::MIN), marker);
        assert_eq!(add_ms(marker, i64::MAX), marker);
        assert_eq!(add_duration(marker, &Duration::days(i32::MAX)), marker);
        assert_eq!(add_days(marker, 2), at(2024, 5, 17));
    }

    #[test]
    fn test_open_range_constrain_marker() {
        let valid = OpenDateRange {
            start: Some(at(2024, 1, 1)),
            end: Some(at(2024, 2, 1)),
        };
        assert_eq!(valid.constrain_marker(at(2023, 6, 1)), at(2024, 1, 1));
        assert!(valid.contains(valid.constrain_marker(at(2025, 1, 1))));
    }

    #[test]
    fn test_greatest_unit_between() {
        assert_eq!(greatest_unit_between(at(2024, 1, 1), at(2024, 2, 1)), (Unit::Month, 1));
        assert_eq!(greatest_unit_between(at(2024, 1, 1), at(2024, 1, 15)), (Unit::Week, 2));
        assert_eq!(greatest_unit_between(at(2024, 1, 1), at(2024, 1, 4)), (Unit::Day, 3));
        assert_eq!(greatest_unit_between(at(2024, 1, 1), at(2026, 1, 1)), (Unit::Year, 2));
    }
}
