//! Calendar durations
//!
//! A calendar duration keeps years, months and days apart from clock time,
//! since a month is not a fixed number of milliseconds.

use crate::date::Unit;
use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

/// A duration measured in calendar units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Duration {
    pub years: i32,
    pub months: i32,
    pub days: i32,
    pub milliseconds: i64,
    /// Whether the input was given in weeks (so "week" wins over "day" as the unit)
    #[serde(default)]
    pub specified_weeks: bool,
}

impl Duration {
    pub fn years(n: i32) -> Self {
        Self { years: n, ..Self::default() }
    }

    pub fn months(n: i32) -> Self {
        Self { months: n, ..Self::default() }
    }

    pub fn weeks(n: i32) -> Self {
        Self { days: n * 7, specified_weeks: true, ..Self::default() }
    }

    pub fn days(n: i32) -> Self {
        Self { days: n, ..Self::default() }
    }

    pub fn ms(n: i64) -> Self {
        Self { milliseconds: n, ..Self::default() }
    }

    pub fn hours(n: i64) -> Self {
        Self::ms(n * MS_PER_HOUR)
    }

    /// One of the given unit
    pub fn one(unit: Unit) -> Self {
        match unit {
            Unit::Year => Self::years(1),
            Unit::Month => Self::months(1),
            Unit::Week => Self::weeks(1),
            Unit::Day => Self::days(1),
            Unit::Hour => Self::ms(MS_PER_HOUR),
            Unit::Minute => Self::ms(MS_PER_MINUTE),
            Unit::Second => Self::ms(MS_PER_SECOND),
            Unit::Millisecond => Self::ms(1),
        }
    }

    /// A duration of `n` of the given unit; counts that overflow a field are errors
    pub fn create(n: i64, unit: Unit) -> Result<Self> {
        let overflow = || Error::InvalidDuration(format!("{n} {unit:?} is out of range"));
        let count = || i32::try_from(n).map_err(|_| overflow());
        let scaled = |per: i64| n.checked_mul(per).map(Self::ms).ok_or_else(overflow);
        match unit {
            Unit::Year => Ok(Self::years(count()?)),
            Unit::Month => Ok(Self::months(count()?)),
            Unit::Week => {
                let days = count()?.checked_mul(7).ok_or_else(overflow)?;
                Ok(Self { days, specified_weeks: true, ..Self::default() })
            }
            Unit::Day => Ok(Self::days(count()?)),
            Unit::Hour => scaled(MS_PER_HOUR),
            Unit::Minute => scaled(MS_PER_MINUTE),
            Unit::Second => scaled(MS_PER_SECOND),
            Unit::Millisecond => Ok(Self::ms(n)),
        }
    }

    /// Parse a duration from an option value
    ///
    /// Accepts a map of unit names (`{"days": 4}`), a clock string
    /// (`"09:30"`, `"24:00:00"`, `"1.02:00"` for one day two hours) or an integer
    /// number of milliseconds.
    pub fn from_value(value: &Value) -> Result<Duration> {
        match value {
            Value::Int(ms) => Ok(Duration::ms(*ms)),
            Value::String(s) => Self::parse_str(s),
            Value::Map(map) => {
                let mut dur = Duration::default();
                for (key, v) in map {
                    let n = v
                        .as_int()
                        .ok_or_else(|| Error::InvalidDuration(format!("{}: {}", key, v)))?;
                    let unit = Unit::parse(key)
                        .ok_or_else(|| Error::InvalidDuration(format!("unknown unit {}", key)))?;
                    dur = dur
                        .checked_plus(&Duration::create(n, unit)?)
                        .ok_or_else(|| Error::InvalidDuration(value.to_string()))?;
                }
                Ok(dur)
            }
            other => Err(Error::InvalidDuration(other.to_string())),
        }
    }

    /// Parse `[D.]HH:MM[:SS[.mmm]]`
    pub fn parse_str(s: &str) -> Result<Duration> {
        let invalid = || Error::InvalidDuration(s.to_string());
        let (days, clock) = match s.split_once('.') {
            Some((d, rest)) if rest.contains(':') => (d.parse::<i32>().map_err(|_| invalid())?, rest),
            _ => (0, s),
        };
        let (clock, millis) = match clock.split_once('.') {
            Some((c, ms)) => (c, ms.parse::<i64>().map_err(|_| invalid())?),
            None => (clock, 0),
        };
        let mut parts = clock.split(':');
        let mut next = |required: bool| -> Result<i64> {
            match parts.next() {
                Some(p) => p.parse::<i64>().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let hours = next(true)?;
        let minutes = next(true)?;
        let seconds = next(false)?;
        Ok(Duration {
            days,
            milliseconds: hours * MS_PER_HOUR + minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis,
            ..Duration::default()
        })
    }

    pub fn plus(&self, other: &Duration) -> Duration {
        Duration {
            years: self.years + other.years,
            months: self.months + other.months,
            days: self.days + other.days,
            milliseconds: self.milliseconds + other.milliseconds,
            specified_weeks: self.specified_weeks || other.specified_weeks,
        }
    }

    pub fn checked_plus(&self, other: &Duration) -> Option<Duration> {
        Some(Duration {
            years: self.years.checked_add(other.years)?,
            months: self.months.checked_add(other.months)?,
            days: self.days.checked_add(other.days)?,
            milliseconds: self.milliseconds.checked_add(other.milliseconds)?,
            specified_weeks: self.specified_weeks || other.specified_weeks,
        })
    }

    pub fn negate(&self) -> Duration {
        Duration {
            years: self.years.saturating_neg(),
            months: self.months.saturating_neg(),
            days: self.days.saturating_neg(),
            milliseconds: self.milliseconds.saturating_neg(),
            specified_weeks: self.specified_weeks,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0 && self.milliseconds == 0
    }

    /// Approximate length, counting a year as 365 days and a month as 30
    pub fn as_rough_ms(&self) -> i64 {
        self.years as i64 * 365 * MS_PER_DAY
            + self.months as i64 * 30 * MS_PER_DAY
            + self.days as i64 * MS_PER_DAY
            + self.milliseconds
    }

    pub fn as_rough_days(&self) -> f64 {
        self.as_rough_ms() as f64 / MS_PER_DAY as f64
    }

    /// The largest unit that divides this duration evenly, with its count
    pub fn greatest_unit(&self) -> (Unit, i64) {
        let ms = self.milliseconds;
        if ms != 0 {
            let total = self.days as i64 * MS_PER_DAY + ms;
            if total % MS_PER_SECOND != 0 {
                return (Unit::Millisecond, total);
            }
            if total % MS_PER_MINUTE != 0 {
                return (Unit::Second, total / MS_PER_SECOND);
            }
            if total % MS_PER_HOUR != 0 {
                return (Unit::Minute, total / MS_PER_MINUTE);
            }
            return (Unit::Hour, total / MS_PER_HOUR);
        }
        if self.days != 0 {
            if self.specified_weeks && self.days % 7 == 0 {
                return (Unit::Week, (self.days / 7) as i64);
            }
            return (Unit::Day, self.days as i64);
        }
        if self.months != 0 {
            return (Unit::Month, self.months as i64);
        }
        if self.years != 0 {
            return (Unit::Year, self.years as i64);
        }
        (Unit::Millisecond, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_map;

    #[test]
    fn test_parse_clock_strings() {
        assert_eq!(Duration::parse_str("09:30").unwrap(), Duration::ms(9 * MS_PER_HOUR + 30 * MS_PER_MINUTE));
        assert_eq!(Duration::parse_str("24:00:00").unwrap(), Duration::hours(24));
        let with_days = Duration::parse_str("1.02:00").unwrap();
        assert_eq!(with_days.days, 1);
        assert_eq!(with_days.milliseconds, 2 * MS_PER_HOUR);
        assert!(Duration::parse_str("noon").is_err());
    }

    #[test]
    fn test_from_map_value() {
        let dur = Duration::from_value(&Value::Map(value_map! { "weeks" => 2i64 })).unwrap();
        assert_eq!(dur.days, 14);
        assert_eq!(dur.greatest_unit(), (Unit::Week, 2));
    }

    #[test]
    fn test_oversized_counts_are_errors() {
        let too_many_days = Value::Map(value_map! { "days" => 5_000_000_000i64 });
        assert!(matches!(Duration::from_value(&too_many_days), Err(Error::InvalidDuration(_))));
        assert!(Duration::create(i64::MAX, Unit::Hour).is_err());
        assert!(Duration::create(i64::from(i32::MAX), Unit::Week).is_err());
        assert_eq!(Duration::create(3, Unit::Week).unwrap(), Duration::weeks(3));
    }

    #[test]
    fn test_greatest_unit() {
        assert_eq!(Duration::days(4).greatest_unit(), (Unit::Day, 4));
        assert_eq!(Duration::months(1).greatest_unit(), (Unit::Month, 1));
        assert_eq!(Duration::hours(3).greatest_unit(), (Unit::Hour, 3));
        assert_eq!(Duration::ms(1500).greatest_unit(), (Unit::Millisecond, 1500));
    }

    #[test]
    fn test_rough_days() {
        assert_eq!(Duration::weeks(1).as_rough_days(), 7.0);
        assert!(Duration::hours(12).as_rough_days() < 1.0);
    }
}
