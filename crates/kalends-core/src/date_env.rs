//! Date environment: time zone, locale and week rules bundled together
//!
//! Date markers are wall-clock values. The environment is what knows how a
//! marker maps to an absolute instant, which is needed when raw event input
//! carries an explicit offset and when the calendar's time zone changes.

use crate::date::{self, DateMarker, Unit};
use crate::duration::Duration;
use crate::locale::Locale;
use crate::value::Value;
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::fmt;
use std::rc::Rc;

/// Named time zone support supplied by a plugin
pub trait NamedTimeZoneImpl {
    /// Offset from UTC in minutes for a wall-clock marker in `zone`
    fn offset_for_marker(&self, zone: &str, marker: DateMarker) -> Option<i32>;

    /// Wall-clock marker in `zone` for an absolute instant
    fn marker_for_utc(&self, zone: &str, instant: DateTime<Utc>) -> Option<DateMarker>;
}

/// A parsed date input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub marker: DateMarker,
    /// Date-only input (no time part)
    pub is_all_day: bool,
    /// Offset in minutes carried by the input, when it had one
    pub forced_tz_offset: Option<i32>,
}

/// Parse ISO8601-ish strings: dates, local date-times and date-times with offsets
pub fn parse_iso(input: &str) -> Option<ParsedDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(ParsedDate {
            marker: date.and_time(NaiveTime::MIN),
            is_all_day: true,
            forced_tz_offset: None,
        });
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(input) {
        return Some(ParsedDate {
            marker: with_offset.naive_local(),
            is_all_day: false,
            forced_tz_offset: Some(with_offset.offset().local_minus_utc() / 60),
        });
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(marker) = NaiveDateTime::parse_from_str(input, pattern) {
            return Some(ParsedDate {
                marker,
                is_all_day: false,
                forced_tz_offset: None,
            });
        }
    }
    None
}

#[derive(Clone)]
enum Zone {
    Local,
    Utc,
    Fixed(FixedOffset),
    Named(Tz),
    Plugin(String, Rc<dyn NamedTimeZoneImpl>),
    /// Unknown zone: markers are treated as UTC and offsets cannot be computed
    Coerced,
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => write!(f, "Local"),
            Zone::Utc => write!(f, "Utc"),
            Zone::Fixed(offset) => write!(f, "Fixed({})", offset),
            Zone::Named(tz) => write!(f, "Named({})", tz.name()),
            Zone::Plugin(name, _) => write!(f, "Plugin({})", name),
            Zone::Coerced => write!(f, "Coerced"),
        }
    }
}

/// Inputs for building a [`DateEnv`]
#[derive(Clone)]
pub struct DateEnvSettings {
    pub time_zone: String,
    pub locale: Rc<Locale>,
    pub week_number_calculation: String,
    /// Explicit first day of week; the locale's is used when missing
    pub first_day: Option<u32>,
    pub week_text: Option<String>,
    pub named_time_zone_impl: Option<Rc<dyn NamedTimeZoneImpl>>,
}

/// Time zone, locale and week settings used by every date computation
#[derive(Debug, Clone)]
pub struct DateEnv {
    pub time_zone: String,
    zone: Zone,
    pub locale: Rc<Locale>,
    pub week_number_calculation: String,
    /// First day of week, 0 = Sunday
    pub first_day: u32,
    pub week_text: String,
}

impl DateEnv {
    pub fn new(settings: DateEnvSettings) -> Self {
        let zone = resolve_zone(&settings.time_zone, settings.named_time_zone_impl);
        let first_day = settings.first_day.unwrap_or(settings.locale.week_dow) % 7;
        let week_text = settings
            .week_text
            .or_else(|| settings.locale.options.get_str("weekText").map(str::to_string))
            .unwrap_or_else(|| "W".to_string());

        Self {
            time_zone: settings.time_zone,
            zone,
            locale: settings.locale,
            week_number_calculation: settings.week_number_calculation,
            first_day,
            week_text,
        }
    }

    /// Whether markers can be converted to absolute instants
    pub fn can_compute_offset(&self) -> bool {
        !matches!(self.zone, Zone::Coerced)
    }

    /// Absolute instant of a marker; a forced offset overrides the zone
    pub fn to_utc(&self, marker: DateMarker, forced_tz_offset: Option<i32>) -> DateTime<Utc> {
        if let Some(minutes) = forced_tz_offset {
            return Utc.from_utc_datetime(&(marker - TimeDelta::minutes(minutes as i64)));
        }
        let utc_naive = match &self.zone {
            Zone::Local => Local
                .from_local_datetime(&marker)
                .earliest()
                .map(|dt| dt.naive_utc()),
            Zone::Utc | Zone::Coerced => Some(marker),
            Zone::Fixed(offset) => Some(marker - TimeDelta::seconds(offset.local_minus_utc() as i64)),
            Zone::Named(tz) => tz
                .from_local_datetime(&marker)
                .earliest()
                .map(|dt| dt.naive_utc()),
            Zone::Plugin(name, imp) => imp
                .offset_for_marker(name, marker)
                .map(|minutes| marker - TimeDelta::minutes(minutes as i64)),
        };
        Utc.from_utc_datetime(&utc_naive.unwrap_or(marker))
    }

    /// Wall-clock marker for an absolute instant
    pub fn marker_from_utc(&self, instant: DateTime<Utc>) -> DateMarker {
        match &self.zone {
            Zone::Local => instant.with_timezone(&Local).naive_local(),
            Zone::Utc | Zone::Coerced => instant.naive_utc(),
            Zone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
            Zone::Named(tz) => instant.with_timezone(tz).naive_local(),
            Zone::Plugin(name, imp) => imp
                .marker_for_utc(name, instant)
                .unwrap_or_else(|| instant.naive_utc()),
        }
    }

    /// Turn a raw date input into a marker in this environment
    ///
    /// Inputs that carry an offset are shifted into the calendar's zone when
    /// the zone can compute offsets; otherwise the offset is kept alongside.
    pub fn create_marker(&self, input: &Value) -> Option<ParsedDate> {
        let parsed = match input {
            Value::Date(d) => ParsedDate {
                marker: *d,
                is_all_day: false,
                forced_tz_offset: None,
            },
            Value::String(s) => parse_iso(s)?,
            Value::Int(ms) => ParsedDate {
                marker: self.marker_from_utc(DateTime::<Utc>::from_timestamp_millis(*ms)?),
                is_all_day: false,
                forced_tz_offset: None,
            },
            _ => return None,
        };

        match parsed.forced_tz_offset {
            Some(offset) if self.can_compute_offset() => Some(ParsedDate {
                marker: self.marker_from_utc(self.to_utc(parsed.marker, Some(offset))),
                forced_tz_offset: None,
                ..parsed
            }),
            _ => Some(parsed),
        }
    }

    /// Current time, or the configured `now` override
    pub fn now_marker(&self, now: Option<&Value>) -> DateMarker {
        now.and_then(|v| self.create_marker(v))
            .map(|p| p.marker)
            .unwrap_or_else(|| self.marker_from_utc(Utc::now()))
    }

    /// Move a marker from another environment's wall clock into this one
    pub fn rezone_marker(&self, marker: DateMarker, forced_tz_offset: Option<i32>, old: &DateEnv) -> DateMarker {
        self.marker_from_utc(old.to_utc(marker, forced_tz_offset))
    }

    pub fn add(&self, marker: DateMarker, duration: &Duration) -> DateMarker {
        date::add_duration(marker, duration)
    }

    pub fn subtract(&self, marker: DateMarker, duration: &Duration) -> DateMarker {
        date::subtract_duration(marker, duration)
    }

    pub fn start_of(&self, marker: DateMarker, unit: Unit) -> DateMarker {
        date::start_of(marker, unit, self.first_day)
    }

    pub fn start_of_week(&self, marker: DateMarker) -> DateMarker {
        date::start_of_week(marker, self.first_day)
    }

    /// Week number according to the configured calculation
    pub fn week_number(&self, marker: DateMarker) -> u32 {
        use chrono::Datelike;
        if self.week_number_calculation.eq_ignore_ascii_case("iso") {
            return marker.iso_week().week();
        }
        // Locale rules: week one holds the locale's `doy` day of January
        let week_start = self.start_of_week(marker);
        let year = date::add_days(week_start, 6).year();
        let jan = NaiveDate::from_ymd_opt(year, 1, 1)
            .unwrap_or(NaiveDate::MIN)
            .and_time(NaiveTime::MIN);
        let anchor = date::add_days(jan, (self.locale.week_doy as i64 - 1).max(0));
        let first_week = self.start_of_week(anchor);
        ((week_start - first_week).num_days().div_euclid(7) + 1) as u32
    }

    /// Format a marker with a strftime pattern
    pub fn format(&self, marker: DateMarker, pattern: &str) -> String {
        marker.format(pattern).to_string()
    }
}

fn resolve_zone(name: &str, plugin: Option<Rc<dyn NamedTimeZoneImpl>>) -> Zone {
    match name {
        "local" | "" => return Zone::Local,
        "UTC" | "utc" | "Z" => return Zone::Utc,
        _ => {}
    }
    if let Some(offset) = parse_fixed_offset(name) {
        return Zone::Fixed(offset);
    }
    if let Some(imp) = plugin {
        return Zone::Plugin(name.to_string(), imp);
    }
    match name.parse::<Tz>() {
        Ok(tz) => Zone::Named(tz),
        Err(_) => {
            tracing::warn!(time_zone = name, "unknown time zone, treating markers as UTC");
            Zone::Coerced
        }
    }
}

fn parse_fixed_offset(name: &str) -> Option<FixedOffset> {
    let (sign, rest) = match name.as_bytes().first()? {
        b'+' => (1, &name[1..]),
        b'-' => (-1, &name[1..]),
        _ => return None,
    };
    let (h, m) = rest.split_once(':').unwrap_or((rest, "0"));
    let seconds = h.parse::<i32>().ok()? * 3600 + m.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::{build_locale, organize_raw_locales};

    fn env(time_zone: &str) -> DateEnv {
        let info = organize_raw_locales(&Value::Null, &[]);
        DateEnv::new(DateEnvSettings {
            time_zone: time_zone.to_string(),
            locale: Rc::new(build_locale("en", &info.map)),
            week_number_calculation: "ISO".to_string(),
            first_day: None,
            week_text: None,
            named_time_zone_impl: None,
        })
    }

    fn marker(s: &str) -> DateMarker {
        parse_iso(s).unwrap().marker
    }

    #[test]
    fn test_parse_iso_shapes() {
        let day = parse_iso("2024-05-01").unwrap();
        assert!(day.is_all_day);
        let timed = parse_iso("2024-05-01T10:30:00").unwrap();
        assert!(!timed.is_all_day);
        assert_eq!(timed.forced_tz_offset, None);
        let offset = parse_iso("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(offset.forced_tz_offset, Some(120));
        assert!(parse_iso("May 1st").is_none());
    }

    #[test]
    fn test_offset_input_shifted_into_zone() {
        let utc = env("UTC");
        let parsed = utc.create_marker(&Value::from("2024-05-01T10:00:00+02:00")).unwrap();
        assert_eq!(parsed.marker, marker("2024-05-01T08:00:00"));
        assert_eq!(parsed.forced_tz_offset, None);
    }

    #[test]
    fn test_rezone_between_fixed_offsets() {
        let utc = env("UTC");
        let plus_five = env("+05:00");
        let moved = plus_five.rezone_marker(marker("2024-05-01T10:00:00"), None, &utc);
        assert_eq!(moved, marker("2024-05-01T15:00:00"));
    }

    #[test]
    fn test_named_zone_via_tz_database() {
        let ny = env("America/New_York");
        assert!(ny.can_compute_offset());
        let instant = ny.to_utc(marker("2024-01-15T12:00:00"), None);
        assert_eq!(instant.naive_utc(), marker("2024-01-15T17:00:00"));
    }

    #[test]
    fn test_unknown_zone_is_coerced() {
        let odd = env("Mars/Olympus");
        assert!(!odd.can_compute_offset());
        let parsed = odd.create_marker(&Value::from("2024-05-01T10:00:00+02:00")).unwrap();
        assert_eq!(parsed.forced_tz_offset, Some(120));
    }

    #[test]
    fn test_now_override() {
        let utc = env("UTC");
        assert_eq!(
            utc.now_marker(Some(&Value::from("2024-02-10T09:00:00"))),
            marker("2024-02-10T09:00:00")
        );
    }

    #[test]
    fn test_iso_week_number() {
        let utc = env("UTC");
        assert_eq!(utc.week_number(marker("2024-01-04T00:00:00")), 1);
    }
}
