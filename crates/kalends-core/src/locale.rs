//! Locale tables

use crate::options::OptionSet;
use crate::value::{Value, ValueMap};
use crate::value_map;
use indexmap::IndexMap;
use std::rc::Rc;

/// A locale as supplied by configuration: a code plus option defaults
#[derive(Debug, Clone, PartialEq)]
pub struct RawLocale {
    pub code: String,
    /// Everything except the code: `week`, `buttonText`, `weekText`, ...
    pub props: ValueMap,
}

impl RawLocale {
    /// Read a raw locale from a map value; entries without a code are skipped
    pub fn from_value(value: &Value) -> Option<RawLocale> {
        let map = value.as_map()?;
        let code = map.get("code")?.as_str()?.to_string();
        let mut props = map.clone();
        props.shift_remove("code");
        Some(RawLocale { code, props })
    }

    /// The built-in English locale, always available
    pub fn english() -> RawLocale {
        RawLocale {
            code: "en".to_string(),
            props: value_map! {
                "week" => value_map! { "dow" => 0i64, "doy" => 4i64 },
                "direction" => "ltr",
                "buttonText" => value_map! {
                    "prev" => "prev",
                    "next" => "next",
                    "prevYear" => "prev year",
                    "nextYear" => "next year",
                    "today" => "today",
                    "month" => "month",
                    "week" => "week",
                    "day" => "day",
                    "list" => "list",
                },
                "weekText" => "W",
                "allDayText" => "all-day",
                "moreLinkText" => "more",
                "noEventsText" => "No events to display",
            },
        }
    }
}

pub type RawLocaleMap = IndexMap<String, RawLocale>;

/// Every locale the calendar may switch to, plus the code used when none is chosen
#[derive(Debug, Clone)]
pub struct RawLocaleInfo {
    pub map: Rc<RawLocaleMap>,
    pub default_code: String,
}

/// A resolved locale
#[derive(Debug, Clone, PartialEq)]
pub struct Locale {
    /// The code that was asked for
    pub code_arg: String,
    /// The code actually resolved
    pub code: String,
    /// First day of week, 0 = Sunday
    pub week_dow: u32,
    /// Day of year that defines week one
    pub week_doy: u32,
    /// Option defaults contributed by this locale
    pub options: OptionSet,
}

/// Index global and explicitly configured locales by code
pub fn organize_raw_locales(explicit: &Value, global: &[RawLocale]) -> RawLocaleInfo {
    let explicit: Vec<RawLocale> = explicit
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(RawLocale::from_value)
        .collect();

    let default_code = explicit
        .first()
        .map(|l| l.code.clone())
        .unwrap_or_else(|| "en".to_string());

    let mut map = RawLocaleMap::new();
    let en = RawLocale::english();
    map.insert(en.code.clone(), en);
    for raw in global.iter().chain(explicit.iter()) {
        map.insert(raw.code.clone(), raw.clone());
    }

    RawLocaleInfo {
        map: Rc::new(map),
        default_code,
    }
}

/// Find the best locale for a code: exact match, then shorter prefixes, then English
fn query_raw_locale<'a>(code: &str, available: &'a RawLocaleMap) -> Option<&'a RawLocale> {
    let lowered = code.to_lowercase();
    let parts: Vec<&str> = lowered.split('-').collect();
    for len in (1..=parts.len()).rev() {
        let candidate = parts[..len].join("-");
        if let Some(raw) = available.get(&candidate) {
            return Some(raw);
        }
    }
    None
}

/// Resolve a locale code against the available table
pub fn build_locale(code_arg: &str, available: &RawLocaleMap) -> Locale {
    let english = RawLocale::english();
    let raw = query_raw_locale(code_arg, available).unwrap_or(&english);

    let mut options = english.props.clone();
    for (k, v) in &raw.props {
        match (options.get_mut(k), v) {
            (Some(Value::Map(existing)), Value::Map(incoming)) if k == "buttonText" => {
                for (bk, bv) in incoming {
                    existing.insert(bk.clone(), bv.clone());
                }
            }
            _ => {
                options.insert(k.clone(), v.clone());
            }
        }
    }

    let week = options.shift_remove("week");
    let week_field = |name: &str, default: u32| {
        week.as_ref()
            .and_then(Value::as_map)
            .and_then(|w| w.get(name))
            .and_then(Value::as_int)
            .map(|n| n as u32)
            .unwrap_or(default)
    };

    Locale {
        code_arg: code_arg.to_string(),
        code: raw.code.clone(),
        week_dow: week_field("dow", 0),
        week_doy: week_field("doy", 4),
        options: OptionSet::new(options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn german() -> Value {
        Value::Map(value_map! {
            "code" => "de",
            "week" => value_map! { "dow" => 1i64, "doy" => 4i64 },
            "buttonText" => value_map! { "today" => "Heute" },
        })
    }

    #[test]
    fn test_default_code_is_first_explicit() {
        let info = organize_raw_locales(&Value::List(vec![german()]), &[]);
        assert_eq!(info.default_code, "de");
        assert!(info.map.contains_key("en"));
        assert!(info.map.contains_key("de"));
    }

    #[test]
    fn test_prefix_fallback() {
        let info = organize_raw_locales(&Value::List(vec![german()]), &[]);
        let locale = build_locale("de-AT", &info.map);
        assert_eq!(locale.code, "de");
        assert_eq!(locale.week_dow, 1);
        let text = locale.options.get_map("buttonText").unwrap();
        assert_eq!(text.get("today"), Some(&Value::from("Heute")));
        // untouched english keys survive
        assert_eq!(text.get("prev"), Some(&Value::from("prev")));
    }

    #[test]
    fn test_rebuilt_locale_compares_equal() {
        let info = organize_raw_locales(&Value::List(vec![german()]), &[]);
        assert_eq!(build_locale("de", &info.map), build_locale("de", &info.map));
        assert_ne!(build_locale("de", &info.map), build_locale("en", &info.map));
    }

    #[test]
    fn test_unknown_code_falls_back_to_english() {
        let info = organize_raw_locales(&Value::Null, &[]);
        let locale = build_locale("xx", &info.map);
        assert_eq!(locale.code, "en");
        assert_eq!(locale.code_arg, "xx");
        assert!(!locale.options.contains("week"));
    }
}
