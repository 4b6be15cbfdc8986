//! Option sets and option-layer merging
//!
//! An [`OptionSet`] is an immutable, reference-counted option bag. Its
//! identity is what the memoization layer keys on: merging the same layers
//! again produces an equal but *different* set, so callers keep the previous
//! set around whenever nothing changed.

use crate::date::DateMarker;
use crate::duration::Duration;
use crate::error::{Error, Result};
use crate::value::{Value, ValueMap};
use crate::value_map;
use std::rc::Rc;

/// Options whose map values merge key-by-key instead of being replaced
const COMPLEX_OPTIONS: &[&str] = &[
    "headerToolbar",
    "footerToolbar",
    "buttonText",
    "buttonHints",
    "buttonIcons",
    "customButtons",
    "views",
];

/// An immutable option bag shared by reference
#[derive(Debug, Clone, Default)]
pub struct OptionSet(Rc<ValueMap>);

impl OptionSet {
    pub fn new(map: ValueMap) -> Self {
        Self(Rc::new(map))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Identity comparison, the equality the memo layer relies on
    pub fn same(&self, other: &OptionSet) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn map(&self) -> &ValueMap {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn get_map(&self, key: &str) -> Option<&ValueMap> {
        self.get(key).and_then(Value::as_map)
    }

    /// Read a boolean, falling back when missing or mistyped
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Read a duration option; missing values are `Ok(None)`
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>> {
        self.get(key).map(Duration::from_value).transpose()
    }

    /// Read a date option given either as a date value or an ISO string
    pub fn get_date(&self, key: &str) -> Result<Option<DateMarker>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Date(d)) => Ok(Some(*d)),
            Some(Value::String(s)) => crate::date_env::parse_iso(s)
                .map(|parsed| Some(parsed.marker))
                .ok_or_else(|| Error::InvalidDate(s.clone())),
            Some(other) => Err(Error::TypeError {
                option: key.to_string(),
                expected: "date".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    /// A new set with one key replaced
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> OptionSet {
        let mut map = (*self.0).clone();
        map.insert(key.into(), value.into());
        OptionSet::new(map)
    }

    /// Shallow merge, `other` wins
    pub fn merged(&self, other: &OptionSet) -> OptionSet {
        let mut map = (*self.0).clone();
        for (k, v) in other.map() {
            map.insert(k.clone(), v.clone());
        }
        OptionSet::new(map)
    }

    /// Merge option layers from lowest to highest precedence
    pub fn merge_layers(layers: &[&OptionSet]) -> OptionSet {
        let mut merged = ValueMap::new();
        for layer in layers {
            for (key, value) in layer.map() {
                match (merged.get_mut(key), value) {
                    (Some(Value::Map(existing)), Value::Map(incoming))
                        if COMPLEX_OPTIONS.contains(&key.as_str()) =>
                    {
                        for (k, v) in incoming {
                            existing.insert(k.clone(), v.clone());
                        }
                    }
                    _ => {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        OptionSet::new(merged)
    }
}

/// Content equality; see [`OptionSet::same`] for identity
impl PartialEq for OptionSet {
    fn eq(&self, other: &Self) -> bool {
        self.same(other) || self.0 == other.0
    }
}

impl From<ValueMap> for OptionSet {
    fn from(map: ValueMap) -> Self {
        OptionSet::new(map)
    }
}

/// First value that is present and not null
pub fn first_defined<'a>(candidates: &[Option<&'a Value>]) -> Option<&'a Value> {
    candidates
        .iter()
        .flatten()
        .find(|v| !v.is_null())
        .copied()
}

/// The process-wide default option layer
pub fn default_options() -> OptionSet {
    OptionSet::new(value_map! {
        "timeZone" => "local",
        "locale" => "",
        "locales" => Value::List(Vec::new()),
        "initialView" => "",
        "themeSystem" => "standard",
        "weekends" => true,
        "weekNumbers" => false,
        "weekNumberCalculation" => "local",
        "weekText" => "W",
        "editable" => false,
        "lazyFetching" => true,
        "progressiveEventRendering" => false,
        "showNonCurrentDates" => true,
        "fixedWeekCount" => true,
        "slotMinTime" => "00:00:00",
        "slotMaxTime" => "24:00:00",
        "nextDayThreshold" => "00:00:00",
        "defaultTimedEventDuration" => "01:00:00",
        "defaultAllDayEventDuration" => value_map! { "days" => 1i64 },
        "forceEventDuration" => false,
        "eventDisplay" => "auto",
        "eventOrder" => "start,-duration,allDay,title",
        "titleRangeSeparator" => " \u{2013} ",
        "defaultRangeSeparator" => " - ",
        "aspectRatio" => 1.35,
        "headerToolbar" => value_map! {
            "start" => "title",
            "center" => "",
            "end" => "today prev,next",
        },
        "footerToolbar" => false,
        "buttonText" => value_map! {
            "prev" => "prev",
            "next" => "next",
            "prevYear" => "prev year",
            "nextYear" => "next year",
            "year" => "year",
            "today" => "today",
            "month" => "month",
            "week" => "week",
            "day" => "day",
            "list" => "list",
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_layers_win() {
        let base = OptionSet::new(value_map! { "weekends" => true, "locale" => "en" });
        let top = OptionSet::new(value_map! { "weekends" => false });
        let merged = OptionSet::merge_layers(&[&base, &top]);
        assert_eq!(merged.get_bool("weekends"), Some(false));
        assert_eq!(merged.get_str("locale"), Some("en"));
    }

    #[test]
    fn test_complex_options_merge_deep() {
        let base = default_options();
        let top = OptionSet::new(value_map! {
            "buttonText" => value_map! { "today" => "now" },
        });
        let merged = OptionSet::merge_layers(&[&base, &top]);
        let text = merged.get_map("buttonText").unwrap();
        assert_eq!(text.get("today"), Some(&Value::from("now")));
        assert_eq!(text.get("prev"), Some(&Value::from("prev")));
    }

    #[test]
    fn test_identity_vs_equality() {
        let a = OptionSet::new(value_map! { "x" => 1i64 });
        let b = OptionSet::new(value_map! { "x" => 1i64 });
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert_eq!(a, b);
        assert_ne!(a, b.with("x", 2i64));
    }

    #[test]
    fn test_first_defined_skips_null() {
        let null = Value::Null;
        let en = Value::from("en");
        assert_eq!(first_defined(&[None, Some(&null), Some(&en)]), Some(&en));
        assert_eq!(first_defined(&[None]), None);
    }

    #[test]
    fn test_typed_getters() {
        let opts = OptionSet::new(value_map! {
            "slotMinTime" => "08:00",
            "initialDate" => "2024-03-05",
            "weekends" => "yes",
        });
        assert_eq!(opts.get_duration("slotMinTime").unwrap(), Some(Duration::hours(8)));
        assert!(opts.get_date("initialDate").unwrap().is_some());
        assert!(opts.flag("weekends", true));
        assert!(opts.get_date("missing").unwrap().is_none());
    }
}
