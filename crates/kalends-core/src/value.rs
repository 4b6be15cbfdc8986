//! Dynamic value types for calendar options and raw event data

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One option value or raw event field
///
/// Deserializes untagged, so option files and raw event lists read as
/// plain RON or JSON. Date-times are tried before strings; date-only text
/// stays a string and is parsed by the date env.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// Counts, weekday numbers, milliseconds
    Int(i64),
    /// Aspect ratios and the like
    Float(f64),
    /// A wall-clock date-time
    Date(NaiveDateTime),
    String(String),
    List(Vec<Value>),
    Map(ValueMap),
}

/// Option bags and raw event records; keys keep their insertion order
pub type ValueMap = IndexMap<String, Value>;

macro_rules! copy_accessors {
    ($($(#[$doc:meta])* $name:ident => $variant:ident: $ty:ty),+ $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&self) -> Option<$ty> {
                if let Value::$variant(inner) = self { Some(*inner) } else { None }
            }
        )+
    };
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    copy_accessors! {
        as_bool => Bool: bool,
        as_int => Int: i64,
        /// Date-time values only; strings go through the date env
        as_date => Date: NaiveDateTime,
    }

    /// Integers widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(f) => Some(f),
            Value::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self { Some(s) } else { None }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        if let Value::List(list) = self { Some(list) } else { None }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        if let Value::Map(map) = self { Some(map) } else { None }
    }

    /// Name used in option type errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Date(_) => "date",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Integers of a list value such as `hiddenDays`; other entries are skipped
    pub fn int_list(&self) -> Vec<i64> {
        self.as_list()
            .map(|list| list.iter().filter_map(Value::as_int).collect())
            .unwrap_or_default()
    }

    /// Class names given as `"a b"` or as `["a", "b"]`
    pub fn string_list(&self) -> Vec<String> {
        match self {
            Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
            Value::List(list) => list.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

fn write_joined<T>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
    mut write_item: impl FnMut(&mut fmt::Formatter<'_>, T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_item(f, item)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S")),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(list) => {
                f.write_str("[")?;
                write_joined(f, list, |f, v| write!(f, "{v}"))?;
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                write_joined(f, map, |f, (k, v)| write!(f, "{k}: {v}"))?;
                f.write_str("}")
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => |$v:ident| $body:expr),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

impl_from! {
    bool => |b| Value::Bool(b),
    i64 => |i| Value::Int(i),
    i32 => |i| Value::Int(i64::from(i)),
    f64 => |x| Value::Float(x),
    String => |s| Value::String(s),
    &str => |s| Value::String(s.to_owned()),
    NaiveDateTime => |d| Value::Date(d),
    ValueMap => |map| Value::Map(map),
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Build a [`ValueMap`] from `key => value` pairs
#[macro_export]
macro_rules! value_map {
    () => { $crate::ValueMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::ValueMap::new();
        $( map.insert(($key).to_string(), $crate::Value::from($value)); )+
        map
    }};
}
