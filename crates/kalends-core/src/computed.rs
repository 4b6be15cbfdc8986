//! Options derived from raw option values

use crate::duration::Duration;
use crate::options::OptionSet;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One field of an ordering spec such as `"start,-duration"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub field: String,
    /// `true` for ascending, `false` when the field was prefixed with `-`
    pub ascending: bool,
}

/// Numeric and structured values computed once from an option set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedOptions {
    pub event_order_specs: Vec<OrderSpec>,
    pub next_day_threshold: Duration,
    pub default_timed_event_duration: Duration,
    pub default_all_day_event_duration: Duration,
}

/// Parse `"a,-b"` or `["a", "-b"]` into order specs
pub fn parse_field_specs(input: Option<&Value>) -> Vec<OrderSpec> {
    let tokens: Vec<String> = match input {
        Some(Value::String(s)) => s.split(',').map(|t| t.trim().to_string()).collect(),
        Some(Value::List(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    tokens
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(|token| match token.strip_prefix('-') {
            Some(field) => OrderSpec {
                field: field.to_string(),
                ascending: false,
            },
            None => OrderSpec {
                field: token,
                ascending: true,
            },
        })
        .collect()
}

pub fn build_computed_options(options: &OptionSet) -> ComputedOptions {
    let duration_or = |key: &str, fallback: Duration| {
        options
            .get_duration(key)
            .ok()
            .flatten()
            .unwrap_or(fallback)
    };

    ComputedOptions {
        event_order_specs: parse_field_specs(options.get("eventOrder")),
        next_day_threshold: duration_or("nextDayThreshold", Duration::default()),
        default_timed_event_duration: duration_or("defaultTimedEventDuration", Duration::hours(1)),
        default_all_day_event_duration: duration_or("defaultAllDayEventDuration", Duration::days(1)),
    }
}
