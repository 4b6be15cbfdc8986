//! Event UI overlays
//!
//! Visual and interaction settings for events come in layers: the calendar
//! default, the event source's settings, then the event's own. Each layer
//! only fills in what it specifies.

use crate::options::OptionSet;
use crate::value::{Value, ValueMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One layer of event UI settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventUi {
    pub display: Option<String>,
    pub start_editable: Option<bool>,
    pub duration_editable: Option<bool>,
    pub constraints: Vec<Value>,
    pub overlap: Option<bool>,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub text_color: Option<String>,
    pub class_names: Vec<String>,
}

/// Event UI layers keyed by definition id; the empty key holds the calendar default
pub type EventUiHash = IndexMap<String, EventUi>;

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read an unprefixed UI layer (`display`, `color`, `editable`, ...) from a raw map
pub fn process_unscoped_ui_props(raw: &ValueMap) -> EventUi {
    let string = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
    let boolean = |key: &str| raw.get(key).and_then(Value::as_bool);
    let editable = boolean("editable");
    let color = string("color");

    EventUi {
        display: string("display"),
        start_editable: boolean("startEditable").or(editable),
        duration_editable: boolean("durationEditable").or(editable),
        constraints: raw
            .get("constraint")
            .filter(|v| !v.is_null())
            .cloned()
            .into_iter()
            .collect(),
        overlap: boolean("overlap"),
        background_color: string("backgroundColor").or_else(|| color.clone()),
        border_color: string("borderColor").or(color),
        text_color: string("textColor"),
        class_names: raw.get("classNames").map(Value::string_list).unwrap_or_default(),
    }
}

/// Read a UI layer from prefixed options, e.g. `eventDisplay`, `selectConstraint`
pub fn process_scoped_ui_props(prefix: &str, options: &OptionSet) -> EventUi {
    const KEYS: &[&str] = &[
        "display",
        "editable",
        "startEditable",
        "durationEditable",
        "constraint",
        "overlap",
        "color",
        "backgroundColor",
        "borderColor",
        "textColor",
        "classNames",
    ];

    let mut unscoped = ValueMap::new();
    for key in KEYS {
        if let Some(value) = options.get(&format!("{}{}", prefix, capitalize(key))) {
            unscoped.insert(key.to_string(), value.clone());
        }
    }
    // plain `editable` is the calendar-wide switch for events
    if prefix == "event" {
        if let Some(editable) = options.get("editable") {
            unscoped.insert("editable".to_string(), editable.clone());
        }
    }
    process_unscoped_ui_props(&unscoped)
}

/// Layer UIs from lowest to highest precedence
pub fn combine_event_uis<'a>(layers: impl IntoIterator<Item = &'a EventUi>) -> EventUi {
    layers.into_iter().fold(EventUi::default(), |acc, ui| EventUi {
        display: ui.display.clone().or(acc.display),
        start_editable: ui.start_editable.or(acc.start_editable),
        duration_editable: ui.duration_editable.or(acc.duration_editable),
        constraints: acc.constraints.into_iter().chain(ui.constraints.iter().cloned()).collect(),
        overlap: ui.overlap.or(acc.overlap),
        background_color: ui.background_color.clone().or(acc.background_color),
        border_color: ui.border_color.clone().or(acc.border_color),
        text_color: ui.text_color.clone().or(acc.text_color),
        class_names: acc.class_names.into_iter().chain(ui.class_names.iter().cloned()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_map;

    #[test]
    fn test_scoped_props() {
        let options = OptionSet::new(value_map! {
            "eventColor" => "red",
            "eventDisplay" => "block",
            "editable" => true,
            "selectOverlap" => false,
        });
        let event = process_scoped_ui_props("event", &options);
        assert_eq!(event.background_color.as_deref(), Some("red"));
        assert_eq!(event.border_color.as_deref(), Some("red"));
        assert_eq!(event.display.as_deref(), Some("block"));
        assert_eq!(event.start_editable, Some(true));

        let select = process_scoped_ui_props("select", &options);
        assert_eq!(select.overlap, Some(false));
        assert_eq!(select.start_editable, None);
    }

    #[test]
    fn test_combine_layers() {
        let base = EventUi {
            background_color: Some("blue".into()),
            class_names: vec!["a".into()],
            ..EventUi::default()
        };
        let source = EventUi {
            background_color: Some("green".into()),
            ..EventUi::default()
        };
        let event = EventUi {
            text_color: Some("white".into()),
            class_names: vec!["b".into()],
            ..EventUi::default()
        };
        let combined = combine_event_uis([&base, &source, &event]);
        assert_eq!(combined.background_color.as_deref(), Some("green"));
        assert_eq!(combined.text_color.as_deref(), Some("white"));
        assert_eq!(combined.class_names, vec!["a".to_string(), "b".to_string()]);
    }
}
