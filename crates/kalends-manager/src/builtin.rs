//! Built-in plugins

use crate::data::CalendarData;
use crate::error::Result;
use crate::plugin::PluginDef;
use kalends_core::date_profile::TableDateProfileGenerator;
use kalends_core::event_source::ArrayEventSourceDef;
use kalends_core::{value_map, Action, OptionSet, Value, ViewConfig};
use std::rc::Rc;

/// Array event sources plus change handlers that keep the sources in
/// step with the `events` and `eventSources` options
pub fn core_plugin() -> Rc<PluginDef> {
    PluginDef::new("kalends/core")
        .event_source_def(Rc::new(ArrayEventSourceDef))
        .option_change_handler("events", |_, data| sync_event_sources(data, "events"))
        .option_change_handler("eventSources", |_, data| sync_event_sources(data, "eventSources"))
        .build()
}

/// Source inputs named by the options, in configuration order, with the
/// option each came from
fn configured_inputs(options: &OptionSet) -> Vec<(&'static str, &Value)> {
    let mut inputs = Vec::new();
    for name in ["initialEvents", "events"] {
        if let Some(value) = options.get(name) {
            inputs.push((name, value));
        }
    }
    match options.get("eventSources") {
        Some(Value::List(list)) => inputs.extend(list.iter().map(|v| ("eventSources", v))),
        Some(single) => inputs.push(("eventSources", single)),
        None => {}
    }
    inputs
}

/// Remove sources whose raw input is gone, add sources for new inputs of
/// `option`
///
/// Matching runs against every configured input, so a change to one option
/// leaves the sources of the others alone. Only inputs of `option` are
/// added; when both options change, each handler adds its own. Removals
/// may be queued twice, which is harmless.
fn sync_event_sources(data: &CalendarData, option: &str) -> Result<()> {
    let mut unfound: Vec<_> = data.event_sources().values().collect();
    let mut new_inputs = Vec::new();

    for (name, input) in configured_inputs(data.calendar_options()) {
        match unfound.iter().position(|s| s.raw == *input) {
            Some(index) => {
                unfound.remove(index);
            }
            None if name == option => new_inputs.push(input),
            None => {}
        }
    }

    for source in unfound {
        data.dispatch(Action::RemoveEventSource {
            source_id: source.source_id.clone(),
        })?;
    }
    let added: Vec<_> = new_inputs.into_iter().filter_map(|raw| data.parse_event_source(raw)).collect();
    if !added.is_empty() {
        tracing::debug!(option, count = added.len(), "adding event sources from options");
        data.dispatch(Action::AddEventSources { sources: added })?;
    }
    Ok(())
}

/// Month, week and day grids over the table generator
///
/// Provides `dayGridMonth` (the initial view), `dayGridWeek` and
/// `dayGridDay`, all extending the abstract `dayGrid` view.
pub fn day_grid_plugin() -> Rc<PluginDef> {
    let table = ViewConfig::with_component("DayTable", OptionSet::empty())
        .date_profile_generator(TableDateProfileGenerator::factory());

    PluginDef::new("kalends/daygrid")
        .initial_view("dayGridMonth")
        .view("dayGrid", table)
        .view(
            "dayGridDay",
            ViewConfig::extending("dayGrid", OptionSet::new(value_map! { "duration" => value_map! { "days" => 1i64 } })),
        )
        .view(
            "dayGridWeek",
            ViewConfig::extending("dayGrid", OptionSet::new(value_map! { "duration" => value_map! { "weeks" => 1i64 } })),
        )
        .view(
            "dayGridMonth",
            ViewConfig::extending(
                "dayGrid",
                OptionSet::new(value_map! {
                    "duration" => value_map! { "months" => 1i64 },
                    "fixedWeekCount" => true,
                }),
            ),
        )
        .build()
}
