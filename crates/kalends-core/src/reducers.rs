//! Sub-reducers, one per slice of calendar state
//!
//! Each takes the previous slice and an action and returns the next slice.
//! Slices an action does not touch come back unchanged; for shared slices
//! (option sets) that means the same handle, so identity checks downstream
//! keep working.

use crate::action::{Action, DateSpan, EventInteractionState};
use crate::computed::ComputedOptions;
use crate::date::{DateMarker, DateRange};
use crate::date_env::DateEnv;
use crate::date_profile::{DateProfile, DateProfileGenerator};
use crate::event_source::EventSourceHash;
use crate::event_store::{
    exclude_events_by_source_id, exclude_sub_event_store, expand_recurring, filter_event_store_defs,
    merge_event_stores, parse_events, EventParseContext, EventStore,
};
use crate::identity::InstanceId;
use crate::options::OptionSet;

/// Apply `SetOption` to the runtime override layer
pub fn reduce_dynamic_option_overrides(overrides: &OptionSet, action: &Action) -> OptionSet {
    match action {
        Action::SetOption { option_name, value } => overrides.with(option_name.clone(), value.clone()),
        _ => overrides.clone(),
    }
}

pub fn reduce_view_type(view_type: &str, action: &Action) -> String {
    match action {
        Action::ChangeViewType { view_type, .. } => view_type.clone(),
        _ => view_type.to_string(),
    }
}

/// `initialDate` when given, otherwise now
pub fn get_initial_date(options: &OptionSet, env: &DateEnv) -> DateMarker {
    options
        .get("initialDate")
        .and_then(|v| env.create_marker(v))
        .map(|p| p.marker)
        .unwrap_or_else(|| env.now_marker(options.get("now")))
}

pub fn reduce_current_date(current: DateMarker, action: &Action) -> DateMarker {
    match action {
        Action::ChangeDate { date_marker } => *date_marker,
        _ => current,
    }
}

/// Navigate the date profile; invalid neighbours leave it where it is
pub fn reduce_date_profile(
    profile: &DateProfile,
    action: &Action,
    current_date: DateMarker,
    generator: &dyn DateProfileGenerator,
) -> DateProfile {
    match action {
        Action::ChangeViewType { date_marker, .. } => generator.build(date_marker.unwrap_or(current_date), 0, true),
        Action::ChangeDate { date_marker } => {
            if profile.active_range.is_none() || !profile.current_range.contains(*date_marker) {
                generator.build(*date_marker, 0, true)
            } else {
                profile.clone()
            }
        }
        Action::Prev => {
            let prev = generator.build_prev(profile, current_date);
            if prev.is_valid { prev } else { profile.clone() }
        }
        Action::Next => {
            let next = generator.build_next(profile, current_date);
            if next.is_valid { next } else { profile.clone() }
        }
        _ => profile.clone(),
    }
}

/// What event parsing needs while reducing the store
#[derive(Clone, Copy)]
pub struct EventStoreContext<'a> {
    pub date_env: &'a DateEnv,
    pub computed: &'a ComputedOptions,
    pub options: &'a OptionSet,
}

/// Advance the event store; `sources` are the already-reduced sources
pub fn reduce_event_store(
    store: &EventStore,
    action: &Action,
    sources: &EventSourceHash,
    active_range: Option<&DateRange>,
    ctx: &EventStoreContext<'_>,
) -> EventStore {
    match action {
        Action::ReceiveEvents { source_id, fetch_id, fetch_range, raw_events } => {
            let Some(source) = sources.get(source_id) else {
                return store.clone();
            };
            if source.latest_fetch_id.as_deref() != Some(fetch_id.as_str()) {
                return store.clone();
            }
            let parse_ctx = EventParseContext {
                date_env: ctx.date_env,
                computed: ctx.computed,
                default_all_day: source.default_all_day.or_else(|| ctx.options.get_bool("defaultAllDay")),
                force_event_duration: ctx.options.flag("forceEventDuration", false),
            };
            let mut subset = parse_events(raw_events, Some(source_id), &parse_ctx);
            if let Some(range) = fetch_range.as_ref().or(active_range) {
                subset = expand_recurring(&subset, range, ctx.date_env, ctx.computed);
            }
            tracing::debug!(source_id = %source_id, events = subset.defs.len(), "received events");
            merge_event_stores(&exclude_events_by_source_id(store, source_id), &subset)
        }
        Action::AddEvents { event_store } => {
            let expanded = match active_range {
                Some(range) => expand_recurring(event_store, range, ctx.date_env, ctx.computed),
                None => event_store.clone(),
            };
            merge_event_stores(store, &expanded)
        }
        Action::ResetEvents { event_store } => event_store.clone(),
        Action::MergeEvents { event_store } => merge_event_stores(store, event_store),
        Action::Prev | Action::Next | Action::ChangeDate { .. } | Action::ChangeViewType { .. } => match active_range {
            Some(range) => expand_recurring(store, range, ctx.date_env, ctx.computed),
            None => store.clone(),
        },
        Action::RemoveEvents { event_store } => exclude_sub_event_store(store, event_store),
        Action::RemoveEventSource { source_id } => exclude_events_by_source_id(store, source_id),
        Action::RemoveAllEventSources => filter_event_store_defs(store, |def| def.source_id.is_none()),
        Action::RemoveAllEvents => EventStore::new(),
        _ => store.clone(),
    }
}

pub fn reduce_date_selection(selection: Option<&DateSpan>, action: &Action) -> Option<DateSpan> {
    match action {
        Action::SelectDates { selection } => Some(selection.clone()),
        Action::UnselectDates => None,
        _ => selection.cloned(),
    }
}

pub fn reduce_selected_event(selected: Option<&InstanceId>, action: &Action) -> Option<InstanceId> {
    match action {
        Action::SelectEvent { instance_id } => Some(instance_id.clone()),
        Action::UnselectEvent => None,
        _ => selected.cloned(),
    }
}

pub fn reduce_event_drag(drag: Option<&EventInteractionState>, action: &Action) -> Option<EventInteractionState> {
    match action {
        Action::SetEventDrag { state } => Some(state.clone()),
        Action::UnsetEventDrag => None,
        _ => drag.cloned(),
    }
}

pub fn reduce_event_resize(resize: Option<&EventInteractionState>, action: &Action) -> Option<EventInteractionState> {
    match action {
        Action::SetEventResize { state } => Some(state.clone()),
        Action::UnsetEventResize => None,
        _ => resize.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed::build_computed_options;
    use crate::date_env::parse_iso;
    use crate::date_profile::tests::specs;
    use crate::date_profile::{build_date_profile_generator, DateProfileGeneratorProps};
    use crate::event_source::{init_event_sources, ArrayEventSourceDef, EventSourceContext, EventSourceDef};
    use crate::event_store::tests::env;
    use crate::options::default_options;
    use crate::value::Value;
    use crate::value_map;
    use std::rc::Rc;

    fn m(s: &str) -> DateMarker {
        parse_iso(s).unwrap().marker
    }

    #[test]
    fn test_set_option_keeps_identity_otherwise() {
        let overrides = OptionSet::empty();
        assert!(reduce_dynamic_option_overrides(&overrides, &Action::Next).same(&overrides));
        let set = Action::SetOption {
            option_name: "weekends".to_string(),
            value: Value::Bool(false),
        };
        let next = reduce_dynamic_option_overrides(&overrides, &set);
        assert_eq!(next.get_bool("weekends"), Some(false));
    }

    #[test]
    fn test_initial_date() {
        let env = env("UTC");
        let options = OptionSet::new(value_map! { "initialDate" => "2024-03-05" });
        assert_eq!(get_initial_date(&options, &env), m("2024-03-05"));
        let now = OptionSet::new(value_map! { "now" => "2024-01-02T08:00:00" });
        assert_eq!(get_initial_date(&now, &env), m("2024-01-02T08:00:00"));
    }

    #[test]
    fn test_date_profile_navigation() {
        let env = Rc::new(env("UTC"));
        let props = DateProfileGeneratorProps::from_options(specs()["gridMonth"].clone(), env, &default_options());
        let generator = build_date_profile_generator(props);
        let profile = generator.build(m("2024-05-15"), 0, true);

        let next = reduce_date_profile(&profile, &Action::Next, m("2024-05-15"), generator.as_ref());
        assert_eq!(next.current_range.start, m("2024-06-01"));

        let inside = Action::ChangeDate { date_marker: m("2024-05-20") };
        assert_eq!(reduce_date_profile(&profile, &inside, m("2024-05-20"), generator.as_ref()), profile);

        let outside = Action::ChangeDate { date_marker: m("2024-09-20") };
        let moved = reduce_date_profile(&profile, &outside, m("2024-09-20"), generator.as_ref());
        assert_eq!(moved.current_range.start, m("2024-09-01"));
    }

    #[test]
    fn test_event_store_receives_for_latest_fetch_only() {
        let env = env("UTC");
        let computed = build_computed_options(&default_options());
        let options = OptionSet::new(value_map! {
            "events" => vec![Value::Map(value_map! { "id" => "x", "start" => "2024-05-03" })],
        });
        let defs: Vec<Rc<dyn EventSourceDef>> = vec![Rc::new(ArrayEventSourceDef)];
        let source_ctx = EventSourceContext { defs: &defs, options: &options, date_env: &env };
        let may = DateRange::new(m("2024-05-01"), m("2024-06-01"));
        let (sources, follow_ups) = init_event_sources(&options, Some(&may), &source_ctx);

        let ctx = EventStoreContext { date_env: &env, computed: &computed, options: &options };
        let store = reduce_event_store(&EventStore::new(), &follow_ups[0], &sources, Some(&may), &ctx);
        assert!(store.find_by_public_id("x").is_some());

        let Action::ReceiveEvents { source_id, fetch_range, raw_events, .. } = follow_ups[0].clone() else {
            panic!("expected ReceiveEvents");
        };
        let stale = Action::ReceiveEvents {
            source_id: source_id.clone(),
            fetch_id: "stale".to_string(),
            fetch_range,
            raw_events,
        };
        let unchanged = reduce_event_store(&EventStore::new(), &stale, &sources, Some(&may), &ctx);
        assert!(unchanged.is_empty());

        let removed = reduce_event_store(&store, &Action::RemoveEventSource { source_id }, &sources, Some(&may), &ctx);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_interaction_slices() {
        let span = DateSpan {
            range: DateRange::new(m("2024-05-01"), m("2024-05-02")),
            all_day: true,
        };
        let selected = reduce_date_selection(None, &Action::SelectDates { selection: span.clone() });
        assert_eq!(selected.as_ref(), Some(&span));
        assert_eq!(reduce_date_selection(selected.as_ref(), &Action::Next), Some(span));
        assert_eq!(reduce_date_selection(selected.as_ref(), &Action::UnselectDates), None);

        let id = InstanceId::new("i1");
        let picked = reduce_selected_event(None, &Action::SelectEvent { instance_id: id.clone() });
        assert_eq!(picked, Some(id));
        assert_eq!(reduce_selected_event(picked.as_ref(), &Action::UnselectEvent), None);

        let drag = EventInteractionState {
            affected_events: EventStore::new(),
            mutated_events: EventStore::new(),
            is_event: true,
        };
        let dragging = reduce_event_drag(None, &Action::SetEventDrag { state: drag.clone() });
        assert_eq!(dragging, Some(drag.clone()));
        assert_eq!(reduce_event_drag(dragging.as_ref(), &Action::UnsetEventDrag), None);
        let resizing = reduce_event_resize(None, &Action::SetEventResize { state: drag });
        assert!(reduce_event_resize(resizing.as_ref(), &Action::UnsetEventResize).is_none());
    }
}
