//! Event definitions, instances and the event store
//!
//! A definition holds what an event *is* (title, UI, recurrence); an instance
//! is one concrete occurrence with a date range. Recurring definitions get
//! their instances generated for whatever range is being displayed.

use crate::computed::ComputedOptions;
use crate::date::{self, DateRange, DateMarker};
use crate::date_env::DateEnv;
use crate::duration::Duration;
use crate::event_ui::{process_unscoped_ui_props, EventUi};
use crate::identity::{DefId, InstanceId, SourceId};
use crate::value::{Value, ValueMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Recurrence rule for simple weekly recurring events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringDef {
    /// Weekdays the event occurs on (0 = Sunday); empty means every day
    pub days_of_week: Vec<u32>,
    pub start_time: Option<Duration>,
    pub end_time: Option<Duration>,
    pub start_recur: Option<DateMarker>,
    pub end_recur: Option<DateMarker>,
}

/// What an event is, independent of when it occurs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub def_id: DefId,
    pub source_id: Option<SourceId>,
    pub public_id: String,
    pub group_id: String,
    pub title: String,
    pub url: String,
    pub all_day: bool,
    pub has_end: bool,
    pub recurring: Option<RecurringDef>,
    pub ui: EventUi,
    pub extended_props: ValueMap,
}

/// One occurrence of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInstance {
    pub instance_id: InstanceId,
    pub def_id: DefId,
    pub range: DateRange,
    /// Offset the start was given in, kept only when the zone cannot compute offsets
    pub forced_start_tz_offset: Option<i32>,
    pub forced_end_tz_offset: Option<i32>,
}

impl EventInstance {
    pub fn new(def_id: DefId, range: DateRange) -> Self {
        Self {
            instance_id: InstanceId::generate(),
            def_id,
            range,
            forced_start_tz_offset: None,
            forced_end_tz_offset: None,
        }
    }
}

/// Storage for event definitions and their instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStore {
    pub defs: IndexMap<DefId, EventDef>,
    pub instances: IndexMap<InstanceId, EventInstance>,
}

impl EventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Add a definition and, optionally, its instance
    pub fn add(&mut self, def: EventDef, instance: Option<EventInstance>) {
        if let Some(instance) = instance {
            self.instances.insert(instance.instance_id.clone(), instance);
        }
        self.defs.insert(def.def_id.clone(), def);
    }

    /// Instances belonging to a definition
    pub fn instances_of<'a>(&'a self, def_id: &'a DefId) -> impl Iterator<Item = &'a EventInstance> {
        self.instances.values().filter(move |i| &i.def_id == def_id)
    }

    /// Look up a definition by its public id
    pub fn find_by_public_id(&self, public_id: &str) -> Option<&EventDef> {
        self.defs.values().find(|d| d.public_id == public_id)
    }
}

/// What event parsing needs from the calendar
#[derive(Clone, Copy)]
pub struct EventParseContext<'a> {
    pub date_env: &'a DateEnv,
    pub computed: &'a ComputedOptions,
    /// `defaultAllDay` from options or the source
    pub default_all_day: Option<bool>,
    /// `forceEventDuration` option
    pub force_event_duration: bool,
}

const STANDARD_PROPS: &[&str] = &[
    "id", "groupId", "title", "url", "start", "end", "date", "allDay", "daysOfWeek",
    "startTime", "endTime", "startRecur", "endRecur", "display", "editable", "startEditable",
    "durationEditable", "constraint", "overlap", "color", "backgroundColor", "borderColor",
    "textColor", "classNames", "extendedProps",
];

/// Parse one raw event; returns `None` when the input has no usable start
pub fn parse_event(
    raw: &ValueMap,
    source_id: Option<&SourceId>,
    ctx: &EventParseContext<'_>,
) -> Option<(EventDef, Option<EventInstance>)> {
    let string = |key: &str| {
        raw.get(key)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    };
    let explicit_all_day = raw.get("allDay").and_then(Value::as_bool);

    let mut extended_props = raw
        .get("extendedProps")
        .and_then(Value::as_map)
        .cloned()
        .unwrap_or_default();
    for (k, v) in raw {
        if !STANDARD_PROPS.contains(&k.as_str()) {
            extended_props.insert(k.clone(), v.clone());
        }
    }

    let mut def = EventDef {
        def_id: DefId::generate(),
        source_id: source_id.cloned(),
        public_id: string("id"),
        group_id: string("groupId"),
        title: string("title"),
        url: string("url"),
        all_day: false,
        has_end: false,
        recurring: None,
        ui: process_unscoped_ui_props(raw),
        extended_props,
    };

    if let Some(recurring) = parse_recurring(raw, ctx.date_env) {
        def.all_day = explicit_all_day.unwrap_or(recurring.start_time.is_none() && recurring.end_time.is_none());
        def.has_end = recurring.end_time.is_some();
        def.recurring = Some(recurring);
        return Some((def, None));
    }

    let start_input = raw.get("start").or_else(|| raw.get("date"))?;
    let start = ctx.date_env.create_marker(start_input)?;
    let end = raw.get("end").and_then(|v| ctx.date_env.create_marker(v));

    let all_day = explicit_all_day
        .or(ctx.default_all_day)
        .unwrap_or(start.is_all_day && end.is_none_or(|e| e.is_all_day));

    let start_marker = if all_day { date::start_of_day(start.marker) } else { start.marker };
    let mut end_marker = end.map(|e| if all_day { date::start_of_day(e.marker) } else { e.marker });
    if end_marker.is_some_and(|e| e <= start_marker) {
        end_marker = None;
    }

    def.all_day = all_day;
    def.has_end = end_marker.is_some() || ctx.force_event_duration;

    let default_duration = if all_day {
        ctx.computed.default_all_day_event_duration
    } else {
        ctx.computed.default_timed_event_duration
    };
    let range = DateRange::new(
        start_marker,
        end_marker.unwrap_or_else(|| ctx.date_env.add(start_marker, &default_duration)),
    );

    let mut instance = EventInstance::new(def.def_id.clone(), range);
    instance.forced_start_tz_offset = start.forced_tz_offset;
    instance.forced_end_tz_offset = end.and_then(|e| e.forced_tz_offset);

    Some((def, Some(instance)))
}

fn parse_recurring(raw: &ValueMap, env: &DateEnv) -> Option<RecurringDef> {
    let days = raw.get("daysOfWeek");
    let start_time = raw.get("startTime").and_then(|v| Duration::from_value(v).ok());
    let end_time = raw.get("endTime").and_then(|v| Duration::from_value(v).ok());
    if days.is_none() && start_time.is_none() && end_time.is_none() {
        return None;
    }
    let marker = |key: &str| raw.get(key).and_then(|v| env.create_marker(v)).map(|p| p.marker);

    Some(RecurringDef {
        days_of_week: days
            .map(Value::int_list)
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.rem_euclid(7) as u32)
            .collect(),
        start_time,
        end_time,
        start_recur: marker("startRecur"),
        end_recur: marker("endRecur"),
    })
}

/// Parse a list of raw events into a store
pub fn parse_events(raw_events: &[Value], source_id: Option<&SourceId>, ctx: &EventParseContext<'_>) -> EventStore {
    let mut store = EventStore::new();
    for raw in raw_events.iter().filter_map(Value::as_map) {
        if let Some((def, instance)) = parse_event(raw, source_id, ctx) {
            store.add(def, instance);
        }
    }
    store
}

/// Generate instances of recurring definitions inside `framing`
///
/// Instances of non-recurring definitions are kept as they are; instances of
/// recurring ones are regenerated from scratch.
pub fn expand_recurring(store: &EventStore, framing: &DateRange, env: &DateEnv, computed: &ComputedOptions) -> EventStore {
    let mut instances: IndexMap<InstanceId, EventInstance> = store
        .instances
        .iter()
        .filter(|(_, inst)| {
            store
                .defs
                .get(&inst.def_id)
                .is_some_and(|d| d.recurring.is_none())
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for def in store.defs.values() {
        let Some(rule) = &def.recurring else { continue };
        for range in expand_recurring_ranges(def, rule, framing, env, computed) {
            let instance = EventInstance::new(def.def_id.clone(), range);
            instances.insert(instance.instance_id.clone(), instance);
        }
    }

    EventStore {
        defs: store.defs.clone(),
        instances,
    }
}

fn expand_recurring_ranges(
    def: &EventDef,
    rule: &RecurringDef,
    framing: &DateRange,
    env: &DateEnv,
    computed: &ComputedOptions,
) -> Vec<DateRange> {
    let duration = match (rule.start_time, rule.end_time) {
        (Some(start), Some(end)) => Duration::ms(
            end.as_rough_ms() - start.as_rough_ms(),
        ),
        (None, Some(end)) => end,
        _ if def.all_day => computed.default_all_day_event_duration,
        _ => computed.default_timed_event_duration,
    };

    let mut ranges = Vec::new();
    let mut day = date::start_of_day(framing.start);
    while day < framing.end {
        let in_rule = rule.days_of_week.is_empty() || rule.days_of_week.contains(&date::day_of_week(day));
        let after_start = rule.start_recur.is_none_or(|s| day >= date::start_of_day(s));
        let before_end = rule.end_recur.is_none_or(|e| day < e);
        if in_rule && after_start && before_end {
            let start = match rule.start_time {
                Some(t) if !def.all_day => env.add(day, &t),
                _ => day,
            };
            let end = env.add(start, &duration);
            if end > framing.start {
                ranges.push(DateRange::new(start, end));
            }
        }
        day = date::add_days(day, 1);
    }
    ranges
}

/// Union of two stores; `b` wins on id collisions
pub fn merge_event_stores(a: &EventStore, b: &EventStore) -> EventStore {
    let mut merged = a.clone();
    merged.defs.extend(b.defs.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .instances
        .extend(b.instances.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Keep only definitions matching `keep`, along with their instances
pub fn filter_event_store_defs(store: &EventStore, keep: impl Fn(&EventDef) -> bool) -> EventStore {
    let defs: IndexMap<DefId, EventDef> = store
        .defs
        .iter()
        .filter(|(_, d)| keep(d))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let instances = store
        .instances
        .iter()
        .filter(|(_, i)| defs.contains_key(&i.def_id))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    EventStore { defs, instances }
}

pub fn exclude_events_by_source_id(store: &EventStore, source_id: &SourceId) -> EventStore {
    filter_event_store_defs(store, |d| d.source_id.as_ref() != Some(source_id))
}

/// Remove everything in `sub` from `master`
pub fn exclude_sub_event_store(master: &EventStore, sub: &EventStore) -> EventStore {
    let defs: IndexMap<DefId, EventDef> = master
        .defs
        .iter()
        .filter(|(id, _)| !sub.defs.contains_key(*id))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let instances = master
        .instances
        .iter()
        .filter(|(id, inst)| !sub.instances.contains_key(*id) && defs.contains_key(&inst.def_id))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    EventStore { defs, instances }
}

/// Move timed, non-recurring instances from one environment's wall clock to another's
///
/// All-day and recurring events do not depend on the time zone.
pub fn rezone_event_store_dates(store: &EventStore, old_env: &DateEnv, new_env: &DateEnv) -> EventStore {
    let instances = store
        .instances
        .iter()
        .map(|(id, inst)| {
            let def = store.defs.get(&inst.def_id);
            if def.is_none_or(|d| d.all_day || d.recurring.is_some()) {
                return (id.clone(), inst.clone());
            }
            let keep_forced = !new_env.can_compute_offset();
            let moved = EventInstance {
                range: DateRange::new(
                    new_env.rezone_marker(inst.range.start, inst.forced_start_tz_offset, old_env),
                    new_env.rezone_marker(inst.range.end, inst.forced_end_tz_offset, old_env),
                ),
                forced_start_tz_offset: inst.forced_start_tz_offset.filter(|_| keep_forced),
                forced_end_tz_offset: inst.forced_end_tz_offset.filter(|_| keep_forced),
                ..inst.clone()
            };
            (id.clone(), moved)
        })
        .collect();

    EventStore {
        defs: store.defs.clone(),
        instances,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::computed::build_computed_options;
    use crate::date_env::{parse_iso, DateEnvSettings};
    use crate::locale::{build_locale, organize_raw_locales};
    use crate::options::default_options;
    use crate::value_map;
    use std::rc::Rc;

    pub(crate) fn env(time_zone: &str) -> DateEnv {
        let info = organize_raw_locales(&Value::Null, &[]);
        DateEnv::new(DateEnvSettings {
            time_zone: time_zone.to_string(),
            locale: Rc::new(build_locale("en", &info.map)),
            week_number_calculation: "local".to_string(),
            first_day: None,
            week_text: None,
            named_time_zone_impl: None,
        })
    }

    fn m(s: &str) -> DateMarker {
        parse_iso(s).unwrap().marker
    }

    fn parse(raw: Vec<ValueMap>, env: &DateEnv) -> EventStore {
        let computed = build_computed_options(&default_options());
        let ctx = EventParseContext {
            date_env: env,
            computed: &computed,
            default_all_day: None,
            force_event_duration: false,
        };
        let raw: Vec<Value> = raw.into_iter().map(Value::Map).collect();
        parse_events(&raw, Some(&SourceId::new("s1")), &ctx)
    }

    #[test]
    fn test_parse_all_day_and_timed() {
        let env = env("UTC");
        let store = parse(
            vec![
                value_map! { "id" => "a", "title" => "Holiday", "start" => "2024-05-01" },
                value_map! { "id" => "b", "start" => "2024-05-02T10:00:00", "room" => "4B" },
            ],
            &env,
        );
        assert_eq!(store.defs.len(), 2);
        let holiday = store.find_by_public_id("a").unwrap();
        assert!(holiday.all_day);
        let inst = store.instances_of(&holiday.def_id).next().unwrap();
        assert_eq!(inst.range.end, m("2024-05-02"));

        let meeting = store.find_by_public_id("b").unwrap();
        assert!(!meeting.all_day);
        assert_eq!(meeting.extended_props.get("room"), Some(&Value::from("4B")));
        let inst = store.instances_of(&meeting.def_id).next().unwrap();
        assert_eq!(inst.range.end, m("2024-05-02T11:00:00"));
    }

    #[test]
    fn test_missing_start_is_skipped() {
        let env = env("UTC");
        let store = parse(vec![value_map! { "title" => "no date" }], &env);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expand_recurring_weekly() {
        let env = env("UTC");
        let computed = build_computed_options(&default_options());
        let store = parse(
            vec![value_map! {
                "title" => "Standup",
                "daysOfWeek" => vec![1i64, 3],
                "startTime" => "09:00",
                "endTime" => "09:15",
            }],
            &env,
        );
        assert!(store.instances.is_empty());

        // 2024-01-01 is a Monday
        let week = DateRange::new(m("2024-01-01"), m("2024-01-08"));
        let expanded = expand_recurring(&store, &week, &env, &computed);
        assert_eq!(expanded.instances.len(), 2);
        let first = expanded.instances.values().next().unwrap();
        assert_eq!(first.range.start, m("2024-01-01T09:00:00"));
        assert_eq!(first.range.end, m("2024-01-01T09:15:00"));
    }

    #[test]
    fn test_exclusions() {
        let env = env("UTC");
        let a = parse(vec![value_map! { "id" => "a", "start" => "2024-05-01" }], &env);
        let mut b = parse(vec![value_map! { "id" => "b", "start" => "2024-05-01" }], &env);
        for def in b.defs.values_mut() {
            def.source_id = None;
        }
        let merged = merge_event_stores(&a, &b);
        assert_eq!(merged.defs.len(), 2);

        let without_source = exclude_events_by_source_id(&merged, &SourceId::new("s1"));
        assert_eq!(without_source.defs.len(), 1);
        assert!(without_source.find_by_public_id("b").is_some());

        let without_b = exclude_sub_event_store(&merged, &b);
        assert!(without_b.find_by_public_id("b").is_none());
        assert_eq!(without_b.instances.len(), 1);
    }

    #[test]
    fn test_rezone_skips_all_day() {
        let utc = env("UTC");
        let tokyo = env("+09:00");
        let store = parse(
            vec![
                value_map! { "id" => "day", "start" => "2024-05-01" },
                value_map! { "id" => "timed", "start" => "2024-05-01T10:00:00" },
            ],
            &utc,
        );
        let rezoned = rezone_event_store_dates(&store, &utc, &tokyo);
        let day = rezoned.find_by_public_id("day").unwrap();
        let timed = rezoned.find_by_public_id("timed").unwrap();
        assert_eq!(rezoned.instances_of(&day.def_id).next().unwrap().range.start, m("2024-05-01"));
        assert_eq!(
            rezoned.instances_of(&timed.def_id).next().unwrap().range.start,
            m("2024-05-01T19:00:00")
        );
    }
}
