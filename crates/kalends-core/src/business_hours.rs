//! Business hours as recurring background events

use crate::computed::ComputedOptions;
use crate::date_env::DateEnv;
use crate::event_store::{parse_events, EventParseContext, EventStore};
use crate::memo::Same;
use crate::value::{Value, ValueMap};
use crate::value_map;
use std::rc::Rc;

/// What business hours are parsed against
#[derive(Clone)]
pub struct BusinessHoursContext {
    pub input: Option<Value>,
    pub date_env: Rc<DateEnv>,
    pub computed: Rc<ComputedOptions>,
}

impl Same for BusinessHoursContext {
    fn same(&self, other: &Self) -> bool {
        self.input == other.input && self.date_env.same(&other.date_env) && self.computed.same(&other.computed)
    }
}

fn defaults() -> ValueMap {
    value_map! {
        "startTime" => "09:00",
        "endTime" => "17:00",
        "daysOfWeek" => vec![1i64, 2, 3, 4, 5],
        "display" => "inverse-background",
        "classNames" => "fc-non-business",
        "groupId" => "_businessHours",
    }
}

/// Turn the `businessHours` option into an event store
///
/// `true` means Monday to Friday, 09:00 to 17:00. A map or a list of maps
/// fills in whatever keys it leaves out from those defaults.
pub fn parse_business_hours(ctx: &BusinessHoursContext) -> EventStore {
    let raw: Vec<Value> = match &ctx.input {
        Some(Value::Bool(true)) => vec![Value::Map(defaults())],
        Some(Value::Map(map)) => vec![Value::Map(with_defaults(map))],
        Some(Value::List(list)) => list
            .iter()
            .filter_map(Value::as_map)
            .map(|m| Value::Map(with_defaults(m)))
            .collect(),
        _ => Vec::new(),
    };

    let parse_ctx = EventParseContext {
        date_env: &ctx.date_env,
        computed: &ctx.computed,
        default_all_day: None,
        force_event_duration: false,
    };
    parse_events(&raw, None, &parse_ctx)
}

fn with_defaults(map: &ValueMap) -> ValueMap {
    let mut merged = defaults();
    merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed::build_computed_options;
    use crate::date::DateRange;
    use crate::date_env::parse_iso;
    use crate::event_store::{expand_recurring, tests::env};
    use crate::options::default_options;

    fn ctx(input: Option<Value>) -> BusinessHoursContext {
        BusinessHoursContext {
            input,
            date_env: Rc::new(env("UTC")),
            computed: Rc::new(build_computed_options(&default_options())),
        }
    }

    #[test]
    fn test_true_means_weekdays() {
        let ctx = ctx(Some(Value::Bool(true)));
        let store = parse_business_hours(&ctx);
        assert_eq!(store.defs.len(), 1);
        let def = store.defs.values().next().unwrap();
        assert_eq!(def.group_id, "_businessHours");
        assert!(!def.all_day);

        let week = DateRange::new(parse_iso("2024-05-12").unwrap().marker, parse_iso("2024-05-19").unwrap().marker);
        let expanded = expand_recurring(&store, &week, &ctx.date_env, &ctx.computed);
        assert_eq!(expanded.instances.len(), 5);
    }

    #[test]
    fn test_absent_or_false_is_empty() {
        assert!(parse_business_hours(&ctx(None)).is_empty());
        assert!(parse_business_hours(&ctx(Some(Value::Bool(false)))).is_empty());
    }

    #[test]
    fn test_partial_map_keeps_defaults() {
        let store = parse_business_hours(&ctx(Some(Value::Map(value_map! { "daysOfWeek" => vec![6i64] }))));
        let rule = store.defs.values().next().unwrap().recurring.clone().unwrap();
        assert_eq!(rule.days_of_week, vec![6]);
        assert!(rule.start_time.is_some());
    }
}
