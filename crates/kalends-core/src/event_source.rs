//! Event sources and their fetch bookkeeping
//!
//! A source remembers which fetch it is waiting on (`latest_fetch_id`) and
//! which range it last covered. Responses for any other fetch id are stale
//! and dropped. Fetching itself belongs to the [`EventSourceDef`] that
//! recognized the source; results that are available immediately come back
//! as follow-up actions for the caller to dispatch.

use crate::action::Action;
use crate::date::DateRange;
use crate::date_env::DateEnv;
use crate::event_ui::{process_unscoped_ui_props, EventUi};
use crate::identity::{next_uid, SourceId};
use crate::options::OptionSet;
use crate::value::{Value, ValueMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A configured provider of events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    pub source_id: SourceId,
    /// Index of the handling def in the resolved plugin hooks
    pub source_def_id: usize,
    /// Whatever the def extracted from the raw input
    pub meta: Value,
    /// The raw input, used to match sources against option changes
    pub raw: Value,
    pub public_id: String,
    pub is_fetching: bool,
    pub latest_fetch_id: Option<String>,
    pub fetch_range: Option<DateRange>,
    pub default_all_day: Option<bool>,
    pub ui: EventUi,
    pub extended_props: ValueMap,
}

pub type EventSourceHash = IndexMap<SourceId, EventSource>;

/// Outcome of asking a def to fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Raw events are available now
    Ready(Vec<Value>),
    Failed(String),
    /// The embedder will dispatch `ReceiveEvents` or `ReceiveEventError` later
    Pending,
}

/// One fetch request
pub struct FetchArgs<'a> {
    pub source: &'a EventSource,
    pub range: Option<&'a DateRange>,
    pub is_refetch: bool,
    pub date_env: &'a DateEnv,
}

/// A kind of event source, contributed by a plugin
pub trait EventSourceDef {
    /// Recognize a normalized raw source; returns its meta when handled
    fn parse_meta(&self, raw: &ValueMap) -> Option<Value>;

    /// Sources that ignore the range are fetched once and never go stale
    fn ignore_range(&self) -> bool {
        false
    }

    fn fetch(&self, args: &FetchArgs<'_>) -> FetchResult;
}

/// Events given inline, as a list or as `{ events: [...] }`
#[derive(Debug, Default)]
pub struct ArrayEventSourceDef;

impl EventSourceDef for ArrayEventSourceDef {
    fn parse_meta(&self, raw: &ValueMap) -> Option<Value> {
        match raw.get("events") {
            Some(events @ Value::List(_)) => Some(events.clone()),
            _ => None,
        }
    }

    fn ignore_range(&self) -> bool {
        true
    }

    fn fetch(&self, args: &FetchArgs<'_>) -> FetchResult {
        FetchResult::Ready(args.source.meta.as_list().unwrap_or_default().to_vec())
    }
}

/// What the source reducers need from the calendar
#[derive(Clone, Copy)]
pub struct EventSourceContext<'a> {
    pub defs: &'a [Rc<dyn EventSourceDef>],
    pub options: &'a OptionSet,
    pub date_env: &'a DateEnv,
}

/// Parse one raw source; `None` when no def recognizes it
pub fn parse_event_source(raw: &Value, ctx: &EventSourceContext<'_>) -> Option<EventSource> {
    let normalized = match raw {
        Value::List(_) => crate::value_map! { "events" => raw.clone() },
        Value::String(url) => crate::value_map! { "url" => url.clone() },
        Value::Map(map) => map.clone(),
        _ => return None,
    };

    for (index, def) in ctx.defs.iter().enumerate().rev() {
        if let Some(meta) = def.parse_meta(&normalized) {
            return Some(EventSource {
                source_id: SourceId::generate(),
                source_def_id: index,
                meta,
                raw: raw.clone(),
                public_id: normalized.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                is_fetching: false,
                latest_fetch_id: None,
                fetch_range: None,
                default_all_day: normalized.get("defaultAllDay").and_then(Value::as_bool),
                ui: process_unscoped_ui_props(&normalized),
                extended_props: normalized
                    .get("extendedProps")
                    .and_then(Value::as_map)
                    .cloned()
                    .unwrap_or_default(),
            });
        }
    }
    tracing::warn!(source = %raw, "no event source def recognizes this source");
    None
}

/// Sources from the `events`, `initialEvents` and `eventSources` options
pub fn parse_initial_sources(options: &OptionSet, ctx: &EventSourceContext<'_>) -> Vec<EventSource> {
    let mut raw: Vec<&Value> = Vec::new();
    if let Some(events) = options.get("events") {
        raw.push(events);
    }
    if let Some(initial) = options.get("initialEvents") {
        raw.push(initial);
    }
    match options.get("eventSources") {
        Some(Value::List(list)) => raw.extend(list.iter()),
        Some(single) => raw.push(single),
        None => {}
    }
    raw.into_iter().filter_map(|r| parse_event_source(r, ctx)).collect()
}

/// Sources after construction, with the dirty ones already fetching
pub fn init_event_sources(
    options: &OptionSet,
    active_range: Option<&DateRange>,
    ctx: &EventSourceContext<'_>,
) -> (EventSourceHash, Vec<Action>) {
    let sources = parse_initial_sources(options, ctx);
    add_sources(&EventSourceHash::new(), sources, active_range, ctx)
}

/// Advance the sources for one action
///
/// Returns the follow-up actions produced by fetches that completed
/// synchronously.
pub fn reduce_event_sources(
    sources: &EventSourceHash,
    action: &Action,
    active_range: Option<&DateRange>,
    ctx: &EventSourceContext<'_>,
) -> (EventSourceHash, Vec<Action>) {
    match action {
        Action::AddEventSources { sources: added } => add_sources(sources, added.clone(), active_range, ctx),
        Action::RemoveEventSource { source_id } => {
            let mut next = sources.clone();
            next.shift_remove(source_id);
            (next, Vec::new())
        }
        Action::Prev | Action::Next | Action::ChangeDate { .. } | Action::ChangeViewType { .. } => match active_range {
            Some(range) => fetch_dirty_sources(sources, range, ctx),
            None => (sources.clone(), Vec::new()),
        },
        Action::FetchEventSources { source_ids, is_refetch } => {
            let ids: Vec<SourceId> = match source_ids {
                Some(ids) => ids.clone(),
                None => non_static_ids(sources, ctx),
            };
            fetch_sources_by_ids(sources, &ids, active_range, *is_refetch, ctx)
        }
        Action::ReceiveEvents { source_id, fetch_id, fetch_range, .. }
        | Action::ReceiveEventError { source_id, fetch_id, fetch_range, .. } => {
            (receive_response(sources, source_id, fetch_id, fetch_range.as_ref()), Vec::new())
        }
        Action::RemoveAllEventSources => (EventSourceHash::new(), Vec::new()),
        _ => (sources.clone(), Vec::new()),
    }
}

/// Refetch every range-dependent source after a time zone change
pub fn reduce_event_sources_new_time_zone(
    sources: &EventSourceHash,
    active_range: Option<&DateRange>,
    ctx: &EventSourceContext<'_>,
) -> (EventSourceHash, Vec<Action>) {
    let ids = non_static_ids(sources, ctx);
    fetch_sources_by_ids(sources, &ids, active_range, true, ctx)
}

/// Number of sources currently fetching
pub fn compute_event_source_loading_level(sources: &EventSourceHash) -> usize {
    sources.values().filter(|s| s.is_fetching).count()
}

fn add_sources(
    existing: &EventSourceHash,
    added: Vec<EventSource>,
    fetch_range: Option<&DateRange>,
    ctx: &EventSourceContext<'_>,
) -> (EventSourceHash, Vec<Action>) {
    let mut hash: EventSourceHash = added.into_iter().map(|s| (s.source_id.clone(), s)).collect();
    let mut follow_ups = Vec::new();
    if let Some(range) = fetch_range {
        (hash, follow_ups) = fetch_dirty_sources(&hash, range, ctx);
    }
    let mut merged = existing.clone();
    merged.extend(hash);
    (merged, follow_ups)
}

fn does_source_need_range(source: &EventSource, ctx: &EventSourceContext<'_>) -> bool {
    ctx.defs
        .get(source.source_def_id)
        .is_some_and(|def| !def.ignore_range())
}

fn non_static_ids(sources: &EventSourceHash, ctx: &EventSourceContext<'_>) -> Vec<SourceId> {
    sources
        .values()
        .filter(|s| does_source_need_range(s, ctx))
        .map(|s| s.source_id.clone())
        .collect()
}

fn is_source_dirty(source: &EventSource, fetch_range: &DateRange, ctx: &EventSourceContext<'_>) -> bool {
    if !does_source_need_range(source, ctx) {
        return source.latest_fetch_id.is_none();
    }
    !ctx.options.flag("lazyFetching", true)
        || source.is_fetching
        || source.fetch_range.is_none_or(|covered| !covered.contains_range(fetch_range))
}

fn fetch_dirty_sources(
    sources: &EventSourceHash,
    fetch_range: &DateRange,
    ctx: &EventSourceContext<'_>,
) -> (EventSourceHash, Vec<Action>) {
    let dirty: Vec<SourceId> = sources
        .values()
        .filter(|s| is_source_dirty(s, fetch_range, ctx))
        .map(|s| s.source_id.clone())
        .collect();
    fetch_sources_by_ids(sources, &dirty, Some(fetch_range), false, ctx)
}

fn fetch_sources_by_ids(
    sources: &EventSourceHash,
    ids: &[SourceId],
    fetch_range: Option<&DateRange>,
    is_refetch: bool,
    ctx: &EventSourceContext<'_>,
) -> (EventSourceHash, Vec<Action>) {
    let mut follow_ups = Vec::new();
    let next = sources
        .iter()
        .map(|(id, source)| {
            if !ids.contains(id) {
                return (id.clone(), source.clone());
            }
            let (fetched, follow_up) = fetch_source(source, fetch_range, is_refetch, ctx);
            follow_ups.extend(follow_up);
            (id.clone(), fetched)
        })
        .collect();
    (next, follow_ups)
}

fn fetch_source(
    source: &EventSource,
    fetch_range: Option<&DateRange>,
    is_refetch: bool,
    ctx: &EventSourceContext<'_>,
) -> (EventSource, Option<Action>) {
    let fetch_id = next_uid();
    let fetching = EventSource {
        is_fetching: true,
        latest_fetch_id: Some(fetch_id.clone()),
        ..source.clone()
    };
    let Some(def) = ctx.defs.get(source.source_def_id) else {
        tracing::warn!(source_id = %source.source_id, "event source def missing");
        return (source.clone(), None);
    };

    let result = def.fetch(&FetchArgs {
        source: &fetching,
        range: fetch_range,
        is_refetch,
        date_env: ctx.date_env,
    });
    tracing::debug!(source_id = %source.source_id, fetch_id, "fetching event source");

    let follow_up = match result {
        FetchResult::Ready(raw_events) => Some(Action::ReceiveEvents {
            source_id: source.source_id.clone(),
            fetch_id,
            fetch_range: fetch_range.copied(),
            raw_events,
        }),
        FetchResult::Failed(error) => Some(Action::ReceiveEventError {
            source_id: source.source_id.clone(),
            fetch_id,
            fetch_range: fetch_range.copied(),
            error,
        }),
        FetchResult::Pending => None,
    };
    (fetching, follow_up)
}

fn receive_response(
    sources: &EventSourceHash,
    source_id: &SourceId,
    fetch_id: &str,
    fetch_range: Option<&DateRange>,
) -> EventSourceHash {
    let mut next = sources.clone();
    if let Some(source) = next.get_mut(source_id) {
        if source.latest_fetch_id.as_deref() == Some(fetch_id) {
            source.is_fetching = false;
            source.fetch_range = fetch_range.copied();
        }
    }
    next
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::date_env::parse_iso;
    use crate::event_store::tests::env;
    use crate::value_map;
    use std::cell::RefCell;

    /// Range-dependent source whose responses the test delivers by hand
    #[derive(Default)]
    pub(crate) struct DeferredDef {
        pub(crate) fetches: RefCell<Vec<String>>,
    }

    impl EventSourceDef for DeferredDef {
        fn parse_meta(&self, raw: &ValueMap) -> Option<Value> {
            raw.get("deferred").cloned()
        }

        fn fetch(&self, args: &FetchArgs<'_>) -> FetchResult {
            self.fetches
                .borrow_mut()
                .push(args.source.latest_fetch_id.clone().unwrap_or_default());
            FetchResult::Pending
        }
    }

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(parse_iso(a).unwrap().marker, parse_iso(b).unwrap().marker)
    }

    #[test]
    fn test_array_source_fetches_immediately() {
        let env = env("UTC");
        let defs: Vec<Rc<dyn EventSourceDef>> = vec![Rc::new(ArrayEventSourceDef)];
        let options = OptionSet::new(value_map! {
            "events" => vec![Value::Map(value_map! { "title" => "a", "start" => "2024-05-01" })],
        });
        let ctx = EventSourceContext { defs: &defs, options: &options, date_env: &env };
        let may = range("2024-05-01", "2024-06-01");
        let (sources, follow_ups) = init_event_sources(&options, Some(&may), &ctx);

        assert_eq!(sources.len(), 1);
        assert_eq!(compute_event_source_loading_level(&sources), 1);
        assert_eq!(follow_ups.len(), 1);
        let Action::ReceiveEvents { source_id, raw_events, .. } = &follow_ups[0] else {
            panic!("expected ReceiveEvents");
        };
        assert_eq!(raw_events.len(), 1);

        let (sources, _) = reduce_event_sources(&sources, &follow_ups[0], Some(&may), &ctx);
        assert_eq!(compute_event_source_loading_level(&sources), 0);

        // static sources are not refetched on navigation
        let (sources, follow_ups) = reduce_event_sources(&sources, &Action::Next, Some(&range("2024-06-01", "2024-07-01")), &ctx);
        assert!(follow_ups.is_empty());
        assert!(!sources[source_id].is_fetching);
    }

    #[test]
    fn test_stale_responses_are_ignored() {
        let env = env("UTC");
        let deferred = Rc::new(DeferredDef::default());
        let defs: Vec<Rc<dyn EventSourceDef>> = vec![Rc::new(ArrayEventSourceDef), deferred.clone()];
        let options = OptionSet::new(value_map! { "eventSources" => vec![Value::Map(value_map! { "deferred" => true })] });
        let ctx = EventSourceContext { defs: &defs, options: &options, date_env: &env };
        let may = range("2024-05-01", "2024-06-01");

        let (sources, follow_ups) = init_event_sources(&options, Some(&may), &ctx);
        assert!(follow_ups.is_empty());
        let id = sources.keys().next().unwrap().clone();
        let first_fetch = deferred.fetches.borrow()[0].clone();

        // navigating past the fetched range starts a second fetch
        let june = range("2024-06-01", "2024-07-01");
        let (sources, _) = reduce_event_sources(&sources, &Action::Next, Some(&june), &ctx);
        assert_eq!(deferred.fetches.borrow().len(), 2);

        let stale = Action::ReceiveEvents {
            source_id: id.clone(),
            fetch_id: first_fetch,
            fetch_range: Some(may),
            raw_events: Vec::new(),
        };
        let (sources, _) = reduce_event_sources(&sources, &stale, Some(&june), &ctx);
        assert!(sources[&id].is_fetching);

        let fresh = Action::ReceiveEvents {
            source_id: id.clone(),
            fetch_id: deferred.fetches.borrow()[1].clone(),
            fetch_range: Some(june),
            raw_events: Vec::new(),
        };
        let (sources, _) = reduce_event_sources(&sources, &fresh, Some(&june), &ctx);
        assert!(!sources[&id].is_fetching);
        assert_eq!(sources[&id].fetch_range, Some(june));

        // a covered range is not refetched while lazy fetching is on
        let (_, _) = reduce_event_sources(&sources, &Action::Prev, Some(&june), &ctx);
        assert_eq!(deferred.fetches.borrow().len(), 2);
    }

    #[test]
    fn test_unrecognized_source_is_skipped() {
        let env = env("UTC");
        let defs: Vec<Rc<dyn EventSourceDef>> = vec![Rc::new(ArrayEventSourceDef)];
        let options = OptionSet::empty();
        let ctx = EventSourceContext { defs: &defs, options: &options, date_env: &env };
        assert!(parse_event_source(&Value::from("https://example.com/feed"), &ctx).is_none());
    }
}
