//! Actions consumed by the reducers
//!
//! Every state change goes through an [`Action`]. Actions are plain data so
//! they can be logged, queued and replayed.

use crate::date::{DateMarker, DateRange};
use crate::event_source::EventSource;
use crate::event_store::EventStore;
use crate::identity::{InstanceId, SourceId};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A selected span of dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateSpan {
    pub range: DateRange,
    pub all_day: bool,
}

/// An in-progress drag or resize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInteractionState {
    /// Events as they were before the interaction
    pub affected_events: EventStore,
    /// Events as they would be if dropped now
    pub mutated_events: EventStore,
    /// Whether an existing event (not external content) is being moved
    pub is_event: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Prev,
    Next,
    ChangeDate {
        date_marker: DateMarker,
    },
    ChangeViewType {
        view_type: String,
        date_marker: Option<DateMarker>,
    },
    SetOption {
        option_name: String,
        value: Value,
    },
    SelectDates {
        selection: DateSpan,
    },
    UnselectDates,
    SelectEvent {
        instance_id: InstanceId,
    },
    UnselectEvent,
    SetEventDrag {
        state: EventInteractionState,
    },
    UnsetEventDrag,
    SetEventResize {
        state: EventInteractionState,
    },
    UnsetEventResize,
    AddEventSources {
        sources: Vec<EventSource>,
    },
    RemoveEventSource {
        source_id: SourceId,
    },
    RemoveAllEventSources,
    /// Refetch the given sources, or every range-dependent one when `None`
    FetchEventSources {
        source_ids: Option<Vec<SourceId>>,
        is_refetch: bool,
    },
    ReceiveEvents {
        source_id: SourceId,
        fetch_id: String,
        fetch_range: Option<DateRange>,
        raw_events: Vec<Value>,
    },
    ReceiveEventError {
        source_id: SourceId,
        fetch_id: String,
        fetch_range: Option<DateRange>,
        error: String,
    },
    AddEvents {
        event_store: EventStore,
    },
    ResetEvents {
        event_store: EventStore,
    },
    MergeEvents {
        event_store: EventStore,
    },
    RemoveEvents {
        event_store: EventStore,
    },
    RemoveAllEvents,
    /// Plugin-defined action, handled by plugin reducers
    Custom {
        name: String,
        payload: Value,
    },
}

impl Action {
    /// Short name for logs
    pub fn name(&self) -> &str {
        match self {
            Action::Prev => "PREV",
            Action::Next => "NEXT",
            Action::ChangeDate { .. } => "CHANGE_DATE",
            Action::ChangeViewType { .. } => "CHANGE_VIEW_TYPE",
            Action::SetOption { .. } => "SET_OPTION",
            Action::SelectDates { .. } => "SELECT_DATES",
            Action::UnselectDates => "UNSELECT_DATES",
            Action::SelectEvent { .. } => "SELECT_EVENT",
            Action::UnselectEvent => "UNSELECT_EVENT",
            Action::SetEventDrag { .. } => "SET_EVENT_DRAG",
            Action::UnsetEventDrag => "UNSET_EVENT_DRAG",
            Action::SetEventResize { .. } => "SET_EVENT_RESIZE",
            Action::UnsetEventResize => "UNSET_EVENT_RESIZE",
            Action::AddEventSources { .. } => "ADD_EVENT_SOURCES",
            Action::RemoveEventSource { .. } => "REMOVE_EVENT_SOURCE",
            Action::RemoveAllEventSources => "REMOVE_ALL_EVENT_SOURCES",
            Action::FetchEventSources { .. } => "FETCH_EVENT_SOURCES",
            Action::ReceiveEvents { .. } => "RECEIVE_EVENTS",
            Action::ReceiveEventError { .. } => "RECEIVE_EVENT_ERROR",
            Action::AddEvents { .. } => "ADD_EVENTS",
            Action::ResetEvents { .. } => "RESET_EVENTS",
            Action::MergeEvents { .. } => "MERGE_EVENTS",
            Action::RemoveEvents { .. } => "REMOVE_EVENTS",
            Action::RemoveAllEvents => "REMOVE_ALL_EVENTS",
            Action::Custom { name, .. } => name,
        }
    }

    /// Actions that move the visible date range
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Action::Prev | Action::Next | Action::ChangeDate { .. } | Action::ChangeViewType { .. }
        )
    }
}
