//! The bundles a manager derives and publishes
//!
//! - [`OptionsData`] - everything resolved from the calendar-wide option layers
//! - [`CurrentViewData`] - everything resolved for the active view
//! - [`ManagerState`] - the reduced state, advanced once per action
//! - [`CalendarData`] - the published snapshot combining the three
//!
//! Bundles are shared through `Rc` and rebuilt only when an input changes,
//! so two snapshots can be compared bundle by bundle with `Rc::ptr_eq`.

use crate::api::CalendarApi;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::manager::{DataAccessor, Dispatcher};
use crate::plugin::PluginHooks;
use crate::view_api::ViewApi;
use kalends_core::action::{DateSpan, EventInteractionState};
use kalends_core::computed::ComputedOptions;
use kalends_core::event_source::{parse_event_source, EventSourceContext};
use kalends_core::event_ui::{EventUi, EventUiHash};
use kalends_core::locale::RawLocaleMap;
use kalends_core::toolbar::ToolbarConfig;
use kalends_core::{
    Action, DateEnv, DateMarker, DateProfile, DateProfileGenerator, EventSource, EventSourceHash, EventStore,
    InstanceId, OptionSet, Theme, Value, ValueMap, ViewSpec, ViewSpecHash,
};
use std::rc::Rc;

/// Resolved calendar-wide configuration
pub struct OptionsData {
    /// Defaults, locale defaults, overrides and dynamic overrides, merged
    pub calendar_options: OptionSet,
    pub computed_calendar_options: Rc<ComputedOptions>,
    pub available_raw_locales: Rc<RawLocaleMap>,
    pub plugin_hooks: Rc<PluginHooks>,
    pub date_env: Rc<DateEnv>,
    pub view_specs: Rc<ViewSpecHash>,
    pub theme: Rc<dyn Theme>,
    pub toolbar_config: Rc<ToolbarConfig>,
    pub locale_defaults: OptionSet,
}

/// Resolved configuration of the active view
pub struct CurrentViewData {
    pub view_spec: Rc<ViewSpec>,
    /// Calendar options with the view's own defaults and overrides layered in
    pub options: OptionSet,
    pub computed_options: Rc<ComputedOptions>,
    pub date_profile_generator: Rc<dyn DateProfileGenerator>,
    pub view_api: Rc<ViewApi>,
}

/// Reduced state
///
/// Invariant: `current_date` lies inside `date_profile.current_range`.
#[derive(Debug, Clone)]
pub struct ManagerState {
    /// Options set at runtime through `SetOption`
    pub dynamic_option_overrides: OptionSet,
    pub current_view_type: String,
    pub current_date: DateMarker,
    pub date_profile: DateProfile,
    pub business_hours: Rc<EventStore>,
    pub event_sources: Rc<EventSourceHash>,
    /// UI base per event def; the `""` entry is the calendar-wide base
    pub event_ui_bases: Rc<EventUiHash>,
    /// Number of sources currently fetching
    pub loading_level: usize,
    pub event_store: Rc<EventStore>,
    /// What the render layer should draw; lags `event_store` while loading
    pub renderable_event_store: Rc<EventStore>,
    pub date_selection: Option<DateSpan>,
    pub event_selection: Option<InstanceId>,
    pub event_drag: Option<EventInteractionState>,
    pub event_resize: Option<EventInteractionState>,
    pub selection_config: Rc<EventUi>,
    /// Fields contributed by plugin reducers
    pub extra: ValueMap,
}

/// What plugin reducers get to work with
pub struct CalendarContext {
    pub date_env: Rc<DateEnv>,
    pub options: OptionSet,
    pub computed_options: Rc<ComputedOptions>,
    pub plugin_hooks: Rc<PluginHooks>,
    pub calendar_api: Rc<dyn CalendarApi>,
    pub dispatcher: Dispatcher,
    pub emitter: Rc<Emitter>,
    pub accessor: DataAccessor,
}

impl CalendarContext {
    /// Queue an action; it runs after the current one finishes
    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.dispatcher.dispatch(action)
    }
}

/// The published snapshot
///
/// A new value is built on every rebuild; nothing in it is mutated
/// afterwards.
pub struct CalendarData {
    pub view_title: String,
    pub calendar_api: Rc<dyn CalendarApi>,
    pub dispatcher: Dispatcher,
    pub emitter: Rc<Emitter>,
    pub accessor: DataAccessor,
    pub options: Rc<OptionsData>,
    pub view: Rc<CurrentViewData>,
    pub state: ManagerState,
}

impl CalendarData {
    pub fn calendar_options(&self) -> &OptionSet {
        &self.options.calendar_options
    }

    pub fn view_options(&self) -> &OptionSet {
        &self.view.options
    }

    pub fn date_env(&self) -> &Rc<DateEnv> {
        &self.options.date_env
    }

    pub fn view_type(&self) -> &str {
        &self.state.current_view_type
    }

    pub fn date_profile(&self) -> &DateProfile {
        &self.state.date_profile
    }

    pub fn event_sources(&self) -> &EventSourceHash {
        &self.state.event_sources
    }

    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.dispatcher.dispatch(action)
    }

    pub fn event_source_context(&self) -> EventSourceContext<'_> {
        EventSourceContext {
            defs: &self.options.plugin_hooks.event_source_defs,
            options: &self.options.calendar_options,
            date_env: &self.options.date_env,
        }
    }

    /// Parse raw source input against this snapshot's source defs
    pub fn parse_event_source(&self, raw: &Value) -> Option<EventSource> {
        parse_event_source(raw, &self.event_source_context())
    }
}
