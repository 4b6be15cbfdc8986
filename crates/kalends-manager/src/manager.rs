//! The calendar data manager
//!
//! Owns the reduced [`ManagerState`] and the published [`CalendarData`].
//! Every change goes through an action:
//!
//! ```text
//! dispatch(action)
//!  │
//!  └── TaskRunner (queues; one drain at a time)
//!       ├── handle_action  ← once per queued action
//!       │    └── sub-reducers, plugin reducers, loading notifications
//!       └── update_data    ← once per drained batch
//!            └── snapshot, time zone re-zoning, option change handlers
//! ```
//!
//! Anything that dispatches while an action is being handled (a plugin
//! reducer, a change handler, an event listener) only queues; the queued
//! action runs after the current one, never in the middle of it.

use crate::api::CalendarApi;
use crate::config::Globals;
use crate::data::{CalendarContext, CalendarData, CurrentViewData, ManagerState, OptionsData};
use crate::derive::Derivations;
use crate::emitter::{Emitter, Handler, HandlerBag};
use crate::error::{Error, Result};
use crate::plugin::PluginDef;
use crate::runner::TaskRunner;
use kalends_core::event_source::{
    compute_event_source_loading_level, init_event_sources, reduce_event_sources, reduce_event_sources_new_time_zone,
    EventSourceContext,
};
use kalends_core::event_store::rezone_event_store_dates;
use kalends_core::reducers::{
    get_initial_date, reduce_current_date, reduce_date_profile, reduce_date_selection, reduce_dynamic_option_overrides,
    reduce_event_drag, reduce_event_resize, reduce_event_store, reduce_selected_event, reduce_view_type,
    EventStoreContext,
};
use kalends_core::{Action, DateEnv, EventStore, OptionSet, Same, Value, ValueMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Construction inputs
pub struct CalendarDataManagerProps {
    /// The static option layer; replaced or extended by `reset_options`
    pub option_overrides: OptionSet,
    pub calendar_api: Rc<dyn CalendarApi>,
    /// Plugins on top of the global ones
    pub plugins: Rc<Vec<Rc<PluginDef>>>,
    /// Option-driven emitter handlers, e.g. `loading`
    pub handlers: Rc<HandlerBag>,
    pub on_action: Option<Box<dyn Fn(&Action)>>,
    pub on_data: Option<Box<dyn Fn(&CalendarData)>>,
    pub globals: Globals,
}

impl CalendarDataManagerProps {
    pub fn new(option_overrides: OptionSet, calendar_api: Rc<dyn CalendarApi>) -> Self {
        Self {
            option_overrides,
            calendar_api,
            plugins: Rc::new(Vec::new()),
            handlers: Rc::new(HandlerBag::new()),
            on_action: None,
            on_data: None,
            globals: Globals::standard(),
        }
    }

    pub fn plugin(mut self, plugin: Rc<PluginDef>) -> Self {
        Rc::make_mut(&mut self.plugins).push(plugin);
        self
    }

    /// Register an option-driven handler for an emitted event
    pub fn handler(mut self, name: impl Into<String>, handler: impl Fn(Option<&dyn CalendarApi>, &Value) + 'static) -> Self {
        let handler: Handler = Rc::new(handler);
        Rc::make_mut(&mut self.handlers).insert(name.into(), handler);
        self
    }

    /// Called after each action has been reduced
    pub fn on_action(mut self, callback: impl Fn(&Action) + 'static) -> Self {
        self.on_action = Some(Box::new(callback));
        self
    }

    /// Called with every rebuilt snapshot
    pub fn on_data(mut self, callback: impl Fn(&CalendarData) + 'static) -> Self {
        self.on_data = Some(Box::new(callback));
        self
    }

    pub fn globals(mut self, globals: Globals) -> Self {
        self.globals = globals;
        self
    }
}

/// Cloneable handle that dispatches into a manager
#[derive(Clone)]
pub struct Dispatcher {
    shared: Weak<Shared>,
}

impl Dispatcher {
    /// Queue `action` and process the queue unless a drain is already running
    /// or the manager is paused
    pub fn dispatch(&self, action: Action) -> Result<()> {
        let shared = self.shared.upgrade().ok_or(Error::ManagerDropped)?;
        tracing::trace!(action = action.name(), "dispatch");
        shared.runner.request(action);
        shared.try_drain()
    }
}

/// Cloneable handle that reads a manager's latest snapshot
#[derive(Clone)]
pub struct DataAccessor {
    shared: Weak<Shared>,
}

impl DataAccessor {
    pub fn current_data(&self) -> Result<Rc<CalendarData>> {
        self.shared.upgrade().ok_or(Error::ManagerDropped)?.current_data()
    }
}

struct Shared {
    runner: TaskRunner<Action>,
    derive: RefCell<Derivations>,
    state: RefCell<Option<Rc<ManagerState>>>,
    data: RefCell<Option<Rc<CalendarData>>>,
    option_overrides: RefCell<OptionSet>,
    calendar_api: Rc<dyn CalendarApi>,
    emitter: Rc<Emitter>,
    handlers: Rc<HandlerBag>,
    plugins: Rc<Vec<Rc<PluginDef>>>,
    globals: Globals,
    on_action: Option<Box<dyn Fn(&Action)>>,
    on_data: Option<Box<dyn Fn(&CalendarData)>>,
    this: Weak<Shared>,
}

fn keep_if_equal<T: PartialEq>(prev: &Rc<T>, next: T) -> Rc<T> {
    if **prev == next {
        prev.clone()
    } else {
        Rc::new(next)
    }
}

fn source_context(options_data: &OptionsData) -> EventSourceContext<'_> {
    EventSourceContext {
        defs: &options_data.plugin_hooks.event_source_defs,
        options: &options_data.calendar_options,
        date_env: &options_data.date_env,
    }
}

impl Shared {
    fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            shared: self.this.clone(),
        }
    }

    fn accessor(&self) -> DataAccessor {
        DataAccessor {
            shared: self.this.clone(),
        }
    }

    fn state(&self) -> Result<Rc<ManagerState>> {
        self.state.borrow().clone().ok_or(Error::Uninitialized)
    }

    fn current_data(&self) -> Result<Rc<CalendarData>> {
        self.data.borrow().clone().ok_or(Error::Uninitialized)
    }

    fn try_drain(&self) -> Result<()> {
        self.runner
            .drain(|action| self.handle_action(action), || self.update_data())
    }

    fn options_data(&self, dynamic: &OptionSet) -> Rc<OptionsData> {
        let overrides = self.option_overrides.borrow().clone();
        self.derive
            .borrow_mut()
            .options_data(&overrides, dynamic, &self.globals, &self.plugins)
    }

    fn view_data(&self, options_data: &Rc<OptionsData>, view_type: &str, dynamic: &OptionSet) -> Result<Rc<CurrentViewData>> {
        let overrides = self.option_overrides.borrow().clone();
        self.derive
            .borrow_mut()
            .view_data(options_data, view_type, &overrides, dynamic, &self.globals, &self.accessor())
    }

    fn calendar_context(&self, options_data: &OptionsData) -> CalendarContext {
        CalendarContext {
            date_env: options_data.date_env.clone(),
            options: options_data.calendar_options.clone(),
            computed_options: options_data.computed_calendar_options.clone(),
            plugin_hooks: options_data.plugin_hooks.clone(),
            calendar_api: self.calendar_api.clone(),
            dispatcher: self.dispatcher(),
            emitter: self.emitter.clone(),
            accessor: self.accessor(),
        }
    }

    fn emit_loading_transition(&self, prev_level: usize, next_level: usize) {
        if prev_level == 0 && next_level > 0 {
            tracing::debug!(level = next_level, "loading started");
            self.emitter.trigger("loading", &Value::Bool(true));
        } else if prev_level > 0 && next_level == 0 {
            tracing::debug!("loading finished");
            self.emitter.trigger("loading", &Value::Bool(false));
        }
    }

    /// Build the initial state and the first snapshot
    fn init(&self) -> Result<()> {
        self.runner.pause("");

        let dynamic = OptionSet::empty();
        let options_data = self.options_data(&dynamic);
        let view_type = match options_data.calendar_options.get_str("initialView").filter(|v| !v.is_empty()) {
            Some(view_type) => view_type.to_string(),
            None => options_data.plugin_hooks.initial_view.clone(),
        };
        let view_data = self.view_data(&options_data, &view_type, &dynamic)?;

        self.calendar_api.attach(self.dispatcher(), self.accessor());
        self.emitter.set_this_context(self.calendar_api.clone());
        self.emitter.set_options(self.handlers.clone());

        let ctx = self.calendar_context(&options_data);
        let mut current_date = get_initial_date(&options_data.calendar_options, &options_data.date_env);
        let date_profile = view_data.date_profile_generator.build(current_date, 0, true);
        if !date_profile.active_contains(current_date) || !date_profile.current_range.contains(current_date) {
            current_date = date_profile.current_range.start;
        }

        let (event_sources, follow_ups) = init_event_sources(
            &options_data.calendar_options,
            date_profile.active_range.as_ref(),
            &source_context(&options_data),
        );
        for follow_up in follow_ups {
            self.runner.request(follow_up);
        }
        let event_sources = Rc::new(event_sources);
        let loading_level = compute_event_source_loading_level(&event_sources);
        let event_store = Rc::new(EventStore::new());

        let (view_ui, business_hours, event_ui_bases) = {
            let mut derive = self.derive.borrow_mut();
            let view_ui = derive.view_ui_props(&options_data.calendar_options);
            let business_hours = derive.business_hours(&options_data);
            let bases = derive.event_ui_bases(&event_store, &view_ui, &event_sources);
            (view_ui, business_hours, bases)
        };

        let mut state = ManagerState {
            dynamic_option_overrides: dynamic,
            current_view_type: view_type,
            current_date,
            date_profile,
            business_hours,
            event_sources,
            event_ui_bases,
            loading_level,
            event_store: event_store.clone(),
            renderable_event_store: event_store,
            date_selection: None,
            event_selection: None,
            event_drag: None,
            event_resize: None,
            selection_config: view_ui.selection_config.clone(),
            extra: ValueMap::new(),
        };
        for reducer in &options_data.plugin_hooks.reducers {
            let partial = reducer(None, None, &ctx, &state)?;
            state.extra.extend(partial);
        }

        tracing::debug!(view = %state.current_view_type, date = %state.current_date, sources = state.event_sources.len(), "calendar data manager initialized");
        self.emit_loading_transition(0, loading_level);
        *self.state.borrow_mut() = Some(Rc::new(state));

        self.update_data()?;
        self.runner.resume("")?;
        self.try_drain()
    }

    /// Reduce one action into the next state
    fn handle_action(&self, action: Action) -> Result<()> {
        let prev = self.state()?;
        tracing::debug!(action = action.name(), "handling action");

        let dynamic = reduce_dynamic_option_overrides(&prev.dynamic_option_overrides, &action);
        let options_data = self.options_data(&dynamic);
        let view_type = reduce_view_type(&prev.current_view_type, &action);
        let view_data = self.view_data(&options_data, &view_type, &dynamic)?;
        let ctx = self.calendar_context(&options_data);

        // a different generator means different windowing rules; start over.
        // Compared against the published snapshot, so within one batch every
        // action after a view change rebuilds the profile.
        let generator = view_data.date_profile_generator.clone();
        let generator_changed = self
            .data
            .borrow()
            .as_ref()
            .is_some_and(|data| !data.view.date_profile_generator.same(&generator));
        let date_profile = if generator_changed {
            generator.build(prev.current_date, 0, true)
        } else {
            prev.date_profile.clone()
        };

        let mut current_date = reduce_current_date(prev.current_date, &action);
        let date_profile = reduce_date_profile(&date_profile, &action, current_date, generator.as_ref());
        if !date_profile.current_range.contains(current_date) {
            current_date = date_profile.current_range.start;
        }
        let active_range = date_profile.active_range;

        let (event_sources, follow_ups) =
            reduce_event_sources(&prev.event_sources, &action, active_range.as_ref(), &source_context(&options_data));
        for follow_up in follow_ups {
            self.runner.request(follow_up);
        }
        let event_sources = keep_if_equal(&prev.event_sources, event_sources);
        let loading_level = compute_event_source_loading_level(&event_sources);

        let store_ctx = EventStoreContext {
            date_env: &options_data.date_env,
            computed: &options_data.computed_calendar_options,
            options: &options_data.calendar_options,
        };
        let event_store = keep_if_equal(
            &prev.event_store,
            reduce_event_store(&prev.event_store, &action, &event_sources, active_range.as_ref(), &store_ctx),
        );
        let held_back = loading_level > 0 && !view_data.options.flag("progressiveEventRendering", false);
        let renderable_event_store = if held_back {
            prev.renderable_event_store.clone()
        } else {
            event_store.clone()
        };

        let (view_ui, business_hours, event_ui_bases) = {
            let mut derive = self.derive.borrow_mut();
            let view_ui = derive.view_ui_props(&options_data.calendar_options);
            let business_hours = derive.business_hours(&options_data);
            let bases = derive.event_ui_bases(&renderable_event_store, &view_ui, &event_sources);
            (view_ui, business_hours, bases)
        };

        let mut state = ManagerState {
            dynamic_option_overrides: dynamic,
            current_view_type: view_type,
            current_date,
            date_profile,
            business_hours,
            event_sources,
            event_ui_bases,
            loading_level,
            event_store,
            renderable_event_store,
            date_selection: reduce_date_selection(prev.date_selection.as_ref(), &action),
            event_selection: reduce_selected_event(prev.event_selection.as_ref(), &action),
            event_drag: reduce_event_drag(prev.event_drag.as_ref(), &action),
            event_resize: reduce_event_resize(prev.event_resize.as_ref(), &action),
            selection_config: view_ui.selection_config.clone(),
            extra: ValueMap::new(),
        };
        for reducer in &options_data.plugin_hooks.reducers {
            let partial = reducer(Some(&*prev), Some(&action), &ctx, &state)?;
            state.extra.extend(partial);
        }

        self.emit_loading_transition(prev.loading_level, state.loading_level);
        *self.state.borrow_mut() = Some(Rc::new(state));

        if let Some(on_action) = &self.on_action {
            on_action(&action);
        }
        Ok(())
    }

    /// Sources refetched and stored dates moved into the new zone
    fn rezone_state(&self, state: &ManagerState, old_env: &DateEnv, options_data: &OptionsData) -> ManagerState {
        let (sources, follow_ups) = reduce_event_sources_new_time_zone(
            &state.event_sources,
            state.date_profile.active_range.as_ref(),
            &source_context(options_data),
        );
        for follow_up in follow_ups {
            self.runner.request(follow_up);
        }
        let new_env = &options_data.date_env;
        let event_store = Rc::new(rezone_event_store_dates(&state.event_store, old_env, new_env));
        let renderable_event_store = if Rc::ptr_eq(&state.renderable_event_store, &state.event_store) {
            event_store.clone()
        } else {
            Rc::new(rezone_event_store_dates(&state.renderable_event_store, old_env, new_env))
        };
        let event_sources = Rc::new(sources);

        ManagerState {
            loading_level: compute_event_source_loading_level(&event_sources),
            event_sources,
            event_store,
            renderable_event_store,
            ..state.clone()
        }
    }

    /// Publish a new snapshot from the current state
    fn update_data(&self) -> Result<()> {
        let state = self.state()?;
        let options_data = self.options_data(&state.dynamic_option_overrides);
        let view_data = self.view_data(&options_data, &state.current_view_type, &state.dynamic_option_overrides)?;
        let view_title = self
            .derive
            .borrow_mut()
            .title(&state.date_profile, &view_data.options, &options_data.date_env);

        let old = self
            .data
            .borrow()
            .clone()
            .filter(|old| !old.options.calendar_options.same(&options_data.calendar_options));

        let mut snapshot_state = (*state).clone();
        if let Some(old) = &old {
            let old_zone = old.calendar_options().get("timeZone");
            let new_zone = options_data.calendar_options.get("timeZone");
            if old_zone != new_zone {
                tracing::debug!(from = ?old_zone, to = ?new_zone, "time zone changed, re-zoning events");
                snapshot_state = self.rezone_state(&state, old.date_env(), &options_data);
                *self.state.borrow_mut() = Some(Rc::new(snapshot_state.clone()));
                self.emit_loading_transition(state.loading_level, snapshot_state.loading_level);
            }
        }

        let data = Rc::new(CalendarData {
            view_title,
            calendar_api: self.calendar_api.clone(),
            dispatcher: self.dispatcher(),
            emitter: self.emitter.clone(),
            accessor: self.accessor(),
            options: options_data.clone(),
            view: view_data,
            state: snapshot_state,
        });
        *self.data.borrow_mut() = Some(data.clone());

        if let Some(old) = &old {
            for (name, handler) in &options_data.plugin_hooks.option_change_handlers {
                let after = data.calendar_options().get(name);
                if old.calendar_options().get(name) == after {
                    continue;
                }
                tracing::debug!(option = %name, "option changed");
                handler(after.unwrap_or(&Value::Null), &data)?;
            }
        }

        tracing::debug!(view = %data.state.current_view_type, title = %data.view_title, "data rebuilt");
        if let Some(on_data) = &self.on_data {
            on_data(&data);
        }
        Ok(())
    }
}

/// Orchestrates reducers, memoized derivations and the action runner for
/// one calendar
///
/// # Example
///
/// ```
/// use kalends_core::{value_map, Action, OptionSet};
/// use kalends_manager::{day_grid_plugin, CalendarDataManager, CalendarDataManagerProps, HeadlessCalendar};
///
/// let options = OptionSet::new(value_map! {
///     "timeZone" => "UTC",
///     "initialDate" => "2024-05-15",
/// });
/// let props = CalendarDataManagerProps::new(options, HeadlessCalendar::new()).plugin(day_grid_plugin());
/// let manager = CalendarDataManager::new(props).unwrap();
/// assert_eq!(manager.current_data().unwrap().view_title, "May 2024");
///
/// manager.dispatch(Action::Next).unwrap();
/// assert_eq!(manager.current_data().unwrap().view_title, "June 2024");
/// ```
pub struct CalendarDataManager {
    shared: Rc<Shared>,
}

impl CalendarDataManager {
    /// Resolve options, build the initial state and publish the first snapshot
    ///
    /// Fails with [`Error::ViewNotAvailable`] when the initial view has no
    /// view spec.
    pub fn new(props: CalendarDataManagerProps) -> Result<Self> {
        let CalendarDataManagerProps {
            option_overrides,
            calendar_api,
            plugins,
            handlers,
            on_action,
            on_data,
            globals,
        } = props;

        let shared = Rc::new_cyclic(|this| Shared {
            runner: TaskRunner::new(),
            derive: RefCell::new(Derivations::new()),
            state: RefCell::new(None),
            data: RefCell::new(None),
            option_overrides: RefCell::new(option_overrides),
            calendar_api,
            emitter: Rc::new(Emitter::new()),
            handlers,
            plugins,
            globals,
            on_action,
            on_data,
            this: this.clone(),
        });
        shared.init()?;
        Ok(Self { shared })
    }

    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.dispatcher().dispatch(action)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.shared.dispatcher()
    }

    pub fn accessor(&self) -> DataAccessor {
        self.shared.accessor()
    }

    pub fn emitter(&self) -> Rc<Emitter> {
        self.shared.emitter.clone()
    }

    /// The latest published snapshot
    pub fn current_data(&self) -> Result<Rc<CalendarData>> {
        self.shared.current_data()
    }

    /// The latest reduced state; may be ahead of `current_data` mid-drain
    pub fn current_state(&self) -> Result<Rc<ManagerState>> {
        self.shared.state()
    }

    pub fn option_overrides(&self) -> OptionSet {
        self.shared.option_overrides.borrow().clone()
    }

    /// Replace the static option layer, or merge into it when `append` is set,
    /// and publish a snapshot built from it
    pub fn reset_options(&self, overrides: OptionSet, append: bool) -> Result<()> {
        {
            let mut current = self.shared.option_overrides.borrow_mut();
            *current = if append { current.merged(&overrides) } else { overrides };
        }
        self.shared.runner.pause("resetOptions");
        let rebuilt = self.shared.update_data();
        self.shared.runner.resume("resetOptions")?;
        rebuilt?;
        self.shared.try_drain()
    }

    /// Hold queued actions until the matching `resume`
    pub fn pause(&self, scope: &str) {
        self.shared.runner.pause(scope);
    }

    /// Release one `pause(scope)`; once nothing is paused, process the queue
    pub fn resume(&self, scope: &str) -> Result<()> {
        self.shared.runner.resume(scope)?;
        self.shared.try_drain()
    }

    /// Run `f` with processing paused, so its dispatches cost one rebuild
    pub fn batch_rendering<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        self.pause("batchRendering");
        let out = f();
        self.resume("batchRendering")?;
        Ok(out)
    }
}
