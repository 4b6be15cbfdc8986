//! Plugins and the hook set resolved from them
//!
//! A [`PluginDef`] bundles the extension points a calendar feature needs:
//! state reducers, option change handlers, views, event source kinds, theme
//! systems. The manager never looks at individual plugins; it resolves the
//! whole list into one [`PluginHooks`] value (memoized on the list identity)
//! and reads from that.

use crate::data::{CalendarContext, CalendarData, ManagerState};
use crate::error::Result;
use indexmap::{IndexMap, IndexSet};
use kalends_core::theme::ThemeFactory;
use kalends_core::{Action, EventSourceDef, NamedTimeZoneImpl, ThemeRegistry, Value, ValueMap, ViewConfig, ViewConfigMap};
use std::rc::Rc;

/// Extends manager state; the returned fields are layered onto `ManagerState::extra`
///
/// Called with `None, None` once at construction, then with the previous
/// state and the action for every processed action. The last argument is
/// the state reduced so far for this action.
pub type StateReducer =
    Rc<dyn Fn(Option<&ManagerState>, Option<&Action>, &CalendarContext, &ManagerState) -> Result<ValueMap>>;

/// Runs after a rebuild when the named calendar option changed
pub type OptionChangeHandler = Rc<dyn Fn(&Value, &CalendarData) -> Result<()>>;

/// One plugin
#[derive(Clone, Default)]
pub struct PluginDef {
    /// Unique name; a plugin reachable twice is only applied once
    pub name: String,
    /// Plugins applied before this one
    pub deps: Vec<Rc<PluginDef>>,
    pub reducers: Vec<StateReducer>,
    pub option_change_handlers: IndexMap<String, OptionChangeHandler>,
    pub theme_classes: ThemeRegistry,
    pub views: ViewConfigMap,
    pub event_source_defs: Vec<Rc<dyn EventSourceDef>>,
    pub initial_view: Option<String>,
    pub named_time_zone_impl: Option<Rc<dyn NamedTimeZoneImpl>>,
}

impl PluginDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn dependency(mut self, plugin: Rc<PluginDef>) -> Self {
        self.deps.push(plugin);
        self
    }

    pub fn reducer(
        mut self,
        reducer: impl Fn(Option<&ManagerState>, Option<&Action>, &CalendarContext, &ManagerState) -> Result<ValueMap> + 'static,
    ) -> Self {
        self.reducers.push(Rc::new(reducer));
        self
    }

    pub fn option_change_handler(
        mut self,
        option: impl Into<String>,
        handler: impl Fn(&Value, &CalendarData) -> Result<()> + 'static,
    ) -> Self {
        self.option_change_handlers.insert(option.into(), Rc::new(handler));
        self
    }

    pub fn theme_class(mut self, system: impl Into<String>, factory: ThemeFactory) -> Self {
        self.theme_classes.insert(system.into(), factory);
        self
    }

    pub fn view(mut self, view_type: impl Into<String>, config: ViewConfig) -> Self {
        self.views.insert(view_type.into(), config);
        self
    }

    pub fn event_source_def(mut self, def: Rc<dyn EventSourceDef>) -> Self {
        self.event_source_defs.push(def);
        self
    }

    pub fn initial_view(mut self, view_type: impl Into<String>) -> Self {
        self.initial_view = Some(view_type.into());
        self
    }

    pub fn named_time_zone_impl(mut self, tz_impl: Rc<dyn NamedTimeZoneImpl>) -> Self {
        self.named_time_zone_impl = Some(tz_impl);
        self
    }

    pub fn build(self) -> Rc<PluginDef> {
        Rc::new(self)
    }
}

/// Every plugin's contributions, combined
#[derive(Clone, Default)]
pub struct PluginHooks {
    pub reducers: Vec<StateReducer>,
    pub option_change_handlers: IndexMap<String, OptionChangeHandler>,
    pub theme_classes: ThemeRegistry,
    pub views: ViewConfigMap,
    pub event_source_defs: Vec<Rc<dyn EventSourceDef>>,
    /// Last plugin to name one wins; empty when none did
    pub initial_view: String,
    pub named_time_zone_impl: Option<Rc<dyn NamedTimeZoneImpl>>,
}

impl PluginHooks {
    fn combine(&mut self, def: &PluginDef) {
        self.reducers.extend(def.reducers.iter().cloned());
        for (name, handler) in &def.option_change_handlers {
            self.option_change_handlers.insert(name.clone(), handler.clone());
        }
        for (name, factory) in &def.theme_classes {
            self.theme_classes.insert(name.clone(), factory.clone());
        }
        for (name, config) in &def.views {
            self.views.insert(name.clone(), config.clone());
        }
        self.event_source_defs.extend(def.event_source_defs.iter().cloned());
        if let Some(initial_view) = &def.initial_view {
            self.initial_view = initial_view.clone();
        }
        if let Some(tz_impl) = &def.named_time_zone_impl {
            self.named_time_zone_impl = Some(tz_impl.clone());
        }
    }
}

/// Resolve global plugins, then the calendar's own, dependencies first
pub fn build_plugin_hooks(plugins: &[Rc<PluginDef>], global_plugins: &[Rc<PluginDef>]) -> PluginHooks {
    fn add_defs(defs: &[Rc<PluginDef>], added: &mut IndexSet<String>, hooks: &mut PluginHooks) {
        for def in defs {
            if added.insert(def.name.clone()) {
                add_defs(&def.deps, added, hooks);
                hooks.combine(def);
            }
        }
    }

    let mut added = IndexSet::new();
    let mut hooks = PluginHooks::default();
    add_defs(global_plugins, &mut added, &mut hooks);
    add_defs(plugins, &mut added, &mut hooks);
    tracing::debug!(plugins = ?added, views = hooks.views.len(), "resolved plugin hooks");
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;
    use kalends_core::OptionSet;

    #[test]
    fn test_dependencies_first_and_once() {
        let base = PluginDef::new("base").initial_view("a").view("a", ViewConfig::with_component("A", OptionSet::empty())).build();
        let left = PluginDef::new("left").dependency(base.clone()).initial_view("b").build();
        let right = PluginDef::new("right")
            .dependency(base.clone())
            .view("c", ViewConfig::with_component("C", OptionSet::empty()))
            .reducer(|_, _, _, _| Ok(ValueMap::new()))
            .build();

        let hooks = build_plugin_hooks(&[left, right], &[base]);
        assert_eq!(hooks.initial_view, "b");
        assert_eq!(hooks.views.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(hooks.reducers.len(), 1);
    }

    #[test]
    fn test_later_handlers_replace_earlier() {
        let first = PluginDef::new("first")
            .option_change_handler("events", |_, _| Err(crate::Error::plugin("first")))
            .build();
        let second = PluginDef::new("second").option_change_handler("events", |_, _| Ok(())).build();
        let hooks = build_plugin_hooks(&[first, second], &[]);
        assert_eq!(hooks.option_change_handlers.len(), 1);
        assert!(hooks.initial_view.is_empty());
    }
}
