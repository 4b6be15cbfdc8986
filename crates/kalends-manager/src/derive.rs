//! Memoized derivations behind the data bundles
//!
//! One memo per derivation site. The manager calls these every action, and
//! a call whose inputs are the same as last time returns last time's `Rc`,
//! so bundles keep their identity until something they depend on changes.

use crate::config::Globals;
use crate::data::{CurrentViewData, OptionsData};
use crate::error::{Error, Result};
use crate::manager::DataAccessor;
use crate::plugin::{build_plugin_hooks, PluginDef, PluginHooks};
use crate::view_api::ViewApi;
use kalends_core::business_hours::{parse_business_hours, BusinessHoursContext};
use kalends_core::computed::{build_computed_options, ComputedOptions};
use kalends_core::date_profile::build_date_profile_generator;
use kalends_core::event_ui::{process_scoped_ui_props, EventUi, EventUiHash};
use kalends_core::locale::{build_locale, organize_raw_locales, Locale, RawLocale, RawLocaleInfo, RawLocaleMap};
use kalends_core::theme::build_theme;
use kalends_core::title::build_title;
use kalends_core::toolbar::{parse_toolbars, ToolbarConfig};
use kalends_core::view_spec::build_view_specs;
use kalends_core::{
    first_defined, DateEnv, DateEnvSettings, DateProfile, DateProfileGenerator, DateProfileGeneratorProps,
    EventSourceHash, EventStore, Memo, MemoObj, OptionSet, Same, Theme, Value, ViewSpecHash,
};
use std::rc::Rc;

/// UI layers every event and selection starts from
pub struct ViewUiProps {
    pub event_ui_single_base: Rc<EventUi>,
    pub selection_config: Rc<EventUi>,
}

/// Keyed on the calendar options alone
pub struct ViewUiContext {
    pub options: OptionSet,
}

impl Same for ViewUiContext {
    fn same(&self, other: &Self) -> bool {
        self.options.same(&other.options)
    }
}

fn build_view_ui_props(ctx: &ViewUiContext) -> ViewUiProps {
    ViewUiProps {
        event_ui_single_base: Rc::new(process_scoped_ui_props("event", &ctx.options)),
        selection_config: Rc::new(process_scoped_ui_props("select", &ctx.options)),
    }
}

fn build_event_ui_by_source(sources: &EventSourceHash) -> EventUiHash {
    sources
        .values()
        .map(|source| (source.source_id.as_str().to_string(), source.ui.clone()))
        .collect()
}

/// `""` maps to the calendar-wide base; defs from a source map to that source's UI
fn build_event_ui_bases(store: &EventStore, single_base: &EventUi, by_source: &EventUiHash) -> EventUiHash {
    let mut bases = EventUiHash::new();
    bases.insert(String::new(), single_base.clone());
    for (def_id, def) in &store.defs {
        if let Some(ui) = def.source_id.as_ref().and_then(|id| by_source.get(id.as_str())) {
            bases.insert(def_id.as_str().to_string(), ui.clone());
        }
    }
    bases
}

/// Memos for the calendar-wide bundle
struct OptionsMemos {
    raw_locales: Memo<(Value, Rc<Vec<RawLocale>>), Rc<RawLocaleInfo>>,
    locale: Memo<(String, Rc<RawLocaleMap>), Rc<Locale>>,
    calendar_options: Memo<(OptionSet, OptionSet, OptionSet, OptionSet), OptionSet>,
    computed: Memo<(OptionSet,), Rc<ComputedOptions>>,
    plugin_hooks: Memo<(Rc<Vec<Rc<PluginDef>>>, Rc<Vec<Rc<PluginDef>>>), Rc<PluginHooks>>,
    date_env: Memo<(String, Rc<Locale>, String, Option<i64>, Option<String>, Rc<PluginHooks>), Rc<DateEnv>>,
    view_specs: Memo<(Rc<PluginHooks>, OptionSet, OptionSet, OptionSet), Rc<ViewSpecHash>>,
    theme: Memo<(OptionSet, Rc<PluginHooks>), Rc<dyn Theme>>,
    toolbar: Memo<(OptionSet, OptionSet, Rc<dyn Theme>, Rc<ViewSpecHash>), Rc<ToolbarConfig>>,
}

impl OptionsMemos {
    fn new() -> Self {
        Self {
            raw_locales: Memo::new("organize_raw_locales"),
            locale: Memo::new("build_locale"),
            calendar_options: Memo::new("calendar_options"),
            computed: Memo::new("computed_calendar_options"),
            plugin_hooks: Memo::new("build_plugin_hooks"),
            date_env: Memo::new("build_date_env"),
            view_specs: Memo::new("build_view_specs"),
            theme: Memo::new("build_theme"),
            toolbar: Memo::new("parse_toolbars"),
        }
    }

    fn compute(
        &mut self,
        overrides: &OptionSet,
        dynamic: &OptionSet,
        globals: &Globals,
        plugins: &Rc<Vec<Rc<PluginDef>>>,
    ) -> OptionsData {
        let base = &globals.base_options;
        let locales = first_defined(&[dynamic.get("locales"), overrides.get("locales"), base.get("locales")])
            .cloned()
            .unwrap_or(Value::Null);
        let locale_code = first_defined(&[dynamic.get("locale"), overrides.get("locale"), base.get("locale")])
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let raw_locales = self
            .raw_locales
            .get((locales, globals.locales.clone()), |(explicit, global)| Rc::new(organize_raw_locales(explicit, global)));
        let code = if locale_code.is_empty() {
            raw_locales.default_code.clone()
        } else {
            locale_code
        };
        let locale = self
            .locale
            .get((code, raw_locales.map.clone()), |(code, map)| Rc::new(build_locale(code, map)));
        let locale_defaults = locale.options.clone();

        let calendar_options = self.calendar_options.get(
            (base.clone(), locale_defaults.clone(), overrides.clone(), dynamic.clone()),
            |(base, locale_defaults, overrides, dynamic)| {
                OptionSet::merge_layers(&[base, locale_defaults, overrides, dynamic])
            },
        );
        let computed = self
            .computed
            .get((calendar_options.clone(),), |(options,)| Rc::new(build_computed_options(options)));
        let plugin_hooks = self.plugin_hooks.get((plugins.clone(), globals.plugins.clone()), |(plugins, global)| {
            Rc::new(build_plugin_hooks(plugins, global))
        });

        let date_env = self.date_env.get(
            (
                calendar_options.get_str("timeZone").unwrap_or("local").to_string(),
                locale.clone(),
                calendar_options.get_str("weekNumberCalculation").unwrap_or("local").to_string(),
                calendar_options.get_int("firstDay"),
                calendar_options.get_str("weekText").map(str::to_string),
                plugin_hooks.clone(),
            ),
            |(time_zone, locale, week_number_calculation, first_day, week_text, hooks)| {
                Rc::new(DateEnv::new(DateEnvSettings {
                    time_zone: time_zone.clone(),
                    locale: locale.clone(),
                    week_number_calculation: week_number_calculation.clone(),
                    first_day: first_day.map(|d| d.rem_euclid(7) as u32),
                    week_text: week_text.clone(),
                    named_time_zone_impl: hooks.named_time_zone_impl.clone(),
                }))
            },
        );

        let view_specs = self.view_specs.get(
            (plugin_hooks.clone(), overrides.clone(), dynamic.clone(), locale_defaults.clone()),
            |(hooks, overrides, dynamic, locale_defaults)| {
                Rc::new(build_view_specs(&hooks.views, overrides, dynamic, locale_defaults, base))
            },
        );
        let theme = self
            .theme
            .get((calendar_options.clone(), plugin_hooks.clone()), |(options, hooks)| {
                build_theme(options, &hooks.theme_classes)
            });
        let toolbar_config = self.toolbar.get(
            (calendar_options.clone(), overrides.clone(), theme.clone(), view_specs.clone()),
            |(options, overrides, theme, specs)| Rc::new(parse_toolbars(options, overrides, theme.as_ref(), specs)),
        );

        OptionsData {
            calendar_options,
            computed_calendar_options: computed,
            available_raw_locales: raw_locales.map.clone(),
            plugin_hooks,
            date_env,
            view_specs,
            theme,
            toolbar_config,
            locale_defaults,
        }
    }
}

/// Memos for the active-view bundle
struct ViewMemos {
    options: Memo<(OptionSet, OptionSet, OptionSet, OptionSet, OptionSet, OptionSet), OptionSet>,
    computed: Memo<(OptionSet,), Rc<ComputedOptions>>,
    date_profile_generator: MemoObj<DateProfileGeneratorProps, Rc<dyn DateProfileGenerator>>,
    view_api: Memo<(String, Rc<DateEnv>), Rc<ViewApi>>,
}

impl ViewMemos {
    fn new() -> Self {
        Self {
            options: Memo::new("view_options"),
            computed: Memo::new("computed_view_options"),
            date_profile_generator: MemoObj::new("build_date_profile_generator"),
            view_api: Memo::new("build_view_api"),
        }
    }

    fn compute(
        &mut self,
        options_data: &OptionsData,
        view_type: &str,
        overrides: &OptionSet,
        dynamic: &OptionSet,
        globals: &Globals,
        accessor: &DataAccessor,
    ) -> Result<CurrentViewData> {
        let Some(view_spec) = options_data.view_specs.get(view_type).cloned() else {
            return Err(Error::ViewNotAvailable {
                view_type: view_type.to_string(),
            });
        };

        let options = self.options.get(
            (
                globals.base_options.clone(),
                view_spec.option_defaults.clone(),
                options_data.locale_defaults.clone(),
                overrides.clone(),
                view_spec.option_overrides.clone(),
                dynamic.clone(),
            ),
            |(base, view_defaults, locale_defaults, overrides, view_overrides, dynamic)| {
                OptionSet::merge_layers(&[base, view_defaults, locale_defaults, overrides, view_overrides, dynamic])
            },
        );
        let computed_options = self
            .computed
            .get((options.clone(),), |(options,)| Rc::new(build_computed_options(options)));

        let props = DateProfileGeneratorProps::from_options(view_spec.clone(), options_data.date_env.clone(), &options);
        let date_profile_generator = self
            .date_profile_generator
            .get(props, |props| build_date_profile_generator(props.clone()));

        let view_api = self
            .view_api
            .get((view_type.to_string(), options_data.date_env.clone()), |(view_type, date_env)| {
                Rc::new(ViewApi::new(view_type.clone(), accessor.clone(), date_env.clone()))
            });

        Ok(CurrentViewData {
            view_spec,
            options,
            computed_options,
            date_profile_generator,
            view_api,
        })
    }
}

/// Every memo a manager owns
pub(crate) struct Derivations {
    options_data: Memo<(OptionSet, OptionSet), Rc<OptionsData>>,
    options: OptionsMemos,
    view_data: Memo<(Rc<OptionsData>, String, OptionSet, OptionSet), Rc<CurrentViewData>>,
    view: ViewMemos,
    view_ui_props: MemoObj<ViewUiContext, Rc<ViewUiProps>>,
    event_ui_by_source: Memo<(Rc<EventSourceHash>,), Rc<EventUiHash>>,
    event_ui_bases: Memo<(Rc<EventStore>, Rc<EventUi>, Rc<EventUiHash>), Rc<EventUiHash>>,
    business_hours: MemoObj<BusinessHoursContext, Rc<EventStore>>,
    title: Memo<(DateProfile, OptionSet, Rc<DateEnv>), String>,
}

impl Derivations {
    pub(crate) fn new() -> Self {
        Self {
            options_data: Memo::new("options_data"),
            options: OptionsMemos::new(),
            view_data: Memo::new("current_view_data"),
            view: ViewMemos::new(),
            view_ui_props: MemoObj::new("build_view_ui_props"),
            event_ui_by_source: Memo::with_result_eq("build_event_ui_by_source", |a: &Rc<EventUiHash>, b: &Rc<EventUiHash>| a == b),
            event_ui_bases: Memo::new("build_event_ui_bases"),
            business_hours: MemoObj::new("parse_business_hours"),
            title: Memo::new("build_title"),
        }
    }

    pub(crate) fn options_data(
        &mut self,
        overrides: &OptionSet,
        dynamic: &OptionSet,
        globals: &Globals,
        plugins: &Rc<Vec<Rc<PluginDef>>>,
    ) -> Rc<OptionsData> {
        let memos = &mut self.options;
        self.options_data.get((overrides.clone(), dynamic.clone()), |(overrides, dynamic)| {
            Rc::new(memos.compute(overrides, dynamic, globals, plugins))
        })
    }

    pub(crate) fn view_data(
        &mut self,
        options_data: &Rc<OptionsData>,
        view_type: &str,
        overrides: &OptionSet,
        dynamic: &OptionSet,
        globals: &Globals,
        accessor: &DataAccessor,
    ) -> Result<Rc<CurrentViewData>> {
        let memos = &mut self.view;
        self.view_data.try_get(
            (options_data.clone(), view_type.to_string(), overrides.clone(), dynamic.clone()),
            |(options_data, view_type, overrides, dynamic)| {
                memos
                    .compute(options_data, view_type, overrides, dynamic, globals, accessor)
                    .map(Rc::new)
            },
        )
    }

    pub(crate) fn view_ui_props(&mut self, options: &OptionSet) -> Rc<ViewUiProps> {
        self.view_ui_props.get(ViewUiContext { options: options.clone() }, |ctx| Rc::new(build_view_ui_props(ctx)))
    }

    pub(crate) fn event_ui_bases(
        &mut self,
        store: &Rc<EventStore>,
        view_ui: &ViewUiProps,
        sources: &Rc<EventSourceHash>,
    ) -> Rc<EventUiHash> {
        let by_source = self
            .event_ui_by_source
            .get((sources.clone(),), |(sources,)| Rc::new(build_event_ui_by_source(sources)));
        self.event_ui_bases.get(
            (store.clone(), view_ui.event_ui_single_base.clone(), by_source),
            |(store, single_base, by_source)| Rc::new(build_event_ui_bases(store, single_base, by_source)),
        )
    }

    pub(crate) fn business_hours(&mut self, options_data: &OptionsData) -> Rc<EventStore> {
        let ctx = BusinessHoursContext {
            input: options_data.calendar_options.get("businessHours").cloned(),
            date_env: options_data.date_env.clone(),
            computed: options_data.computed_calendar_options.clone(),
        };
        self.business_hours.get(ctx, |ctx| Rc::new(parse_business_hours(ctx)))
    }

    pub(crate) fn title(&mut self, profile: &DateProfile, view_options: &OptionSet, date_env: &Rc<DateEnv>) -> String {
        self.title.get(
            (profile.clone(), view_options.clone(), date_env.clone()),
            |(profile, options, env)| build_title(profile, options, env),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kalends_core::event_store::EventDef;
    use kalends_core::{value_map, DefId, SourceId, ValueMap};

    fn def(id: &str, source_id: Option<SourceId>) -> EventDef {
        EventDef {
            def_id: DefId::new(id),
            source_id,
            public_id: String::new(),
            group_id: String::new(),
            title: id.to_string(),
            url: String::new(),
            all_day: true,
            has_end: false,
            recurring: None,
            ui: EventUi::default(),
            extended_props: ValueMap::new(),
        }
    }

    #[test]
    fn test_event_ui_bases_layer_source_ui() {
        let options = OptionSet::new(value_map! { "eventColor" => "blue" });
        let view_ui = build_view_ui_props(&ViewUiContext { options });

        let source_id = SourceId::new("s1");
        let mut by_source = EventUiHash::new();
        by_source.insert(
            "s1".to_string(),
            EventUi {
                text_color: Some("white".to_string()),
                ..EventUi::default()
            },
        );

        let mut store = EventStore::new();
        store.add(def("d1", Some(source_id)), None);
        store.add(def("d2", None), None);

        let bases = build_event_ui_bases(&store, &view_ui.event_ui_single_base, &by_source);
        assert_eq!(bases[""].background_color.as_deref(), Some("blue"));
        assert_eq!(bases["d1"].text_color.as_deref(), Some("white"));
        assert!(!bases.contains_key("d2"));
    }

    #[test]
    fn test_ui_by_source_keeps_identity_when_equal() {
        let mut derive = Derivations::new();
        let view_ui = build_view_ui_props(&ViewUiContext {
            options: OptionSet::empty(),
        });
        let store = Rc::new(EventStore::new());
        let sources = Rc::new(EventSourceHash::new());
        let first = derive.event_ui_bases(&store, &view_ui, &sources);
        // a fresh but equal source hash still yields the same bases
        let again = derive.event_ui_bases(&store, &view_ui, &Rc::new(EventSourceHash::new()));
        assert!(Rc::ptr_eq(&first, &again));
    }
}
