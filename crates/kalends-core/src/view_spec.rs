//! View definitions and resolved view specs
//!
//! Plugins register view configs (a render component plus option defaults);
//! users refine them through the `views` option. A config may name another
//! view as its `type` to inherit from it, so specs are resolved along that
//! chain before durations and button texts are worked out.

use crate::date::Unit;
use crate::date_profile::DateProfileGeneratorFactory;
use crate::duration::Duration;
use crate::options::OptionSet;
use crate::value::{Value, ValueMap};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A view as registered by a plugin or described in the `views` option
#[derive(Clone, Default)]
pub struct ViewConfig {
    /// View type this config inherits from
    pub super_type: Option<String>,
    /// Name of the render component; a view chain without one cannot be shown
    pub component: Option<String>,
    pub options: OptionSet,
    /// Overrides the standard date-profile generator for this view
    pub date_profile_generator: Option<DateProfileGeneratorFactory>,
}

impl ViewConfig {
    /// A config backed by a render component
    pub fn with_component(component: impl Into<String>, options: OptionSet) -> Self {
        Self {
            component: Some(component.into()),
            options,
            ..Self::default()
        }
    }

    /// A config that refines another view type
    pub fn extending(super_type: impl Into<String>, options: OptionSet) -> Self {
        Self {
            super_type: Some(super_type.into()),
            options,
            ..Self::default()
        }
    }

    pub fn date_profile_generator(mut self, factory: DateProfileGeneratorFactory) -> Self {
        self.date_profile_generator = Some(factory);
        self
    }
}

impl fmt::Debug for ViewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewConfig")
            .field("super_type", &self.super_type)
            .field("component", &self.component)
            .field("options", &self.options)
            .field("custom_generator", &self.date_profile_generator.is_some())
            .finish()
    }
}

pub type ViewConfigMap = IndexMap<String, ViewConfig>;

/// A view config with its inheritance chain flattened
#[derive(Clone)]
struct ViewDef {
    view_type: String,
    component: String,
    defaults: ValueMap,
    overrides: ValueMap,
    date_profile_generator: Option<DateProfileGeneratorFactory>,
}

/// A fully resolved, named view
#[derive(Clone)]
pub struct ViewSpec {
    pub view_type: String,
    pub component: String,
    pub duration: Option<Duration>,
    pub duration_unit: Option<Unit>,
    /// Set when the duration is exactly one of some unit
    pub single_unit: Option<Unit>,
    pub option_defaults: OptionSet,
    pub option_overrides: OptionSet,
    pub button_text_override: Option<String>,
    pub button_text_default: String,
    pub date_profile_generator: Option<DateProfileGeneratorFactory>,
}

impl ViewSpec {
    /// Button text shown for this view
    pub fn button_text(&self) -> &str {
        self.button_text_override
            .as_deref()
            .unwrap_or(&self.button_text_default)
    }
}

impl fmt::Debug for ViewSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSpec")
            .field("view_type", &self.view_type)
            .field("component", &self.component)
            .field("duration", &self.duration)
            .field("single_unit", &self.single_unit)
            .field("button_text", &self.button_text())
            .finish_non_exhaustive()
    }
}

pub type ViewSpecHash = IndexMap<String, Rc<ViewSpec>>;

/// Read the `views` option into view configs
pub fn parse_view_configs(input: Option<&ValueMap>) -> ViewConfigMap {
    let Some(input) = input else {
        return ViewConfigMap::new();
    };
    input
        .iter()
        .filter_map(|(name, raw)| {
            let raw = raw.as_map()?;
            let mut options = raw.clone();
            let super_type = options
                .shift_remove("type")
                .and_then(|t| t.as_str().map(str::to_string));
            Some((
                name.clone(),
                ViewConfig {
                    super_type,
                    options: OptionSet::new(options),
                    ..ViewConfig::default()
                },
            ))
        })
        .collect()
}

/// Resolve every constructible view from plugin defaults and user overrides
pub fn build_view_specs(
    default_configs: &ViewConfigMap,
    option_overrides: &OptionSet,
    dynamic_option_overrides: &OptionSet,
    locale_defaults: &OptionSet,
    base_defaults: &OptionSet,
) -> ViewSpecHash {
    let override_configs = parse_view_configs(option_overrides.get_map("views"));
    let defs = compile_view_defs(default_configs, &override_configs);

    defs.into_iter()
        .map(|(name, def)| {
            let spec = build_view_spec(
                def,
                &override_configs,
                option_overrides,
                dynamic_option_overrides,
                locale_defaults,
                base_defaults,
            );
            (name, Rc::new(spec))
        })
        .collect()
}

fn compile_view_defs(defaults: &ViewConfigMap, overrides: &ViewConfigMap) -> IndexMap<String, ViewDef> {
    let mut resolved: IndexMap<String, Option<ViewDef>> = IndexMap::new();
    for view_type in defaults.keys().chain(overrides.keys()) {
        let mut visiting = Vec::new();
        ensure_view_def(view_type, &mut resolved, defaults, overrides, &mut visiting);
    }
    resolved
        .into_iter()
        .filter_map(|(name, def)| def.map(|d| (name, d)))
        .collect()
}

fn ensure_view_def(
    view_type: &str,
    resolved: &mut IndexMap<String, Option<ViewDef>>,
    defaults: &ViewConfigMap,
    overrides: &ViewConfigMap,
    visiting: &mut Vec<String>,
) -> Option<ViewDef> {
    if let Some(done) = resolved.get(view_type) {
        return done.clone();
    }
    if visiting.iter().any(|v| v == view_type) {
        tracing::warn!(view_type, "cyclic view type inheritance");
        return None;
    }
    visiting.push(view_type.to_string());
    let def = build_view_def(view_type, resolved, defaults, overrides, visiting);
    visiting.pop();
    resolved.insert(view_type.to_string(), def.clone());
    def
}

fn build_view_def(
    view_type: &str,
    resolved: &mut IndexMap<String, Option<ViewDef>>,
    defaults: &ViewConfigMap,
    overrides: &ViewConfigMap,
    visiting: &mut Vec<String>,
) -> Option<ViewDef> {
    let default_config = defaults.get(view_type);
    let override_config = overrides.get(view_type);

    let super_type = default_config
        .and_then(|c| c.super_type.clone())
        .or_else(|| override_config.and_then(|c| c.super_type.clone()))
        .filter(|t| t != view_type);
    let super_def = super_type
        .as_deref()
        .and_then(|t| ensure_view_def(t, resolved, defaults, overrides, visiting));

    let component = default_config
        .and_then(|c| c.component.clone())
        .or_else(|| override_config.and_then(|c| c.component.clone()))
        .or_else(|| super_def.as_ref().map(|d| d.component.clone()))?;

    let mut def_options = super_def.as_ref().map(|d| d.defaults.clone()).unwrap_or_default();
    if let Some(config) = default_config {
        def_options.extend(config.options.map().iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let mut override_options = super_def.as_ref().map(|d| d.overrides.clone()).unwrap_or_default();
    if let Some(config) = override_config {
        override_options.extend(config.options.map().iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    Some(ViewDef {
        view_type: view_type.to_string(),
        component,
        defaults: def_options,
        overrides: override_options,
        date_profile_generator: default_config
            .and_then(|c| c.date_profile_generator.clone())
            .or_else(|| super_def.and_then(|d| d.date_profile_generator)),
    })
}

fn build_view_spec(
    def: ViewDef,
    override_configs: &ViewConfigMap,
    option_overrides: &OptionSet,
    dynamic_option_overrides: &OptionSet,
    locale_defaults: &OptionSet,
    base_defaults: &OptionSet,
) -> ViewSpec {
    let duration_input = [
        def.overrides.get("duration"),
        def.defaults.get("duration"),
        dynamic_option_overrides.get("duration"),
        option_overrides.get("duration"),
    ]
    .into_iter()
    .flatten()
    .find(|v| !v.is_null());

    let duration = duration_input.and_then(|input| match Duration::from_value(input) {
        Ok(d) if !d.is_zero() => Some(d),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(view_type = %def.view_type, %err, "ignoring view duration");
            None
        }
    });

    let mut duration_unit = None;
    let mut single_unit = None;
    let mut single_unit_overrides = ValueMap::new();
    if let Some(d) = &duration {
        let (unit, count) = d.greatest_unit();
        duration_unit = Some(unit);
        if count == 1 {
            single_unit = Some(unit);
            if let Some(config) = override_configs.get(unit.as_str()) {
                single_unit_overrides = config.options.map().clone();
            }
        }
    }

    let button_text_key = def.defaults.get("buttonTextKey").and_then(Value::as_str);
    let query_button_text = |options: Option<&ValueMap>| -> Option<String> {
        let text = options?.get("buttonText")?.as_map()?;
        let lookup = |key: &str| text.get(key).and_then(Value::as_str).map(str::to_string);
        button_text_key
            .and_then(lookup)
            .or_else(|| lookup(&def.view_type))
            .or_else(|| single_unit.and_then(|u| lookup(u.as_str())))
    };

    let button_text_override = query_button_text(Some(dynamic_option_overrides.map()))
        .or_else(|| query_button_text(Some(option_overrides.map())))
        .or_else(|| def.overrides.get("buttonText").and_then(Value::as_str).map(str::to_string));
    let button_text_default = query_button_text(Some(locale_defaults.map()))
        .or_else(|| def.defaults.get("buttonText").and_then(Value::as_str).map(str::to_string))
        .or_else(|| query_button_text(Some(base_defaults.map())))
        .unwrap_or_else(|| def.view_type.clone());

    let mut overrides = single_unit_overrides;
    overrides.extend(def.overrides);

    ViewSpec {
        view_type: def.view_type,
        component: def.component,
        duration,
        duration_unit,
        single_unit,
        option_defaults: OptionSet::new(def.defaults),
        option_overrides: OptionSet::new(overrides),
        button_text_override,
        button_text_default,
        date_profile_generator: def.date_profile_generator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::default_options;
    use crate::value_map;

    fn plugin_views() -> ViewConfigMap {
        let mut views = ViewConfigMap::new();
        views.insert(
            "grid".to_string(),
            ViewConfig::with_component("DayTable", OptionSet::new(value_map! { "dayMaxEvents" => 3i64 })),
        );
        views.insert(
            "gridWeek".to_string(),
            ViewConfig::extending("grid", OptionSet::new(value_map! { "duration" => value_map! { "weeks" => 1i64 } })),
        );
        views.insert(
            "gridMonth".to_string(),
            ViewConfig::extending("grid", OptionSet::new(value_map! { "duration" => value_map! { "months" => 1i64 } })),
        );
        views
    }

    #[test]
    fn test_inherits_component_and_defaults() {
        let specs = build_view_specs(
            &plugin_views(),
            &OptionSet::empty(),
            &OptionSet::empty(),
            &OptionSet::empty(),
            &default_options(),
        );
        let week = &specs["gridWeek"];
        assert_eq!(week.component, "DayTable");
        assert_eq!(week.option_defaults.get_int("dayMaxEvents"), Some(3));
        assert_eq!(week.single_unit, Some(Unit::Week));
        // single-unit button text comes from the base defaults
        assert_eq!(week.button_text(), "week");
        assert_eq!(specs["gridMonth"].button_text(), "month");
    }

    #[test]
    fn test_user_views_refine_and_create() {
        let overrides = OptionSet::new(value_map! {
            "views" => value_map! {
                "gridFourDay" => value_map! {
                    "type" => "grid",
                    "duration" => value_map! { "days" => 4i64 },
                    "buttonText" => "4 day",
                },
                "week" => value_map! { "weekNumbers" => true },
                "orphan" => value_map! { "duration" => value_map! { "days" => 2i64 } },
            },
        });
        let specs = build_view_specs(
            &plugin_views(),
            &overrides,
            &OptionSet::empty(),
            &OptionSet::empty(),
            &default_options(),
        );
        let four = &specs["gridFourDay"];
        assert_eq!(four.duration, Some(Duration::days(4)));
        assert_eq!(four.single_unit, None);
        assert_eq!(four.button_text(), "4 day");
        assert_eq!(specs["gridWeek"].option_overrides.get_bool("weekNumbers"), Some(true));
        // no component anywhere in its chain
        assert!(!specs.contains_key("orphan"));
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let mut views = ViewConfigMap::new();
        views.insert("a".to_string(), ViewConfig::extending("b", OptionSet::empty()));
        views.insert("b".to_string(), ViewConfig::extending("a", OptionSet::empty()));
        let specs = build_view_specs(
            &views,
            &OptionSet::empty(),
            &OptionSet::empty(),
            &OptionSet::empty(),
            &default_options(),
        );
        assert!(specs.is_empty());
    }
}
