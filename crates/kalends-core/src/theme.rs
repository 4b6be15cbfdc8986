//! Themes and the theme capability registry
//!
//! A theme system is chosen by the `themeSystem` option and looked up in a
//! registry of factories contributed by plugins. Unknown names fall back to
//! [`StandardTheme`].

use crate::options::OptionSet;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// CSS class provider for the render layer
pub trait Theme: fmt::Debug {
    /// Name of the theme system (`"standard"`, ...)
    fn system(&self) -> &str;

    /// Class for a named UI element
    fn class(&self, key: &str) -> Option<&str>;

    /// Icon class for a toolbar button
    fn icon_class(&self, button_name: &str, is_rtl: bool) -> Option<String>;

    /// Icon class for a custom icon name given in options
    fn custom_icon_class(&self, icon: &str) -> Option<String> {
        Some(icon.to_string())
    }
}

/// Builds a theme from the resolved calendar options
pub type ThemeFactory = Rc<dyn Fn(&OptionSet) -> Rc<dyn Theme>>;

/// Registry of theme factories keyed by theme-system name
pub type ThemeRegistry = IndexMap<String, ThemeFactory>;

/// The built-in theme
#[derive(Debug, Clone)]
pub struct StandardTheme {
    classes: IndexMap<&'static str, &'static str>,
    icons: IndexMap<String, String>,
    rtl_icons: IndexMap<&'static str, &'static str>,
}

impl StandardTheme {
    pub fn new(options: &OptionSet) -> Self {
        let classes = IndexMap::from([
            ("root", "fc-theme-standard"),
            ("tableCellShaded", "fc-cell-shaded"),
            ("buttonGroup", "fc-button-group"),
            ("button", "fc-button fc-button-primary"),
            ("buttonActive", "fc-button-active"),
        ]);

        let mut icons: IndexMap<String, String> = [
            ("close", "fc-icon-x"),
            ("prev", "fc-icon-chevron-left"),
            ("next", "fc-icon-chevron-right"),
            ("prevYear", "fc-icon-chevrons-left"),
            ("nextYear", "fc-icon-chevrons-right"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        // buttonIcons: { prev: "left-single-arrow" } overrides the defaults
        if let Some(overrides) = options.get_map("buttonIcons") {
            for (name, icon) in overrides {
                if let Some(icon) = icon.as_str() {
                    icons.insert(name.clone(), format!("fc-icon-{}", icon));
                }
            }
        }

        let rtl_icons = IndexMap::from([
            ("prev", "fc-icon-chevron-right"),
            ("next", "fc-icon-chevron-left"),
            ("prevYear", "fc-icon-chevrons-right"),
            ("nextYear", "fc-icon-chevrons-left"),
        ]);

        Self {
            classes,
            icons,
            rtl_icons,
        }
    }
}

impl Theme for StandardTheme {
    fn system(&self) -> &str {
        "standard"
    }

    fn class(&self, key: &str) -> Option<&str> {
        self.classes.get(key).copied()
    }

    fn icon_class(&self, button_name: &str, is_rtl: bool) -> Option<String> {
        let rtl = if is_rtl {
            self.rtl_icons.get(button_name).map(|s| s.to_string())
        } else {
            None
        };
        let icon = rtl.or_else(|| self.icons.get(button_name).cloned())?;
        Some(format!("fc-icon {}", icon))
    }

    fn custom_icon_class(&self, icon: &str) -> Option<String> {
        Some(format!("fc-icon fc-icon-{}", icon))
    }
}

/// Pick the theme for the configured theme system
pub fn build_theme(options: &OptionSet, registry: &ThemeRegistry) -> Rc<dyn Theme> {
    let system = options.get_str("themeSystem").unwrap_or("standard");
    match registry.get(system) {
        Some(factory) => factory(options),
        None => {
            if system != "standard" {
                tracing::warn!(theme_system = system, "theme system not registered, using standard theme");
            }
            Rc::new(StandardTheme::new(options))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_map;

    #[derive(Debug)]
    struct PlainTheme;

    impl Theme for PlainTheme {
        fn system(&self) -> &str {
            "plain"
        }

        fn class(&self, _key: &str) -> Option<&str> {
            None
        }

        fn icon_class(&self, _button_name: &str, _is_rtl: bool) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_registry_lookup_with_fallback() {
        let mut registry = ThemeRegistry::new();
        registry.insert("plain".to_string(), Rc::new(|_: &OptionSet| Rc::new(PlainTheme) as Rc<dyn Theme>));

        let plain = OptionSet::new(value_map! { "themeSystem" => "plain" });
        assert_eq!(build_theme(&plain, &registry).system(), "plain");

        let missing = OptionSet::new(value_map! { "themeSystem" => "bootstrap" });
        assert_eq!(build_theme(&missing, &registry).system(), "standard");
    }

    #[test]
    fn test_standard_icons() {
        let theme = StandardTheme::new(&OptionSet::new(value_map! {
            "buttonIcons" => value_map! { "today" => "calendar" },
        }));
        assert_eq!(theme.icon_class("prev", false).as_deref(), Some("fc-icon fc-icon-chevron-left"));
        assert_eq!(theme.icon_class("prev", true).as_deref(), Some("fc-icon fc-icon-chevron-right"));
        assert_eq!(theme.icon_class("today", false).as_deref(), Some("fc-icon fc-icon-calendar"));
        assert_eq!(theme.class("root"), Some("fc-theme-standard"));
    }
}
