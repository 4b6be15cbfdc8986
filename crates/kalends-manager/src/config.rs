//! Process-wide configuration
//!
//! The default option layer, the plugins every calendar gets, and the
//! locales available to every calendar. Build one [`Globals`] at startup and
//! share it between managers; it is never mutated afterwards.

use crate::builtin::core_plugin;
use crate::plugin::PluginDef;
use kalends_core::locale::RawLocale;
use kalends_core::{default_options, OptionSet};
use std::rc::Rc;

/// Shared configuration for every manager built from it
///
/// # Example
///
/// ```
/// use kalends_manager::{day_grid_plugin, Globals};
///
/// let globals = Globals::standard().with_plugin(day_grid_plugin());
/// assert_eq!(globals.plugins.len(), 2);
/// assert_eq!(globals.base_options.get_str("timeZone"), Some("local"));
/// ```
#[derive(Clone)]
pub struct Globals {
    /// Lowest option layer, below locale defaults
    pub base_options: OptionSet,
    pub plugins: Rc<Vec<Rc<PluginDef>>>,
    pub locales: Rc<Vec<RawLocale>>,
}

impl Globals {
    /// Built-in defaults and the core plugin
    pub fn standard() -> Self {
        Self {
            base_options: default_options(),
            plugins: Rc::new(vec![core_plugin()]),
            locales: Rc::new(Vec::new()),
        }
    }

    /// Layer extra defaults on top of the built-in ones
    pub fn with_base_options(mut self, options: &OptionSet) -> Self {
        self.base_options = self.base_options.merged(options);
        self
    }

    pub fn with_plugin(mut self, plugin: Rc<PluginDef>) -> Self {
        Rc::make_mut(&mut self.plugins).push(plugin);
        self
    }

    pub fn with_locale(mut self, locale: RawLocale) -> Self {
        Rc::make_mut(&mut self.locales).push(locale);
        self
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::standard()
    }
}
