//! RON option loader
//!
//! Option files are plain RON maps keyed by option name:
//!
//! ```ron
//! {
//!     "timeZone": "Europe/Paris",
//!     "initialView": "dayGridWeek",
//!     "weekends": false,
//! }
//! ```
//!
//! Later loads override earlier ones key by key.

use crate::error::Result;
use kalends_core::{OptionSet, ValueMap};
use std::fs;
use std::path::Path;

/// Accumulates option layers read from RON
#[derive(Debug, Default)]
pub struct OptionsLoader {
    options: ValueMap,
}

impl OptionsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading options");
        self.load_str(&content)
    }

    /// Load options from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let map: ValueMap = ron::from_str(content)?;
        self.options.extend(map);
        Ok(())
    }

    /// Everything loaded so far
    pub fn options(&self) -> OptionSet {
        OptionSet::new(self.options.clone())
    }

    pub fn into_options(self) -> OptionSet {
        OptionSet::new(self.options)
    }
}

/// Read one RON option file
pub fn load_options(path: impl AsRef<Path>) -> Result<OptionSet> {
    let mut loader = OptionsLoader::new();
    loader.load_file(path)?;
    Ok(loader.into_options())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use kalends_core::Value;

    #[test]
    fn test_load_str() {
        let mut loader = OptionsLoader::new();
        loader
            .load_str(r#"{ "timeZone": "UTC", "weekends": false, "firstDay": 1, "hiddenDays": [0, 6] }"#)
            .unwrap();

        let options = loader.options();
        assert_eq!(options.get_str("timeZone"), Some("UTC"));
        assert_eq!(options.get("weekends"), Some(&Value::Bool(false)));
        assert_eq!(options.get("firstDay"), Some(&Value::Int(1)));
        assert_eq!(
            options.get("hiddenDays"),
            Some(&Value::List(vec![Value::Int(0), Value::Int(6)]))
        );
    }

    #[test]
    fn test_later_loads_override() {
        let mut loader = OptionsLoader::new();
        loader.load_str(r#"{ "timeZone": "UTC", "locale": "en" }"#).unwrap();
        loader.load_str(r#"{ "timeZone": "+02:00" }"#).unwrap();

        let options = loader.into_options();
        assert_eq!(options.get_str("timeZone"), Some("+02:00"));
        assert_eq!(options.get_str("locale"), Some("en"));
    }

    #[test]
    fn test_nested_maps() {
        let mut loader = OptionsLoader::new();
        loader
            .load_str(r#"{ "views": { "dayGridMonth": { "fixedWeekCount": false } } }"#)
            .unwrap();

        let Some(Value::Map(views)) = loader.options().get("views").cloned() else {
            panic!("views should load as a map");
        };
        assert!(views.contains_key("dayGridMonth"));
    }

    #[test]
    fn test_syntax_error() {
        let mut loader = OptionsLoader::new();
        let err = loader.load_str(r#"{ "timeZone": "#).unwrap_err();
        assert!(matches!(err, Error::Ron(_)));
        assert!(loader.options().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = load_options("/nonexistent/kalends/options.ron").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
