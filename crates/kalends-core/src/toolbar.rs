//! Header and footer toolbar parsing
//!
//! A toolbar option maps section names to layout strings such as
//! `"today prev,next"`: spaces separate button groups, commas separate
//! buttons within a group.

use crate::options::OptionSet;
use crate::theme::Theme;
use crate::value::Value;
use crate::view_spec::ViewSpecHash;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What pressing a toolbar button does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolbarCommand {
    Prev,
    Next,
    PrevYear,
    NextYear,
    Today,
    ChangeView(String),
    /// A button from the `customButtons` option
    Custom(String),
}

impl ToolbarCommand {
    fn builtin(name: &str) -> Option<ToolbarCommand> {
        match name {
            "prev" => Some(ToolbarCommand::Prev),
            "next" => Some(ToolbarCommand::Next),
            "prevYear" => Some(ToolbarCommand::PrevYear),
            "nextYear" => Some(ToolbarCommand::NextYear),
            "today" => Some(ToolbarCommand::Today),
            _ => None,
        }
    }
}

/// One toolbar entry; the title placeholder has no command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolbarWidget {
    pub button_name: String,
    pub command: Option<ToolbarCommand>,
    pub button_text: Option<String>,
    pub button_hint: Option<String>,
    pub button_icon: Option<String>,
}

/// Sections (`start`, `center`, `end`) of button groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolbarModel {
    pub sections: IndexMap<String, Vec<Vec<ToolbarWidget>>>,
}

impl ToolbarModel {
    pub fn widgets(&self) -> impl Iterator<Item = &ToolbarWidget> {
        self.sections.values().flatten().flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolbarConfig {
    pub header: Option<ToolbarModel>,
    pub footer: Option<ToolbarModel>,
    /// View types reachable through a toolbar button
    pub view_names_with_buttons: Vec<String>,
}

/// Parse both toolbars
pub fn parse_toolbars(
    options: &OptionSet,
    option_overrides: &OptionSet,
    theme: &dyn Theme,
    view_specs: &ViewSpecHash,
) -> ToolbarConfig {
    let mut with_buttons = Vec::new();
    let mut parse = |key: &str| {
        options
            .get_map(key)
            .map(|sections| parse_toolbar(sections, options, option_overrides, theme, view_specs, &mut with_buttons))
    };
    let header = parse("headerToolbar");
    let footer = parse("footerToolbar");

    ToolbarConfig {
        header,
        footer,
        view_names_with_buttons: with_buttons,
    }
}

fn parse_toolbar(
    sections: &crate::value::ValueMap,
    options: &OptionSet,
    option_overrides: &OptionSet,
    theme: &dyn Theme,
    view_specs: &ViewSpecHash,
    with_buttons: &mut Vec<String>,
) -> ToolbarModel {
    let is_rtl = options.get_str("direction") == Some("rtl");
    let mut model = ToolbarModel::default();

    for (section, layout) in sections {
        let layout = layout.as_str().unwrap_or_default();
        let groups = layout
            .split_whitespace()
            .map(|group| {
                group
                    .split(',')
                    .filter(|name| !name.is_empty())
                    .map(|name| build_widget(name, options, option_overrides, theme, view_specs, is_rtl, with_buttons))
                    .collect::<Vec<_>>()
            })
            .collect();
        model.sections.insert(section.clone(), groups);
    }
    model
}

fn text_from(options: &OptionSet, map_key: &str, name: &str) -> Option<String> {
    options
        .get_map(map_key)
        .and_then(|m| m.get(name))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn build_widget(
    name: &str,
    options: &OptionSet,
    option_overrides: &OptionSet,
    theme: &dyn Theme,
    view_specs: &ViewSpecHash,
    is_rtl: bool,
    with_buttons: &mut Vec<String>,
) -> ToolbarWidget {
    let mut widget = ToolbarWidget {
        button_name: name.to_string(),
        command: None,
        button_text: None,
        button_hint: text_from(options, "buttonHints", name),
        button_icon: None,
    };

    if name == "title" {
        return widget;
    }

    if let Some(custom) = options.get_map("customButtons").and_then(|m| m.get(name)).and_then(Value::as_map) {
        widget.command = Some(ToolbarCommand::Custom(name.to_string()));
        widget.button_text = custom.get("text").and_then(Value::as_str).map(str::to_string);
        widget.button_hint = custom.get("hint").and_then(Value::as_str).map(str::to_string).or(widget.button_hint);
        widget.button_icon = custom
            .get("icon")
            .and_then(Value::as_str)
            .and_then(|icon| theme.custom_icon_class(icon));
        return widget;
    }

    if let Some(spec) = view_specs.get(name) {
        with_buttons.push(name.to_string());
        widget.command = Some(ToolbarCommand::ChangeView(name.to_string()));
        widget.button_text = Some(spec.button_text().to_string());
        return widget;
    }

    if let Some(command) = ToolbarCommand::builtin(name) {
        widget.command = Some(command);
        widget.button_text = text_from(option_overrides, "buttonText", name).or_else(|| text_from(options, "buttonText", name));
        widget.button_icon = match text_from(option_overrides, "buttonIcons", name) {
            Some(icon) => theme.custom_icon_class(&icon),
            None => theme.icon_class(name, is_rtl),
        };
        return widget;
    }

    tracing::warn!(button = name, "unknown toolbar button");
    widget
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_profile::tests::specs;
    use crate::options::default_options;
    use crate::theme::StandardTheme;
    use crate::value_map;

    #[test]
    fn test_default_header() {
        let options = default_options();
        let theme = StandardTheme::new(&options);
        let config = parse_toolbars(&options, &OptionSet::empty(), &theme, &specs());
        let header = config.header.unwrap();
        assert!(config.footer.is_none());

        let end = &header.sections["end"];
        assert_eq!(end.len(), 2);
        assert_eq!(end[0][0].command, Some(ToolbarCommand::Today));
        assert_eq!(end[0][0].button_text.as_deref(), Some("today"));
        assert_eq!(end[1][1].command, Some(ToolbarCommand::Next));
        assert_eq!(end[1][1].button_icon.as_deref(), Some("fc-icon fc-icon-chevron-right"));
        assert_eq!(header.sections["start"][0][0].command, None);
    }

    #[test]
    fn test_view_and_custom_buttons() {
        let overrides = OptionSet::new(value_map! {
            "headerToolbar" => value_map! { "start" => "gridMonth,gridWeek refresh" },
            "customButtons" => value_map! {
                "refresh" => value_map! { "text" => "Reload", "icon" => "rotate" },
            },
        });
        let options = OptionSet::merge_layers(&[&default_options(), &overrides]);
        let theme = StandardTheme::new(&options);
        let config = parse_toolbars(&options, &overrides, &theme, &specs());

        assert_eq!(config.view_names_with_buttons, vec!["gridMonth".to_string(), "gridWeek".to_string()]);
        let start = &config.header.unwrap().sections["start"];
        assert_eq!(start[0][0].button_text.as_deref(), Some("month"));
        assert_eq!(start[1][0].command, Some(ToolbarCommand::Custom("refresh".to_string())));
        assert_eq!(start[1][0].button_icon.as_deref(), Some("fc-icon fc-icon-rotate"));
    }
}
