//! View title formatting

use crate::date::{self, DateRange, Unit};
use crate::date_env::DateEnv;
use crate::date_profile::DateProfile;
use crate::options::OptionSet;
use chrono::Datelike;

const YEAR: &str = "%Y";
const MONTH_YEAR: &str = "%B %Y";
const SHORT_DAY: &str = "%b %-d, %Y";
const LONG_DAY: &str = "%B %-d, %Y";

fn default_title_format(profile: &DateProfile) -> &'static str {
    match profile.current_range_unit {
        Unit::Year => YEAR,
        Unit::Month => MONTH_YEAR,
        _ => match date::diff_whole_days(profile.current_range.start, profile.current_range.end) {
            Some(days) if days > 1 => SHORT_DAY,
            _ => LONG_DAY,
        },
    }
}

/// Title for the toolbar, e.g. `May 2024` or `May 12 – 18, 2024`
///
/// The `titleFormat` option takes a strftime pattern.
pub fn build_title(profile: &DateProfile, view_options: &OptionSet, env: &DateEnv) -> String {
    let range = if matches!(profile.current_range_unit, Unit::Year | Unit::Month) {
        profile.current_range
    } else {
        profile.active_range.unwrap_or(profile.current_range)
    };
    let separator = view_options.get_str("titleRangeSeparator").unwrap_or(" - ");

    match view_options.get_str("titleFormat") {
        Some(pattern) => format_range(env, &range, profile.is_range_all_day, pattern, separator),
        None => {
            let pattern = default_title_format(profile);
            format_range(env, &range, profile.is_range_all_day, pattern, separator)
        }
    }
}

fn format_range(env: &DateEnv, range: &DateRange, end_exclusive: bool, pattern: &str, separator: &str) -> String {
    let start = range.start;
    let end = if end_exclusive {
        date::add_ms(range.end, -1)
    } else {
        range.end
    };

    let first = env.format(start, pattern);
    let last = env.format(end, pattern);
    if first == last {
        return first;
    }

    // collapse the shared year (and month) of the built-in day formats
    if pattern == SHORT_DAY && start.year() == end.year() {
        if start.month() == end.month() {
            return format!("{}{}{}", env.format(start, "%b %-d"), separator, env.format(end, "%-d, %Y"));
        }
        return format!("{}{}{}", env.format(start, "%b %-d"), separator, last);
    }
    format!("{}{}{}", first, separator, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_env::parse_iso;
    use crate::date_profile::tests::specs;
    use crate::date_profile::{build_date_profile_generator, DateProfileGeneratorProps};
    use crate::event_store::tests::env;
    use crate::options::default_options;
    use crate::value_map;
    use std::rc::Rc;

    fn title(view: &str, at: &str, options: &OptionSet) -> String {
        let env = Rc::new(env("UTC"));
        let props = DateProfileGeneratorProps::from_options(specs()[view].clone(), env.clone(), options);
        let profile = build_date_profile_generator(props).build(parse_iso(at).unwrap().marker, 0, true);
        build_title(&profile, options, &env)
    }

    #[test]
    fn test_month_title() {
        assert_eq!(title("gridMonth", "2024-05-15", &default_options()), "May 2024");
    }

    #[test]
    fn test_week_title_collapses_month() {
        assert_eq!(title("gridWeek", "2024-05-15", &default_options()), "May 12 \u{2013} 18, 2024");
        assert_eq!(title("gridWeek", "2024-05-29", &default_options()), "May 26 \u{2013} Jun 1, 2024");
    }

    #[test]
    fn test_custom_title_format() {
        let options = OptionSet::merge_layers(&[
            &default_options(),
            &OptionSet::new(value_map! { "titleFormat" => "%Y/%m" }),
        ]);
        assert_eq!(title("gridMonth", "2024-05-15", &options), "2024/05");
    }
}
