//! Date profiles and the generators that build them
//!
//! A date profile is the set of ranges a view shows for a given date:
//! - `current_range` - The period the view is "about" (a month, a week)
//! - `render_range` - What gets laid out, e.g. whole weeks around a month
//! - `active_range` - The part of the render range that is interactive
//!
//! Generators are chosen per view. The standard generator handles durations,
//! day counts, custom visible ranges, hidden days and valid ranges; the table
//! generator additionally pads month and year views out to whole weeks.

use crate::date::{self, DateMarker, DateRange, OpenDateRange, Unit};
use crate::date_env::DateEnv;
use crate::duration::Duration;
use crate::memo::Same;
use crate::options::OptionSet;
use crate::value::Value;
use crate::view_spec::ViewSpec;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Ranges and navigation data for one view at one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateProfile {
    pub current_date: DateMarker,
    /// Whether the current range overlaps the valid range
    pub is_valid: bool,
    pub valid_range: OpenDateRange,
    pub current_range: DateRange,
    pub current_range_unit: Unit,
    pub is_range_all_day: bool,
    /// `None` when nothing of the render range is inside the valid range
    pub active_range: Option<DateRange>,
    pub render_range: DateRange,
    pub slot_min_time: Duration,
    pub slot_max_time: Duration,
    pub date_increment: Duration,
}

impl DateProfile {
    pub fn active_contains(&self, marker: DateMarker) -> bool {
        self.active_range.is_some_and(|r| r.contains(marker))
    }
}

impl Same for DateProfile {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

/// Inputs a generator is built from
#[derive(Clone)]
pub struct DateProfileGeneratorProps {
    pub view_spec: Rc<ViewSpec>,
    pub date_env: Rc<DateEnv>,
    pub slot_min_time: Duration,
    pub slot_max_time: Duration,
    pub show_non_current_dates: bool,
    pub day_count: Option<i64>,
    pub date_alignment: Option<Unit>,
    pub date_increment: Option<Duration>,
    pub hidden_days: Vec<u32>,
    pub weekends: bool,
    pub now: Option<Value>,
    pub valid_range: Option<Value>,
    pub visible_range: Option<Value>,
    pub fixed_week_count: bool,
}

impl DateProfileGeneratorProps {
    /// Collect generator props from view options
    pub fn from_options(view_spec: Rc<ViewSpec>, date_env: Rc<DateEnv>, options: &OptionSet) -> Self {
        let duration = |key: &str, fallback: Duration| {
            options.get_duration(key).ok().flatten().unwrap_or(fallback)
        };
        Self {
            view_spec,
            date_env,
            slot_min_time: duration("slotMinTime", Duration::default()),
            slot_max_time: duration("slotMaxTime", Duration::hours(24)),
            show_non_current_dates: options.flag("showNonCurrentDates", true),
            day_count: options.get_int("dayCount").filter(|n| *n > 0),
            date_alignment: options.get_str("dateAlignment").and_then(Unit::parse),
            date_increment: options.get_duration("dateIncrement").ok().flatten(),
            hidden_days: options
                .get("hiddenDays")
                .map(Value::int_list)
                .unwrap_or_default()
                .into_iter()
                .map(|d| d.rem_euclid(7) as u32)
                .collect(),
            weekends: options.flag("weekends", true),
            now: options.get("now").cloned(),
            valid_range: options.get("validRange").cloned(),
            visible_range: options.get("visibleRange").cloned(),
            fixed_week_count: options.flag("fixedWeekCount", true),
        }
    }

    /// Whether the view shows a time axis bounded by slot min/max times
    pub fn uses_min_max_time(&self) -> bool {
        self.view_spec.option_defaults.flag("usesMinMaxTime", false)
    }
}

impl Same for DateProfileGeneratorProps {
    fn same(&self, other: &Self) -> bool {
        self.view_spec.same(&other.view_spec)
            && self.date_env.same(&other.date_env)
            && self.slot_min_time == other.slot_min_time
            && self.slot_max_time == other.slot_max_time
            && self.show_non_current_dates == other.show_non_current_dates
            && self.day_count == other.day_count
            && self.date_alignment == other.date_alignment
            && self.date_increment == other.date_increment
            && self.hidden_days == other.hidden_days
            && self.weekends == other.weekends
            && self.now == other.now
            && self.valid_range == other.valid_range
            && self.visible_range == other.visible_range
            && self.fixed_week_count == other.fixed_week_count
    }
}

/// Builds a generator for a view; registered per view as a capability
pub type DateProfileGeneratorFactory = Rc<dyn Fn(DateProfileGeneratorProps) -> Rc<dyn DateProfileGenerator>>;

/// Which weekdays a view hides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenDays([bool; 7]);

impl HiddenDays {
    pub fn new(hidden: &[u32], weekends: bool) -> Self {
        let mut days = [false; 7];
        for d in hidden {
            days[(*d % 7) as usize] = true;
        }
        if !weekends {
            days[0] = true;
            days[6] = true;
        }
        if days.iter().all(|h| *h) {
            tracing::warn!("every weekday is hidden, showing all days instead");
            days = [false; 7];
        }
        Self(days)
    }

    pub fn is_hidden(&self, marker: DateMarker) -> bool {
        self.0[date::day_of_week(marker) as usize]
    }

    /// Step forward (or backward) until a visible day
    ///
    /// With `exclusive`, the day *before* the marker is what must be visible,
    /// which is how range ends are adjusted.
    pub fn skip(&self, mut marker: DateMarker, inc: i64, exclusive: bool) -> DateMarker {
        let offset = if exclusive { inc } else { 0 };
        while self.0[(date::day_of_week(marker) as i64 + offset).rem_euclid(7) as usize] {
            marker = date::add_days(marker, inc);
        }
        marker
    }

    /// Shrink a range so it starts and ends on visible days
    pub fn trim(&self, range: &DateRange) -> Option<DateRange> {
        let start = self.skip(range.start, 1, false);
        let end = self.skip(range.end, -1, true);
        (start < end).then_some(DateRange::new(start, end))
    }

    pub fn trim_open(&self, range: &OpenDateRange) -> Option<OpenDateRange> {
        let start = range.start.map(|s| self.skip(s, 1, false));
        let end = range.end.map(|e| self.skip(e, -1, true));
        match (start, end) {
            (Some(s), Some(e)) if s >= e => None,
            _ => Some(OpenDateRange { start, end }),
        }
    }
}

/// Range bookkeeping shared by every generator
pub struct GeneratorBase {
    pub props: DateProfileGeneratorProps,
    pub now: DateMarker,
    pub hidden_days: HiddenDays,
}

struct CurrentRangeInfo {
    duration: Option<Duration>,
    unit: Unit,
    range: DateRange,
}

impl GeneratorBase {
    pub fn new(props: DateProfileGeneratorProps) -> Self {
        let now = props.date_env.now_marker(props.now.as_ref());
        let hidden_days = HiddenDays::new(&props.hidden_days, props.weekends);
        Self { props, now, hidden_days }
    }

    fn env(&self) -> &DateEnv {
        &self.props.date_env
    }

    pub fn build_valid_range(&self) -> OpenDateRange {
        self.refine_range(self.props.valid_range.as_ref())
            .unwrap_or_else(OpenDateRange::unbounded)
    }

    /// Parse a `{start, end}` input and widen it to whole days
    fn refine_range(&self, input: Option<&Value>) -> Option<OpenDateRange> {
        let map = input?.as_map()?;
        let marker = |key: &str| map.get(key).and_then(|v| self.env().create_marker(v)).map(|p| p.marker);
        let start = marker("start").map(date::start_of_day);
        let end = marker("end").map(|e| {
            let day = date::start_of_day(e);
            if e == day { day } else { date::add_days(day, 1) }
        });
        match (start, end) {
            (Some(s), Some(e)) if e <= s => Some(OpenDateRange {
                start: Some(s),
                end: Some(date::add_days(s, 1)),
            }),
            _ => Some(OpenDateRange { start, end }),
        }
    }

    fn build_current_range_info(&self, marker: DateMarker, direction: i64) -> CurrentRangeInfo {
        if let (Some(duration), Some(unit)) = (self.props.view_spec.duration, self.props.view_spec.duration_unit) {
            return CurrentRangeInfo {
                duration: Some(duration),
                unit,
                range: self.build_range_from_duration(marker, direction, &duration, unit),
            };
        }
        if let Some(day_count) = self.props.day_count {
            return CurrentRangeInfo {
                duration: None,
                unit: Unit::Day,
                range: self.build_range_from_day_count(marker, direction, day_count),
            };
        }
        if let Some(range) = self.build_custom_visible_range() {
            return CurrentRangeInfo {
                duration: None,
                unit: date::greatest_unit_between(range.start, range.end).0,
                range,
            };
        }
        let fallback = Duration::days(1);
        let unit = fallback.greatest_unit().0;
        CurrentRangeInfo {
            duration: Some(fallback),
            unit,
            range: self.build_range_from_duration(marker, direction, &fallback, unit),
        }
    }

    fn build_range_from_duration(&self, mut marker: DateMarker, direction: i64, duration: &Duration, unit: Unit) -> DateRange {
        let alignment = self.props.date_alignment.unwrap_or_else(|| match &self.props.date_increment {
            Some(inc) if inc.as_rough_ms() < duration.as_rough_ms() => inc.greatest_unit().0,
            _ => unit,
        });

        if duration.as_rough_days() <= 1.0 && self.hidden_days.is_hidden(marker) {
            marker = date::start_of_day(self.hidden_days.skip(marker, direction_step(direction), false));
        }

        let compute = |m: DateMarker| {
            let start = self.env().start_of(m, alignment);
            DateRange::new(start, self.env().add(start, duration))
        };
        let range = compute(marker);
        if self.hidden_days.trim(&range).is_none() {
            return compute(self.hidden_days.skip(marker, direction_step(direction), false));
        }
        range
    }

    fn build_range_from_day_count(&self, marker: DateMarker, direction: i64, day_count: i64) -> DateRange {
        let mut start = marker;
        if let Some(alignment) = self.props.date_alignment {
            start = self.env().start_of(start, alignment);
        }
        start = date::start_of_day(start);
        start = self.hidden_days.skip(start, direction_step(direction), false);

        let mut end = start;
        let mut running = 0;
        while running < day_count {
            end = date::add_days(end, 1);
            if !self.hidden_days.is_hidden(end) {
                running += 1;
            }
        }
        DateRange::new(start, end)
    }

    fn build_custom_visible_range(&self) -> Option<DateRange> {
        let range = self.refine_range(self.props.visible_range.as_ref())?;
        Some(DateRange::new(range.start?, range.end?))
    }

    fn adjust_active_range(&self, range: DateRange) -> DateRange {
        let DateRange { mut start, mut end } = range;
        if self.props.uses_min_max_time() {
            if self.props.slot_min_time.as_rough_days() < 0.0 {
                start = self.env().add(date::start_of_day(start), &self.props.slot_min_time);
            }
            if self.props.slot_max_time.as_rough_days() > 1.0 {
                end = date::add_days(date::start_of_day(end), -1);
                end = self.env().add(end, &self.props.slot_max_time);
            }
        }
        DateRange::new(start, end)
    }

    fn build_date_increment(&self, fallback: Option<Duration>) -> Duration {
        if let Some(inc) = self.props.date_increment {
            return inc;
        }
        if let Some(alignment) = self.props.date_alignment {
            return Duration::one(alignment);
        }
        fallback.unwrap_or_else(|| Duration::days(1))
    }
}

fn direction_step(direction: i64) -> i64 {
    if direction < 0 { -1 } else { 1 }
}

/// Builds date profiles for one view's windowing rules
pub trait DateProfileGenerator {
    fn base(&self) -> &GeneratorBase;

    /// Expand the current range into what gets laid out
    fn build_render_range(&self, current_range: DateRange, _unit: Unit, _is_all_day: bool) -> DateRange {
        current_range
    }

    /// Profile for the period containing `marker`
    ///
    /// `direction` says which way to skip hidden days (-1 backwards); with
    /// `force_to_valid` the marker is first pulled inside the valid range.
    fn build(&self, mut marker: DateMarker, direction: i64, force_to_valid: bool) -> DateProfile {
        let base = self.base();
        let raw_valid = base.build_valid_range();
        let valid_range = base.hidden_days.trim_open(&raw_valid).unwrap_or(raw_valid);

        if force_to_valid {
            marker = valid_range.constrain_marker(marker);
        }

        let info = base.build_current_range_info(marker, direction);
        let is_range_all_day = info.unit.is_all_day();
        let trimmed_current = base.hidden_days.trim(&info.range).unwrap_or(info.range);
        let render = self.build_render_range(trimmed_current, info.unit, is_range_all_day);
        let render_range = base.hidden_days.trim(&render).unwrap_or(render);

        let mut active = Some(render_range);
        if !base.props.show_non_current_dates {
            active = active.and_then(|a| a.intersect(&info.range));
        }
        let active_range = active
            .map(|a| base.adjust_active_range(a))
            .and_then(|a| valid_range.constrain_range(&a));
        let is_valid = valid_range.intersects(&info.range);

        if let Some(active) = &active_range {
            if !active.contains(marker) {
                marker = active.start;
            }
        }

        DateProfile {
            current_date: marker,
            is_valid,
            valid_range,
            current_range: info.range,
            current_range_unit: info.unit,
            is_range_all_day,
            active_range,
            render_range,
            slot_min_time: base.props.slot_min_time,
            slot_max_time: base.props.slot_max_time,
            date_increment: base.build_date_increment(info.duration),
        }
    }

    /// Profile for the period before `profile`
    fn build_prev(&self, profile: &DateProfile, current_date: DateMarker) -> DateProfile {
        let env = &self.base().props.date_env;
        let prev = env.subtract(env.start_of(current_date, profile.current_range_unit), &profile.date_increment);
        self.build(prev, -1, true)
    }

    /// Profile for the period after `profile`
    fn build_next(&self, profile: &DateProfile, current_date: DateMarker) -> DateProfile {
        let env = &self.base().props.date_env;
        let next = env.add(env.start_of(current_date, profile.current_range_unit), &profile.date_increment);
        self.build(next, 1, true)
    }

    /// The date "now" was resolved to when the generator was built
    fn now(&self) -> DateMarker {
        self.base().now
    }
}

/// Generator for list- and time-based views
pub struct StandardDateProfileGenerator {
    base: GeneratorBase,
}

impl StandardDateProfileGenerator {
    pub fn new(props: DateProfileGeneratorProps) -> Self {
        Self {
            base: GeneratorBase::new(props),
        }
    }
}

impl DateProfileGenerator for StandardDateProfileGenerator {
    fn base(&self) -> &GeneratorBase {
        &self.base
    }
}

/// Generator for day-grid views: month and year ranges render as whole weeks
pub struct TableDateProfileGenerator {
    base: GeneratorBase,
}

impl TableDateProfileGenerator {
    pub fn new(props: DateProfileGeneratorProps) -> Self {
        Self {
            base: GeneratorBase::new(props),
        }
    }

    pub fn factory() -> DateProfileGeneratorFactory {
        Rc::new(|props| Rc::new(TableDateProfileGenerator::new(props)) as Rc<dyn DateProfileGenerator>)
    }
}

impl DateProfileGenerator for TableDateProfileGenerator {
    fn base(&self) -> &GeneratorBase {
        &self.base
    }

    fn build_render_range(&self, current_range: DateRange, unit: Unit, _is_all_day: bool) -> DateRange {
        let env = &self.base.props.date_env;
        let DateRange { mut start, mut end } = current_range;

        if !matches!(unit, Unit::Year | Unit::Month) {
            return current_range;
        }

        start = env.start_of_week(start);
        let end_week = env.start_of_week(end);
        if end_week != end {
            end = date::add_days(end_week, 7);
        }

        // pad the last month out to six rows
        if self.base.props.fixed_week_count {
            let last_month_start = env.start_of(date::add_days(current_range.end, -1), Unit::Month);
            let last_month_render_start = env.start_of_week(last_month_start);
            let days = (end - last_month_render_start).num_days();
            let rows = (days + 6).div_euclid(7);
            end = date::add_days(end, 7 * (6 - rows));
        }

        DateRange::new(start, end)
    }
}

/// Instantiate the generator a view asks for, or the standard one
pub fn build_date_profile_generator(props: DateProfileGeneratorProps) -> Rc<dyn DateProfileGenerator> {
    match props.view_spec.date_profile_generator.clone() {
        Some(factory) => factory(props),
        None => Rc::new(StandardDateProfileGenerator::new(props)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::date_env::parse_iso;
    use crate::event_store::tests::env;
    use crate::options::default_options;
    use crate::value_map;
    use crate::view_spec::{build_view_specs, ViewConfig, ViewConfigMap};

    fn m(s: &str) -> DateMarker {
        parse_iso(s).unwrap().marker
    }

    pub(crate) fn specs() -> crate::view_spec::ViewSpecHash {
        let mut views = ViewConfigMap::new();
        views.insert(
            "grid".to_string(),
            ViewConfig::with_component("DayTable", OptionSet::empty()).date_profile_generator(TableDateProfileGenerator::factory()),
        );
        views.insert(
            "gridMonth".to_string(),
            ViewConfig::extending("grid", OptionSet::new(value_map! { "duration" => value_map! { "months" => 1i64 } })),
        );
        views.insert(
            "gridWeek".to_string(),
            ViewConfig::extending("grid", OptionSet::new(value_map! { "duration" => value_map! { "weeks" => 1i64 } })),
        );
        views.insert(
            "list".to_string(),
            ViewConfig::with_component("List", OptionSet::new(value_map! { "duration" => value_map! { "days" => 3i64 } })),
        );
        build_view_specs(&views, &OptionSet::empty(), &OptionSet::empty(), &OptionSet::empty(), &default_options())
    }

    fn generator(view: &str, extra: crate::value::ValueMap) -> Rc<dyn DateProfileGenerator> {
        let spec = specs()[view].clone();
        let options = OptionSet::merge_layers(&[&default_options(), &OptionSet::new(extra)]);
        let props = DateProfileGeneratorProps::from_options(spec, Rc::new(env("UTC")), &options);
        build_date_profile_generator(props)
    }

    #[test]
    fn test_month_renders_six_weeks() {
        let gen = generator("gridMonth", value_map! {});
        let profile = gen.build(m("2024-05-15"), 0, true);
        assert_eq!(profile.current_range, DateRange::new(m("2024-05-01"), m("2024-06-01")));
        assert_eq!(profile.current_range_unit, Unit::Month);
        // weeks start on Sunday in the default locale
        assert_eq!(profile.render_range.start, m("2024-04-28"));
        assert_eq!(profile.render_range.day_count(), 42);
        assert_eq!(profile.date_increment, Duration::months(1));
        assert!(profile.is_valid);
    }

    #[test]
    fn test_month_without_fixed_week_count() {
        let gen = generator("gridMonth", value_map! { "fixedWeekCount" => false });
        let profile = gen.build(m("2024-05-15"), 0, true);
        assert_eq!(profile.render_range, DateRange::new(m("2024-04-28"), m("2024-06-02")));
    }

    #[test]
    fn test_week_ignores_fixed_week_count() {
        let gen = generator("gridWeek", value_map! { "fixedWeekCount" => true });
        let profile = gen.build(m("2024-05-15"), 0, true);
        assert_eq!(profile.current_range, DateRange::new(m("2024-05-12"), m("2024-05-19")));
        assert_eq!(profile.render_range, profile.current_range);
        assert_eq!(profile.active_range, Some(profile.current_range));
    }

    #[test]
    fn test_non_current_dates_hidden() {
        let gen = generator("gridMonth", value_map! { "showNonCurrentDates" => false });
        let profile = gen.build(m("2024-05-15"), 0, true);
        assert_eq!(profile.active_range, Some(profile.current_range));
    }

    #[test]
    fn test_prev_next_step_by_increment() {
        let gen = generator("gridWeek", value_map! {});
        let profile = gen.build(m("2024-05-15"), 0, true);
        assert_eq!(profile.current_range.start, m("2024-05-12"));
        let next = gen.build_next(&profile, m("2024-05-15"));
        assert_eq!(next.current_range.start, m("2024-05-19"));
        let prev = gen.build_prev(&profile, m("2024-05-15"));
        assert_eq!(prev.current_range.start, m("2024-05-05"));
    }

    #[test]
    fn test_valid_range_constrains() {
        let gen = generator(
            "gridWeek",
            value_map! { "validRange" => value_map! { "start" => "2024-05-01", "end" => "2024-06-01" } },
        );
        let profile = gen.build(m("2024-07-20"), 0, true);
        assert!(profile.is_valid);
        assert!(profile.current_range.contains(m("2024-05-31")));
        let active = profile.active_range.unwrap();
        assert!(active.end <= m("2024-06-01"));

        let next = gen.build_next(&profile, profile.current_date);
        assert!(!gen.build(m("2024-07-20"), 0, false).is_valid);
        assert!(next.current_range.start <= m("2024-06-01"));
    }

    #[test]
    fn test_day_count_skips_hidden_days() {
        let spec = specs()["list"].clone();
        let options = OptionSet::merge_layers(&[
            &default_options(),
            &OptionSet::new(value_map! { "weekends" => false }),
        ]);
        let mut props = DateProfileGeneratorProps::from_options(spec, Rc::new(env("UTC")), &options);
        props.day_count = Some(3);
        let mut spec = (*props.view_spec).clone();
        spec.duration = None;
        spec.duration_unit = None;
        props.view_spec = Rc::new(spec);
        let gen = StandardDateProfileGenerator::new(props);

        // Friday 2024-05-17: Fri, Mon, Tue
        let profile = gen.build(m("2024-05-17"), 0, true);
        assert_eq!(profile.current_range.start, m("2024-05-17"));
        assert_eq!(profile.current_range.end, m("2024-05-22"));
        assert_eq!(profile.current_range_unit, Unit::Day);
    }

    #[test]
    fn test_all_hidden_falls_back() {
        let hidden = HiddenDays::new(&[1, 2, 3, 4, 5], false);
        assert!(!hidden.is_hidden(m("2024-05-15")));
    }

    proptest::proptest! {
        #[test]
        fn test_built_profile_contains_its_date(offset in 0i64..4000, view in 0usize..3) {
            let view = ["gridMonth", "gridWeek", "list"][view];
            let gen = generator(view, value_map! {});
            let marker = crate::date::add_days(m("2020-01-01"), offset);
            let profile = gen.build(marker, 0, true);
            proptest::prop_assert!(profile.current_range.contains(marker));
            proptest::prop_assert!(profile.active_contains(profile.current_date));
            proptest::prop_assert!(profile.render_range.contains_range(&profile.current_range));
        }
    }

    #[test]
    fn test_props_same_fieldwise() {
        let spec = specs()["gridMonth"].clone();
        let env = Rc::new(env("UTC"));
        let a = DateProfileGeneratorProps::from_options(spec.clone(), env.clone(), &default_options());
        let b = DateProfileGeneratorProps::from_options(spec, env, &default_options());
        assert!(a.same(&b));
        let c = DateProfileGeneratorProps { weekends: false, ..b };
        assert!(!a.same(&c));
    }
}
