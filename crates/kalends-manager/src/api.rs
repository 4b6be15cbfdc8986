//! The embedding API handle
//!
//! A manager is constructed with a handle to whatever object embeds it.
//! The handle receives the manager's dispatcher and accessor once the
//! manager exists, and is bound as the context of every emitted event.

use crate::error::{Error, Result};
use crate::manager::{DataAccessor, Dispatcher};
use kalends_core::{Action, DateMarker, Duration, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Implemented by whatever owns the manager
pub trait CalendarApi {
    /// Called once while the manager is being constructed
    fn attach(&self, dispatcher: Dispatcher, accessor: DataAccessor);
}

/// A calendar without a render layer
///
/// Wraps the raw actions in the navigation helpers an embedder usually
/// wants. Useful for tests, tools and headless services.
#[derive(Default)]
pub struct HeadlessCalendar {
    handles: RefCell<Option<(Dispatcher, DataAccessor)>>,
}

impl CalendarApi for HeadlessCalendar {
    fn attach(&self, dispatcher: Dispatcher, accessor: DataAccessor) {
        *self.handles.borrow_mut() = Some((dispatcher, accessor));
    }
}

impl HeadlessCalendar {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn handles(&self) -> Result<(Dispatcher, DataAccessor)> {
        self.handles.borrow().clone().ok_or(Error::Uninitialized)
    }

    pub fn dispatch(&self, action: Action) -> Result<()> {
        let (dispatcher, _) = self.handles()?;
        dispatcher.dispatch(action)
    }

    pub fn prev(&self) -> Result<()> {
        self.dispatch(Action::Prev)
    }

    pub fn next(&self) -> Result<()> {
        self.dispatch(Action::Next)
    }

    /// Move one year back, keeping the view
    pub fn prev_year(&self) -> Result<()> {
        let date = self.shifted_year(-1)?;
        self.dispatch(Action::ChangeDate { date_marker: date })
    }

    pub fn next_year(&self) -> Result<()> {
        let date = self.shifted_year(1)?;
        self.dispatch(Action::ChangeDate { date_marker: date })
    }

    fn shifted_year(&self, years: i32) -> Result<DateMarker> {
        let (_, accessor) = self.handles()?;
        let data = accessor.current_data()?;
        Ok(data.date_env().add(data.state.current_date, &Duration::years(years)))
    }

    /// Jump to the configured `now`
    pub fn today(&self) -> Result<()> {
        let (dispatcher, accessor) = self.handles()?;
        let data = accessor.current_data()?;
        let now = data.date_env().now_marker(data.calendar_options().get("now"));
        dispatcher.dispatch(Action::UnselectDates)?;
        dispatcher.dispatch(Action::ChangeDate { date_marker: now })
    }

    /// Jump to a date given as anything the date env can parse
    pub fn go_to_date(&self, input: &Value) -> Result<()> {
        let (dispatcher, accessor) = self.handles()?;
        let data = accessor.current_data()?;
        match data.date_env().create_marker(input) {
            Some(parsed) => dispatcher.dispatch(Action::ChangeDate {
                date_marker: parsed.marker,
            }),
            None => {
                tracing::warn!(input = %input, "go_to_date: not a date");
                Ok(())
            }
        }
    }

    pub fn change_view(&self, view_type: &str, date: Option<&Value>) -> Result<()> {
        let (dispatcher, accessor) = self.handles()?;
        let data = accessor.current_data()?;
        let date_marker = date.and_then(|d| data.date_env().create_marker(d)).map(|p| p.marker);
        dispatcher.dispatch(Action::UnselectDates)?;
        dispatcher.dispatch(Action::ChangeViewType {
            view_type: view_type.to_string(),
            date_marker,
        })
    }

    pub fn set_option(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.dispatch(Action::SetOption {
            option_name: name.to_string(),
            value: value.into(),
        })
    }

    pub fn refetch_events(&self) -> Result<()> {
        self.dispatch(Action::FetchEventSources {
            source_ids: None,
            is_refetch: true,
        })
    }

    /// Add a source unless one with the same raw input is present
    pub fn add_event_source(&self, raw: &Value) -> Result<()> {
        let (dispatcher, accessor) = self.handles()?;
        let data = accessor.current_data()?;
        if data.event_sources().values().any(|s| s.raw == *raw) {
            return Ok(());
        }
        match data.parse_event_source(raw) {
            Some(source) => dispatcher.dispatch(Action::AddEventSources { sources: vec![source] }),
            None => Ok(()),
        }
    }

    pub fn remove_all_event_sources(&self) -> Result<()> {
        self.dispatch(Action::RemoveAllEventSources)
    }

    pub fn view_title(&self) -> Result<String> {
        let (_, accessor) = self.handles()?;
        Ok(accessor.current_data()?.view_title.clone())
    }

    pub fn current_date(&self) -> Result<DateMarker> {
        let (_, accessor) = self.handles()?;
        Ok(accessor.current_data()?.state.current_date)
    }
}
