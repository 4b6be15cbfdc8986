//! Read-only view handle
//!
//! Built once per (view type, date env) and handed to the render layer. It
//! holds no state of its own; every read goes through the accessor to the
//! latest snapshot.

use crate::error::Result;
use crate::manager::DataAccessor;
use kalends_core::{DateEnv, DateRange};
use std::rc::Rc;

pub struct ViewApi {
    view_type: String,
    accessor: DataAccessor,
    date_env: Rc<DateEnv>,
}

impl ViewApi {
    pub fn new(view_type: impl Into<String>, accessor: DataAccessor, date_env: Rc<DateEnv>) -> Self {
        Self {
            view_type: view_type.into(),
            accessor,
            date_env,
        }
    }

    pub fn view_type(&self) -> &str {
        &self.view_type
    }

    pub fn date_env(&self) -> &Rc<DateEnv> {
        &self.date_env
    }

    /// Title of the latest snapshot
    pub fn title(&self) -> Result<String> {
        Ok(self.accessor.current_data()?.view_title.clone())
    }

    /// The interactive part of the rendered range
    pub fn active_range(&self) -> Result<Option<DateRange>> {
        Ok(self.accessor.current_data()?.date_profile().active_range)
    }

    /// The period the view is about
    pub fn current_range(&self) -> Result<DateRange> {
        Ok(self.accessor.current_data()?.date_profile().current_range)
    }
}
