//! Kalends Manager - Calendar data orchestration
//!
//! This crate turns the pure reducers and derivations of kalends-core into a
//! running calendar: it owns the state, resolves options through plugins
//! and locales, and publishes an immutable snapshot after every batch of
//! actions.
//!
//! ## Architecture
//!
//! ```text
//! CalendarDataManager
//!  │
//!  ├── TaskRunner ← queues actions, one drain at a time
//!  │
//!  ├── Derivations ← memoized option/view bundles (kalends-core Memo)
//!  │
//!  ├── ManagerState ← reduced per action
//!  │
//!  └── CalendarData ← published per drained batch
//!       └── handed to on_data, option change handlers, ViewApi
//! ```
//!
//! ## Key Components
//!
//! - [`CalendarDataManager`]: Owns state and snapshot, entry point for actions
//! - [`TaskRunner`]: Reentrancy-safe queue with scoped pausing
//! - [`PluginDef`]: Views, event source defs, reducers and option handlers
//! - [`Globals`]: Defaults, plugins and locales shared by every calendar
//! - [`Emitter`]: Named calendar events such as `loading`
//! - [`OptionsLoader`]: Option layers read from RON files
//!
//! ## Design Principles
//!
//! 1. **kalends-core is standalone** - it does NOT know about the manager
//! 2. **Dispatch never reenters** - actions dispatched while one is handled are queued
//! 3. **Snapshots are values** - a published `CalendarData` is never mutated

mod api;
mod builtin;
mod config;
mod data;
mod derive;
mod emitter;
mod error;
mod loader;
mod manager;
mod plugin;
mod runner;
mod view_api;

pub use api::{CalendarApi, HeadlessCalendar};
pub use builtin::{core_plugin, day_grid_plugin};
pub use config::Globals;
pub use data::{CalendarContext, CalendarData, CurrentViewData, ManagerState, OptionsData};
pub use emitter::{Emitter, Handler, HandlerBag, HandlerId};
pub use error::{Error, Result};
pub use loader::{load_options, OptionsLoader};
pub use manager::{CalendarDataManager, CalendarDataManagerProps, DataAccessor, Dispatcher};
pub use plugin::{build_plugin_hooks, OptionChangeHandler, PluginDef, PluginHooks, StateReducer};
pub use runner::TaskRunner;
pub use view_api::ViewApi;
