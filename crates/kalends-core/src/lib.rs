//! Kalends Core - State primitives for an embeddable calendar
//!
//! This crate provides everything the calendar's data manager derives state
//! from, as plain values and pure functions:
//! - Dynamic option values (`Value`, `ValueMap`, `OptionSet`)
//! - Date markers, ranges, durations and the date environment
//! - View specs and date-profile generators
//! - Event stores, event sources and event UI layering
//! - Actions and the sub-reducers that apply them to each slice of state
//! - Single-slot memoization (`Memo`, `MemoObj`) keyed by identity
//!
//! ## Identity
//!
//! Option sets and derived bundles are shared through `Rc`. A memoized
//! derivation hands back the same `Rc` while its inputs are the same, so
//! consumers can detect change with a pointer comparison.

pub mod action;
pub mod business_hours;
pub mod computed;
pub mod date;
pub mod date_env;
pub mod date_profile;
mod duration;
mod error;
pub mod event_source;
pub mod event_store;
pub mod event_ui;
mod identity;
pub mod locale;
pub mod memo;
mod options;
pub mod reducers;
pub mod theme;
pub mod title;
pub mod toolbar;
mod value;
pub mod view_spec;

pub use action::{Action, DateSpan, EventInteractionState};
pub use date::{DateMarker, DateRange, OpenDateRange, Unit};
pub use date_env::{DateEnv, DateEnvSettings, NamedTimeZoneImpl};
pub use date_profile::{DateProfile, DateProfileGenerator, DateProfileGeneratorFactory, DateProfileGeneratorProps};
pub use duration::Duration;
pub use error::{Error, Result};
pub use event_source::{EventSource, EventSourceDef, EventSourceHash, FetchResult};
pub use event_store::EventStore;
pub use identity::{next_uid, DefId, InstanceId, SourceId};
pub use memo::{Memo, MemoObj, Same};
pub use options::{default_options, first_defined, OptionSet};
pub use theme::{Theme, ThemeRegistry};
pub use value::{Value, ValueMap};
pub use view_spec::{ViewConfig, ViewConfigMap, ViewSpec, ViewSpecHash};
