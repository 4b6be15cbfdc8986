//! Identity types for event sources, event definitions and event instances

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique id string
pub fn next_uid() -> String {
    NEXT_UID.fetch_add(1, Ordering::Relaxed).to_string()
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an id from any string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Allocate a fresh unique id
            pub fn generate() -> Self {
                Self(next_uid())
            }

            /// Get the ID as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of an event source registered with the calendar
    SourceId
);

string_id!(
    /// Identifier of a parsed event definition
    DefId
);

string_id!(
    /// Identifier of a concrete event occurrence
    InstanceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SourceId::generate();
        let b = SourceId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_def_id_display() {
        let id = DefId::new("meeting");
        assert_eq!(id.as_str(), "meeting");
        assert_eq!(format!("{}", id), "meeting");
    }
}
