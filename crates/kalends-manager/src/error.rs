//! Error types for kalends-manager

use thiserror::Error;

/// Result type for kalends-manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kalends-manager
#[derive(Debug, Error)]
pub enum Error {
    /// The requested view type has no resolved view spec
    #[error("viewType \"{view_type}\" is not available. Please make sure you've loaded all necessary plugins")]
    ViewNotAvailable {
        /// The view type that was asked for
        view_type: String,
    },

    /// `resume` called for a scope that is not paused
    #[error("resume(\"{scope}\") without a matching pause")]
    UnbalancedResume {
        /// Pause scope passed to `resume`
        scope: String,
    },

    /// Raised by a plugin reducer or option change handler
    #[error("plugin error: {0}")]
    Plugin(String),

    /// A handle outlived the manager it points to
    #[error("calendar data manager has been dropped")]
    ManagerDropped,

    /// State was read before construction finished
    #[error("calendar data manager is not initialized")]
    Uninitialized,

    /// Reading an options file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An options file is not valid RON
    #[error("ron error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] kalends_core::Error),
}

impl Error {
    /// Shorthand for plugin code reporting a failure
    pub fn plugin(message: impl Into<String>) -> Self {
        Error::Plugin(message.into())
    }
}
