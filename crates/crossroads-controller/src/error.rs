//! Error types for the controller binary.
//!
//! [`ControllerError`] is the top-level error type that wraps every
//! failure mode during startup. Once the control loop is running it
//! cannot fail: bad readings are rejected tick by tick.

/// Top-level error for the controller binary.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crossroads_core::config::ConfigError,
    },

    /// The configuration loaded but describes an unusable intersection.
    #[error("invalid configuration: {source}")]
    Configuration {
        /// The underlying validation error.
        #[from]
        source: crossroads_core::layout::ConfigurationError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: crossroads_observer::StartupError,
    },
}
