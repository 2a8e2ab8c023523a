//! Runtime error types.

use thiserror::Error;

/// Errors that can occur during runtime startup and operation.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A plugin failed during the load phase.
    #[error("Plugin load error: {0}")]
    PluginLoad(#[from] ember_framework::LoadError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
