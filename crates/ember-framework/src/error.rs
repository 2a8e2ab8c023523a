//! Error types for the Ember framework.

use thiserror::Error;

use ember_core::HandlerError;

/// A plugin failed during the load phase.
///
/// Load failures are fatal: the runtime aborts startup rather than run with
/// a half-registered plugin set.
#[derive(Debug, Error)]
#[error("plugin '{plugin}' failed to load: {source}")]
pub struct LoadError {
    /// Name of the plugin whose `on_load` failed.
    pub plugin: String,
    /// The underlying failure.
    #[source]
    pub source: HandlerError,
}

impl LoadError {
    /// Wraps a load-phase failure with the owning plugin's name.
    pub fn new(plugin: impl Into<String>, source: HandlerError) -> Self {
        Self {
            plugin: plugin.into(),
            source,
        }
    }
}
