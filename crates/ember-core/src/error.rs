//! Error taxonomy for the Ember runtime.
//!
//! Three tiers, matching how failures are handled:
//!
//! - [`ConfigError`] - load-phase misconfiguration; fatal, aborts startup.
//! - [`HandlerError`] - a handler or job callback failed; caught at the
//!   dispatch boundary, logged with the offending identity, never propagated.
//! - [`SendError`] / [`AiError`] - collaborator call failures; timeouts get
//!   their own variants so they can be told apart in logs.

use std::time::Duration;

use thiserror::Error;

/// Misconfiguration detected during the plugin load phase.
///
/// Any of these aborts startup; a half-registered plugin set never reaches
/// the dispatch loop.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A second plugin tried to claim a service name.
    #[error("service '{name}' is already registered by plugin '{existing}'")]
    DuplicateService {
        /// The contested service name.
        name: String,
        /// Plugin that registered it first.
        existing: String,
    },

    /// A second plugin tried to claim a command name.
    #[error("command '{name}' is already registered by plugin '{existing}'")]
    DuplicateCommand {
        /// The contested command name.
        name: String,
        /// Plugin that registered it first.
        existing: String,
    },

    /// A cron job spec had both, neither, or out-of-range schedule fields.
    #[error("invalid job spec for '{job}': {reason}")]
    InvalidJobSpec {
        /// Name of the offending job.
        job: String,
        /// What was wrong with the spec.
        reason: String,
    },
}

/// Type-erased failure from an event handler or job callback.
///
/// Recovered at the dispatch/scheduler boundary: logged, never propagated,
/// so one misbehaving plugin cannot halt the bus or starve other jobs.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for event handlers and job callbacks.
pub type HandlerResult = Result<(), HandlerError>;

/// Failure delivering an outbound message through the transport.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The transport rejected or could not deliver the message.
    #[error("transport rejected message: {0}")]
    Rejected(String),

    /// The transport did not answer within the configured bound.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure obtaining a reply from the AI collaborator.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// The provider returned an error.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider did not answer within the configured bound.
    #[error("ai call timed out after {0:?}")]
    Timeout(Duration),
}
