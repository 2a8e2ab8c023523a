//! # Ember Framework
//!
//! The plugin runtime core of the Ember bot.
//!
//! Five components carry the architectural weight:
//!
//! - [`EventBus`] - synchronous fan-out of typed events to subscriber
//!   plugins, in registration order, with per-handler failure isolation
//!   and FIFO queueing of nested publishes.
//! - [`ServiceRegistry`] - name → capability lookup so plugins call each
//!   other without static coupling.
//! - [`CommandRouter`] - trigger-word detection, command/prompt/plain
//!   routing, and the process-wide command registry.
//! - [`CronScheduler`] - interval and time-of-day jobs evaluated on each
//!   timer tick.
//! - [`ContextManager`] - bounded, time-windowed conversation history and
//!   per-chat pinned context.
//!
//! [`RuntimeContext`] owns all five; [`PluginManager`] drives [`Plugin`]
//! lifecycles against it. The orchestration (config, logging, the dispatch
//! loop itself) lives in `ember-runtime`.

pub mod bus;
pub mod command;
pub mod context;
pub mod cron;
pub mod error;
pub mod history;
pub mod plugin;
pub mod services;

pub use bus::{EventBus, EventHandler};
pub use command::{CommandHandler, CommandInvocation, CommandReply, CommandRouter, Route};
pub use context::{RuntimeContext, RuntimeSettings};
pub use cron::{CronScheduler, JobCallback, JobSpec};
pub use error::LoadError;
pub use history::ContextManager;
pub use plugin::{LoadContext, Plugin, PluginManager};
pub use services::ServiceRegistry;
