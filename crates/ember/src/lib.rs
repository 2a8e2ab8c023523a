//! # Ember
//!
//! A plugin-based chat-bot runtime.
//!
//! ## Overview
//!
//! Ember receives messages from a messaging transport, routes them to
//! trigger-word commands or passthrough handlers, and lets independently
//! loaded plugins expose and consume named services (an AI-chat service,
//! a scheduling service) without linking against each other.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   events   ┌──────────────┐  publish   ┌────────────────────────┐
//! │ Transport │───────────▶│ EmberRuntime │───────────▶│ EventBus → subscribers │
//! │ (inbound) │            │ dispatch loop│            └────────────────────────┘
//! └───────────┘            │              │  route     ┌────────────────────────┐
//!        ┌────────┐ tick   │              │───────────▶│ CommandRouter → plugin │
//!        │ Timer  │───────▶│              │            │ handlers / AI service  │
//!        └────────┘        └──────────────┘            └────────────────────────┘
//! ```
//!
//! - **EventBus**: synchronous fan-out in registration order, one event at
//!   a time, failures isolated per handler
//! - **ServiceRegistry**: name → capability lookup between plugins
//! - **CommandRouter**: trigger words, `#`-marker commands, AI prompts,
//!   plain passthrough
//! - **CronScheduler**: interval and time-of-day jobs on each timer tick
//! - **ContextManager**: bounded per-chat history with pinned context and
//!   recency-windowed AI context
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = EmberRuntime::new();
//!     runtime.register_plugin(Arc::new(EchoPlugin));
//!     runtime.spawn_signal_handler();
//!     runtime.run(inbound_events).await?;
//!     Ok(())
//! }
//! ```

pub use ember_core as core;
pub use ember_framework as framework;
pub use ember_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use ember::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use ember_runtime::{ConfigLoader, EmberConfig, EmberRuntime};

    // Plugin system - primary unit of behavior
    pub use ember_framework::{LoadContext, Plugin, PluginManager};

    // Registries reachable from handlers
    pub use ember_framework::{
        CommandHandler, CommandInvocation, CommandReply, EventHandler, JobSpec, Route,
        RuntimeContext, RuntimeSettings,
    };

    // Event and message model
    pub use ember_core::{Attachment, ChatMessage, Event, EventKind, GroupMember, HistoryEntry};

    // Collaborator capabilities and their registry names
    pub use ember_core::{AI_SERVICE, AiCapability, SEND_SERVICE, SendCapability};

    // Error taxonomy
    pub use ember_core::{AiError, ConfigError, HandlerError, HandlerResult, SendError};
}
