//! The process-wide runtime context.
//!
//! [`RuntimeContext`] is the single owner of every shared registry: the
//! event bus, the service registry, the command router, the cron scheduler,
//! and the conversation windows. It is constructed once at startup from
//! [`RuntimeSettings`] and passed explicitly (behind an `Arc`) to every
//! component that needs it. There are no ambient globals.
//!
//! Registries are mutated during the load phase and from within handler
//! execution only; the runtime dispatches one event at a time, so the
//! internal locks are uncontended in normal operation.

use std::sync::Arc;
use std::time::Duration;

use ember_core::{AI_SERVICE, AiCapability, SEND_SERVICE, SendCapability};

use crate::bus::EventBus;
use crate::command::CommandRouter;
use crate::cron::CronScheduler;
use crate::history::ContextManager;
use crate::services::ServiceRegistry;

/// Behavioral settings the context is built from.
///
/// The runtime crate derives these from its loaded configuration; tests
/// construct them directly.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Literal prefixes that mark a message as directed at the bot.
    pub trigger_words: Vec<String>,
    /// Character after a trigger word that introduces a named command.
    pub command_marker: char,
    /// Per-chat rolling history cap.
    pub history_cap: usize,
    /// Whether pinned context is consumed after one AI call.
    pub consume_pinned: bool,
    /// Maximum gap between history entries still counted as one
    /// conversation.
    pub expiry_threshold: Duration,
    /// Operator identity plugins may address directly.
    pub superuser: Option<String>,
    /// Sender name recorded for the bot's own replies.
    pub assistant_name: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            trigger_words: vec!["!pot".into(), "!pothead".into(), "!ph".into()],
            command_marker: '#',
            history_cap: 30,
            consume_pinned: true,
            expiry_threshold: Duration::from_secs(300),
            superuser: None,
            assistant_name: "Assistant".into(),
        }
    }
}

/// Owner of all shared runtime state.
pub struct RuntimeContext {
    bus: EventBus,
    services: ServiceRegistry,
    commands: CommandRouter,
    cron: CronScheduler,
    history: ContextManager,
    expiry_threshold: Duration,
    superuser: Option<String>,
    assistant_name: String,
}

impl RuntimeContext {
    /// Builds a context with empty registries from the given settings.
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            bus: EventBus::new(),
            services: ServiceRegistry::new(),
            commands: CommandRouter::new(settings.trigger_words, settings.command_marker),
            cron: CronScheduler::new(),
            history: ContextManager::new(settings.history_cap, settings.consume_pinned),
            expiry_threshold: settings.expiry_threshold,
            superuser: settings.superuser,
            assistant_name: settings.assistant_name,
        }
    }

    /// The event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The inter-plugin service registry.
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// The command router.
    pub fn commands(&self) -> &CommandRouter {
        &self.commands
    }

    /// The cron scheduler.
    pub fn cron(&self) -> &CronScheduler {
        &self.cron
    }

    /// The conversation context manager.
    pub fn history(&self) -> &ContextManager {
        &self.history
    }

    /// Maximum gap for the conversation-window walk.
    pub fn expiry_threshold(&self) -> Duration {
        self.expiry_threshold
    }

    /// Operator identity, when configured.
    pub fn superuser(&self) -> Option<&str> {
        self.superuser.as_deref()
    }

    /// Sender name recorded for the bot's own replies.
    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    /// Resolves the transport send capability, if a plugin registered one.
    pub fn send_capability(&self) -> Option<Arc<dyn SendCapability>> {
        self.services
            .resolve::<Arc<dyn SendCapability>>(SEND_SERVICE)
            .map(|svc| Arc::clone(&*svc))
    }

    /// Resolves the AI capability, if a plugin registered one.
    pub fn ai_capability(&self) -> Option<Arc<dyn AiCapability>> {
        self.services
            .resolve::<Arc<dyn AiCapability>>(AI_SERVICE)
            .map(|svc| Arc::clone(&*svc))
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("services", &self.services.len())
            .field("commands", &self.commands.command_count())
            .field("jobs", &self.cron.job_count())
            .finish()
    }
}
