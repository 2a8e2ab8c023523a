//! Command router: trigger-word detection and named command dispatch.
//!
//! The router answers two questions for every inbound message:
//!
//! 1. Is this message directed at the bot (does it start with a trigger
//!    word)?
//! 2. If so, is it a named command (marker right after the trigger) or a
//!    free-form AI prompt?
//!
//! Parsing lives in [`parse`]; this module owns the command registry.
//! Command names are case-sensitive and unique across all loaded plugins;
//! a duplicate registration is a load-time configuration error. Unknown
//! commands are the *caller's* problem to surface: [`CommandRouter::lookup`]
//! returning `None` must end in a user-visible reply, never silence.

mod parse;

pub use parse::Route;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::debug;

use ember_core::{Attachment, ConfigError, HandlerError};

// ============================================================================
// Invocation & Reply
// ============================================================================

/// Everything a command handler receives about one invocation.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    /// Chat the command arrived in.
    pub chat_id: String,
    /// Author of the command message.
    pub sender_id: String,
    /// Comma-separated parameters from the command part.
    pub params: Vec<String>,
    /// Free-form argument text after the command part, with any quoted
    /// message already folded in.
    pub argument: Option<String>,
    /// Attachments on the command message.
    pub attachments: Vec<Attachment>,
    /// Quoted text, verbatim, for handlers that care about the distinction.
    pub quoted_text: Option<String>,
}

/// What a command handler sends back to the chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReply {
    /// Reply text.
    pub text: String,
    /// Local paths of files to attach to the reply.
    pub attachments: Vec<String>,
}

impl CommandReply {
    /// A plain text reply with no attachments.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}

/// Type of a registered command handler.
pub type CommandHandler =
    Arc<dyn Fn(CommandInvocation) -> BoxFuture<'static, Result<CommandReply, HandlerError>> + Send + Sync>;

#[derive(Clone)]
struct CommandEntry {
    plugin_id: String,
    help: String,
    handler: CommandHandler,
}

// ============================================================================
// CommandRouter
// ============================================================================

/// Trigger-word router plus the process-wide command registry.
pub struct CommandRouter {
    /// Sorted longest-first so `!pothead` is never shadowed by `!pot`.
    triggers: Vec<String>,
    marker: char,
    commands: RwLock<HashMap<String, CommandEntry>>,
}

impl CommandRouter {
    /// Creates a router for the given trigger words and command marker.
    pub fn new(mut triggers: Vec<String>, marker: char) -> Self {
        triggers.sort_by_key(|t| std::cmp::Reverse(t.len()));
        Self {
            triggers,
            marker,
            commands: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a command handler under `name`, owned by `plugin_id`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateCommand`] if any loaded plugin already
    /// registered `name`.
    pub fn register_command(
        &self,
        plugin_id: impl Into<String>,
        name: impl Into<String>,
        help: impl Into<String>,
        handler: CommandHandler,
    ) -> Result<(), ConfigError> {
        let plugin_id = plugin_id.into();
        let name = name.into();
        let mut commands = self.commands.write();
        if let Some(existing) = commands.get(&name) {
            return Err(ConfigError::DuplicateCommand {
                name,
                existing: existing.plugin_id.clone(),
            });
        }
        debug!(command = %name, plugin = %plugin_id, "Command registered");
        commands.insert(
            name,
            CommandEntry {
                plugin_id,
                help: help.into(),
                handler,
            },
        );
        Ok(())
    }

    /// Routes a message text. Pure; no handler is invoked.
    pub fn route(&self, text: &str) -> Route {
        parse::route_text(text, &self.triggers, self.marker)
    }

    /// Looks up the handler for `name` (case-sensitive exact match).
    ///
    /// Returns the owning plugin alongside the handler for log attribution.
    pub fn lookup(&self, name: &str) -> Option<(String, CommandHandler)> {
        self.commands
            .read()
            .get(name)
            .map(|e| (e.plugin_id.clone(), Arc::clone(&e.handler)))
    }

    /// Number of registered commands.
    pub fn command_count(&self) -> usize {
        self.commands.read().len()
    }

    /// Assembles the help overview: commands grouped by owning plugin,
    /// both levels sorted for stable output.
    pub fn help_text(&self) -> String {
        let commands = self.commands.read();
        let mut by_plugin: HashMap<&str, Vec<(&str, &str)>> = HashMap::new();
        for (name, entry) in commands.iter() {
            by_plugin
                .entry(entry.plugin_id.as_str())
                .or_default()
                .push((name, entry.help.as_str()));
        }

        let mut plugins: Vec<_> = by_plugin.into_iter().collect();
        plugins.sort_by_key(|(plugin, _)| *plugin);

        let mut lines = vec!["Available commands:".to_string()];
        for (plugin, mut cmds) in plugins {
            cmds.sort_by_key(|(name, _)| *name);
            lines.push(format!("\n{plugin}:"));
            for (name, help) in cmds {
                lines.push(format!("  {name} - {help}"));
            }
        }
        lines.join("\n")
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("triggers", &self.triggers)
            .field("marker", &self.marker)
            .field("commands", &self.command_count())
            .finish()
    }
}
