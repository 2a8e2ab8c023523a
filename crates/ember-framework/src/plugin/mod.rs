//! Plugin contract and load-time registration surface.
//!
//! A plugin is a [`Plugin`] implementation that declares the services it
//! [`provides`](Plugin::provides) and [`consumes`](Plugin::consumes), and
//! performs all of its registration (subscriptions, services, commands,
//! cron jobs) inside [`on_load`](Plugin::on_load) through the
//! [`LoadContext`] it is handed:
//!
//! ```rust,ignore
//! struct EchoPlugin;
//!
//! #[async_trait]
//! impl Plugin for EchoPlugin {
//!     fn name(&self) -> &'static str {
//!         "echo"
//!     }
//!
//!     async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError> {
//!         let runtime = ctx.runtime_handle();
//!         ctx.subscribe(EventKind::PlainMessage, Arc::new(move |event| { /* … */ }));
//!         ctx.register_command("ping", "Responds with Pong!", Arc::new(|_| {
//!             Box::pin(async { Ok(CommandReply::text("Pong!")) })
//!         }))?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Registration through `LoadContext` stamps everything with the plugin's
//! name, so failure logs and duplicate-name errors always carry the right
//! identity.

mod manager;

pub use manager::PluginManager;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use ember_core::{ConfigError, EventKind, HandlerError};

use crate::bus::EventHandler;
use crate::command::CommandHandler;
use crate::context::RuntimeContext;
use crate::cron::{JobCallback, JobSpec};

/// An independently loaded unit of bot behavior.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin name, used as the config section key and in logs.
    fn name(&self) -> &'static str;

    /// Service names this plugin registers during load.
    fn provides(&self) -> &'static [&'static str] {
        &[]
    }

    /// Service names this plugin resolves at call time. Checked after the
    /// load phase; a missing provider is logged, not fatal, and the plugin is
    /// expected to degrade.
    fn consumes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Called once during the load phase, in plugin registration order.
    ///
    /// All registration happens here. Returning an error aborts startup.
    async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError>;

    /// Called once during shutdown, in reverse registration order.
    async fn on_unload(&self) {}
}

/// Registration surface handed to a plugin's `on_load`.
pub struct LoadContext {
    plugin_id: String,
    context: Arc<RuntimeContext>,
    config: Value,
}

impl LoadContext {
    pub(crate) fn new(plugin_id: String, context: Arc<RuntimeContext>, config: Value) -> Self {
        Self {
            plugin_id,
            context,
            config,
        }
    }

    /// Name of the plugin being loaded.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Borrow of the shared runtime context.
    pub fn runtime(&self) -> &RuntimeContext {
        &self.context
    }

    /// Owned handle to the runtime context, for handlers that outlive the
    /// load phase.
    pub fn runtime_handle(&self) -> Arc<RuntimeContext> {
        Arc::clone(&self.context)
    }

    /// Deserializes this plugin's config section into `T`.
    ///
    /// The section is an empty JSON object when absent; use
    /// `#[serde(default)]` to make fields optional.
    pub fn config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.config)
    }

    /// Subscribes `handler` to every event of `kind`, owned by this plugin.
    pub fn subscribe(&self, kind: EventKind, handler: EventHandler) {
        self.context.bus().subscribe(&self.plugin_id, kind, handler);
    }

    /// Registers a service under `name`, provided by this plugin.
    pub fn register_service<S>(&self, name: &str, service: S) -> Result<(), ConfigError>
    where
        S: Send + Sync + 'static,
    {
        self.context
            .services()
            .register(name, &self.plugin_id, service)
    }

    /// Registers a command handler under `name`, owned by this plugin.
    pub fn register_command(
        &self,
        name: &str,
        help: &str,
        handler: CommandHandler,
    ) -> Result<(), ConfigError> {
        self.context
            .commands()
            .register_command(&self.plugin_id, name, help, handler)
    }

    /// Registers a cron job named after this plugin and `name`.
    pub fn register_job(
        &self,
        name: &str,
        spec: JobSpec,
        callback: JobCallback,
    ) -> Result<(), ConfigError> {
        self.context
            .cron()
            .register_job(format!("{}/{name}", self.plugin_id), spec, callback)
    }
}
