//! Main runtime orchestration.
//!
//! [`EmberRuntime`] owns the configuration, the shared [`RuntimeContext`],
//! and the plugin set, and drives the single dispatch loop:
//!
//! - **Load phase**: plugins load sequentially; any configuration error
//!   (duplicate service/command, malformed job spec) aborts startup.
//! - **`Startup`** is published exactly once, before the first message or
//!   timer dispatch.
//! - **Dispatch loop**: one `select!` over the inbound channel (fed by the
//!   transport collaborator), the internal timer, and the shutdown token.
//!   One event is dispatched at a time; a slow external call inside a
//!   handler is bounded by the configured timeout rather than parked on a
//!   separate task, which is a deliberate trade-off in favor of strict
//!   ordering.
//! - **`Shutdown`** is published exactly once after the loop exits, then
//!   plugins unload in reverse order.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ember_runtime::EmberRuntime;
//!
//! let runtime = EmberRuntime::new(); // auto-loads ember.toml
//! runtime.register_plugin(Arc::new(EchoPlugin));
//! runtime.spawn_signal_handler();
//! runtime.run(inbound_events).await?;
//! ```

use std::sync::{Arc, Weak};

use chrono::Local;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ember_core::{Event, EventKind};
use ember_framework::{CommandReply, Plugin, PluginManager, RuntimeContext};

use crate::config::{ConfigLoader, EmberConfig};
use crate::error::RuntimeResult;
use crate::logging;
use crate::pipeline::{self, PipelineSettings};

/// The Ember bot runtime.
pub struct EmberRuntime {
    config: EmberConfig,
    context: Arc<RuntimeContext>,
    plugins: PluginManager,
    shutdown: CancellationToken,
}

impl EmberRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Searches `ember.toml` in the current directory and the user config
    /// directory; falls back to defaults when nothing is found.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("Warning: failed to load config ({e}), using defaults");
            EmberConfig::default()
        });
        Self::from_config(&config)
    }

    /// Like [`new`](Self::new), but propagates configuration errors instead
    /// of falling back to defaults.
    pub fn try_new() -> RuntimeResult<Self> {
        let config = ConfigLoader::new().load()?;
        Ok(Self::from_config(&config))
    }

    /// Creates a runtime from a loaded configuration.
    ///
    /// Initializes logging (a no-op when already initialized) and builds
    /// the shared context with its built-in registrations.
    pub fn from_config(config: &EmberConfig) -> Self {
        logging::init_from_config(&config.logging);

        let context = Arc::new(RuntimeContext::new(config.runtime_settings()));
        install_builtins(&context);

        info!(
            triggers = ?config.bot.trigger_words,
            marker = %config.bot.command_marker,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            context,
            plugins: PluginManager::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &EmberConfig {
        &self.config
    }

    /// Returns a handle to the shared runtime context.
    pub fn context(&self) -> Arc<RuntimeContext> {
        Arc::clone(&self.context)
    }

    /// Registers a plugin. Load order is registration order.
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
        self.plugins.register(plugin);
    }

    /// Returns a token that stops the dispatch loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns a task that cancels the runtime on Ctrl+C or SIGTERM.
    pub fn spawn_signal_handler(&self) {
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            token.cancel();
        });
    }

    /// Runs the runtime until the inbound channel closes or the shutdown
    /// token is cancelled.
    ///
    /// `inbound` is fed by the transport collaborator with `Message` and
    /// `GroupUpdate` events; the lifecycle and timer events are owned by the
    /// runtime itself.
    pub async fn run(&self, mut inbound: mpsc::Receiver<Event>) -> RuntimeResult<()> {
        self.plugins
            .load_all(&self.context, &self.config.plugins)
            .await?;

        let settings = PipelineSettings {
            message_prefix: self.config.bot.message_prefix.clone(),
            ignore_older_than: std::time::Duration::from_secs(
                self.config.bot.ignore_messages_older_than_secs,
            ),
            call_timeout: self.config.timing.call_timeout(),
        };

        self.context.bus().publish(Event::Startup).await;
        info!("Listening for messages");

        // First tick is one full period out; the timer never races startup.
        let period = self.config.timing.timer_interval();
        let mut timer = time::interval_at(time::Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                maybe = inbound.recv() => match maybe {
                    Some(event) => self.dispatch(&settings, event).await,
                    None => {
                        info!("Inbound channel closed");
                        break;
                    }
                },
                _ = timer.tick() => {
                    self.context
                        .bus()
                        .publish(Event::Timer { now: Local::now() })
                        .await;
                }
            }
        }

        self.context.bus().publish(Event::Shutdown).await;
        self.plugins.unload_all(&self.context).await;
        info!("Runtime stopped");

        Ok(())
    }

    async fn dispatch(&self, settings: &PipelineSettings, event: Event) {
        match event {
            Event::Message(msg) => pipeline::handle_message(&self.context, settings, msg).await,
            Event::Startup | Event::Shutdown => {
                warn!("Lifecycle events are runtime-owned; dropping injected event");
            }
            other => self.context.bus().publish(other).await,
        }
    }
}

impl Default for EmberRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Registrations the runtime itself owns: timer-driven cron evaluation and
/// the `help` command.
///
/// Handlers hold a `Weak` back-reference so the context is not kept alive
/// by its own bus.
fn install_builtins(context: &Arc<RuntimeContext>) {
    let weak: Weak<RuntimeContext> = Arc::downgrade(context);
    context.bus().subscribe(
        "cron",
        EventKind::Timer,
        Arc::new(move |event| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(ctx) = weak.upgrade()
                    && let Event::Timer { now } = event.as_ref()
                {
                    ctx.cron().tick(*now).await;
                }
                Ok(())
            })
        }),
    );

    let weak: Weak<RuntimeContext> = Arc::downgrade(context);
    let registered = context.commands().register_command(
        "core",
        "help",
        "Lists all available commands.",
        Arc::new(move |_| {
            let weak = weak.clone();
            Box::pin(async move {
                let text = weak
                    .upgrade()
                    .map(|ctx| ctx.commands().help_text())
                    .unwrap_or_default();
                Ok(CommandReply::text(text))
            })
        }),
    );
    if let Err(e) = registered {
        // Unreachable on a fresh context; log rather than unwind.
        error!(error = %e, "Failed to register built-in command");
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down");
    }
}
