//! Plugin lifecycle management.
//!
//! [`PluginManager`] owns the registered plugins and drives the load phase:
//!
//! - Plugins load **sequentially in registration order**; a plugin may
//!   therefore resolve services registered by earlier plugins during its own
//!   `on_load`, and anything registered by a later plugin at call time.
//! - Any `on_load` error (including duplicate service/command names and
//!   malformed job specs) aborts the whole load as a [`LoadError`].
//!   Startup never proceeds with a half-registered plugin set.
//! - After every plugin has loaded, each declared `consumes` entry is
//!   checked against the registry. A miss is a warning, not a failure:
//!   resolution happens at call time and consumers are expected to degrade.
//! - Unload runs in reverse registration order and drops each plugin's
//!   subscriptions from the bus.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::context::RuntimeContext;
use crate::error::LoadError;
use crate::plugin::{LoadContext, Plugin};

/// Registry and lifecycle driver for all plugins.
#[derive(Default)]
pub struct PluginManager {
    plugins: Mutex<Vec<Arc<dyn Plugin>>>,
}

impl PluginManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin. Load order is registration order.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        info!(plugin = %plugin.name(), "Plugin registered");
        self.plugins.lock().push(plugin);
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.lock().len()
    }

    /// Loads every registered plugin in order.
    ///
    /// `configs` maps plugin names to their raw config sections; absent
    /// sections load as an empty object.
    ///
    /// # Errors
    ///
    /// The first failing `on_load` aborts the phase with a [`LoadError`]
    /// naming the plugin. Already-loaded plugins are left registered; the
    /// caller decides whether to tear down.
    pub async fn load_all(
        &self,
        context: &Arc<RuntimeContext>,
        configs: &HashMap<String, Value>,
    ) -> Result<(), LoadError> {
        let plugins: Vec<Arc<dyn Plugin>> = self.plugins.lock().clone();

        for plugin in &plugins {
            let name = plugin.name();
            let config = configs
                .get(name)
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            let load_ctx = LoadContext::new(name.to_string(), Arc::clone(context), config);

            plugin
                .on_load(&load_ctx)
                .await
                .map_err(|e| LoadError::new(name, e))?;
            info!(plugin = %name, "Plugin loaded");
        }

        // Everything is registered; now check declared consumption. Misses
        // degrade at call time, so this is advisory.
        for plugin in &plugins {
            for service in plugin.consumes() {
                if !context.services().contains(service) {
                    warn!(
                        plugin = %plugin.name(),
                        service = %service,
                        "Declared service has no provider; calls will degrade"
                    );
                }
            }
        }

        Ok(())
    }

    /// Unloads every plugin in reverse registration order, dropping their
    /// bus subscriptions.
    pub async fn unload_all(&self, context: &Arc<RuntimeContext>) {
        let plugins: Vec<Arc<dyn Plugin>> = self.plugins.lock().clone();

        for plugin in plugins.iter().rev() {
            plugin.on_unload().await;
            context.bus().remove_plugin(plugin.name());
            info!(plugin = %plugin.name(), "Plugin unloaded");
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.plugin_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandReply;
    use crate::context::RuntimeSettings;
    use async_trait::async_trait;
    use ember_core::{EventKind, HandlerError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_context() -> Arc<RuntimeContext> {
        Arc::new(RuntimeContext::new(RuntimeSettings::default()))
    }

    struct RecordingPlugin {
        name: &'static str,
        load_order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Plugin for RecordingPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn on_load(&self, _ctx: &LoadContext) -> Result<(), HandlerError> {
            self.load_order.lock().push(self.name);
            Ok(())
        }

        async fn on_unload(&self) {
            self.load_order.lock().push("unload");
        }
    }

    #[tokio::test]
    async fn plugins_load_in_registration_order() {
        let manager = PluginManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            manager.register(Arc::new(RecordingPlugin {
                name,
                load_order: Arc::clone(&order),
            }));
        }

        manager
            .load_all(&test_context(), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    struct ServicePlugin;

    #[async_trait]
    impl Plugin for ServicePlugin {
        fn name(&self) -> &'static str {
            "provider"
        }

        fn provides(&self) -> &'static [&'static str] {
            &["number"]
        }

        async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError> {
            ctx.register_service("number", 42u32)?;
            Ok(())
        }
    }

    struct ConflictingPlugin;

    #[async_trait]
    impl Plugin for ConflictingPlugin {
        fn name(&self) -> &'static str {
            "conflicting"
        }

        async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError> {
            ctx.register_service("number", 7u32)?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_service_across_plugins_aborts_load() {
        let manager = PluginManager::new();
        manager.register(Arc::new(ServicePlugin));
        manager.register(Arc::new(ConflictingPlugin));

        let ctx = test_context();
        let err = manager.load_all(&ctx, &HashMap::new()).await.unwrap_err();
        assert_eq!(err.plugin, "conflicting");
        // The first registration is intact.
        assert_eq!(*ctx.services().resolve::<u32>("number").unwrap(), 42);
    }

    struct ConfiguredPlugin {
        seen: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl Plugin for ConfiguredPlugin {
        fn name(&self) -> &'static str {
            "configured"
        }

        async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError> {
            #[derive(serde::Deserialize)]
            struct Config {
                #[serde(default)]
                greeting: String,
            }
            let config: Config = ctx.config()?;
            *self.seen.lock() = Some(config.greeting);
            Ok(())
        }
    }

    #[tokio::test]
    async fn plugin_receives_its_config_section() {
        let manager = PluginManager::new();
        let seen = Arc::new(Mutex::new(None));
        manager.register(Arc::new(ConfiguredPlugin {
            seen: Arc::clone(&seen),
        }));

        let mut configs = HashMap::new();
        configs.insert(
            "configured".to_string(),
            serde_json::json!({ "greeting": "hello" }),
        );
        manager
            .load_all(&test_context(), &configs)
            .await
            .unwrap();
        assert_eq!(seen.lock().as_deref(), Some("hello"));
    }

    struct SubscribingPlugin;

    #[async_trait]
    impl Plugin for SubscribingPlugin {
        fn name(&self) -> &'static str {
            "subscriber"
        }

        async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError> {
            ctx.subscribe(EventKind::Startup, Arc::new(|_| Box::pin(async { Ok(()) })));
            ctx.register_command("noop", "Does nothing", Arc::new(|_| {
                Box::pin(async { Ok(CommandReply::text("")) })
            }))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn unload_drops_subscriptions() {
        let manager = PluginManager::new();
        manager.register(Arc::new(SubscribingPlugin));

        let ctx = test_context();
        manager.load_all(&ctx, &HashMap::new()).await.unwrap();
        assert_eq!(ctx.bus().subscriber_count(EventKind::Startup), 1);

        manager.unload_all(&ctx).await;
        assert_eq!(ctx.bus().subscriber_count(EventKind::Startup), 0);
    }

    struct CountingUnload {
        counter: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for CountingUnload {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn on_load(&self, _ctx: &LoadContext) -> Result<(), HandlerError> {
            Ok(())
        }

        async fn on_unload(&self) {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn unload_reaches_every_plugin() {
        let manager = PluginManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        manager.register(Arc::new(CountingUnload {
            counter: Arc::clone(&counter),
        }));
        manager.register(Arc::new(CountingUnload {
            counter: Arc::clone(&counter),
        }));

        let ctx = test_context();
        manager.load_all(&ctx, &HashMap::new()).await.unwrap();
        manager.unload_all(&ctx).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
