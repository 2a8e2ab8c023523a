//! Service registry: name → capability lookup between plugins.
//!
//! Plugins expose capabilities under string names and consume each other's
//! capabilities by resolving those names at call time, so no plugin links
//! against another. The registry stores values type-erased as
//! `Arc<dyn Any + Send + Sync>`; [`ServiceRegistry::resolve`] downcasts back
//! to the registered type.
//!
//! Trait-object capabilities are registered as the `Arc<dyn Trait>` itself:
//!
//! ```rust,ignore
//! let ai: Arc<dyn AiCapability> = Arc::new(MyProvider::new(key));
//! registry.register(AI_SERVICE, "gemini", ai)?;
//! // later, from any plugin:
//! let ai = registry.resolve::<Arc<dyn AiCapability>>(AI_SERVICE);
//! ```
//!
//! A name is registered exactly once per process; a second registration is a
//! configuration error, never a silent overwrite. Resolution before any
//! registration returns `None`; absence is a degrade-gracefully signal, not
//! a failure.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use ember_core::ConfigError;

struct ServiceEntry {
    provider: String,
    service: Arc<dyn Any + Send + Sync>,
}

/// Name-keyed capability registry shared by all plugins.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, ServiceEntry>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under `name`, owned by `provider` for log
    /// attribution.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateService`] if `name` is already taken. The
    /// existing registration is left untouched.
    pub fn register<S>(
        &self,
        name: impl Into<String>,
        provider: impl Into<String>,
        service: S,
    ) -> Result<(), ConfigError>
    where
        S: Send + Sync + 'static,
    {
        let name = name.into();
        let provider = provider.into();
        let mut services = self.services.write();
        if let Some(existing) = services.get(&name) {
            return Err(ConfigError::DuplicateService {
                name,
                existing: existing.provider.clone(),
            });
        }
        debug!(service = %name, provider = %provider, "Service registered");
        services.insert(
            name,
            ServiceEntry {
                provider,
                service: Arc::new(service),
            },
        );
        Ok(())
    }

    /// Resolves `name` to the value registered under it, if the types match.
    ///
    /// Returns `None` both when nothing is registered under `name` and when
    /// the registered value is not a `T`; callers treat either as the
    /// capability being absent.
    pub fn resolve<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let services = self.services.read();
        let entry = services.get(name)?;
        Arc::clone(&entry.service).downcast::<T>().ok()
    }

    /// Returns `true` if any value is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.services.read().contains_key(name)
    }

    /// Returns the plugin that provides `name`, if any.
    pub fn provider_of(&self, name: &str) -> Option<String> {
        self.services.read().get(name).map(|e| e.provider.clone())
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    /// Returns `true` when no services are registered.
    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_before_registration_is_absent() {
        let registry = ServiceRegistry::new();
        assert!(registry.resolve::<String>("missing").is_none());
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn register_then_resolve_round_trips() {
        let registry = ServiceRegistry::new();
        registry
            .register("greeting", "greeter", String::from("hello"))
            .unwrap();
        let resolved = registry.resolve::<String>("greeting").unwrap();
        assert_eq!(*resolved, "hello");
        assert_eq!(registry.provider_of("greeting").as_deref(), Some("greeter"));
    }

    #[test]
    fn duplicate_name_is_a_configuration_error() {
        let registry = ServiceRegistry::new();
        registry.register("x", "first", 1u32).unwrap();
        let err = registry.register("x", "second", 2u32).unwrap_err();
        match err {
            ConfigError::DuplicateService { name, existing } => {
                assert_eq!(name, "x");
                assert_eq!(existing, "first");
            }
            other => panic!("unexpected error: {other}"),
        }
        // First registration survives.
        assert_eq!(*registry.resolve::<u32>("x").unwrap(), 1);
    }

    #[test]
    fn resolve_with_wrong_type_is_absent() {
        let registry = ServiceRegistry::new();
        registry.register("n", "p", 7u32).unwrap();
        assert!(registry.resolve::<String>("n").is_none());
        assert!(registry.resolve::<u32>("n").is_some());
    }

    #[test]
    fn trait_objects_resolve_through_their_arc() {
        trait Greeter: Send + Sync {
            fn greet(&self) -> &'static str;
        }
        struct English;
        impl Greeter for English {
            fn greet(&self) -> &'static str {
                "hello"
            }
        }

        let registry = ServiceRegistry::new();
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        registry.register("greeter", "p", greeter).unwrap();

        let resolved = registry.resolve::<Arc<dyn Greeter>>("greeter").unwrap();
        assert_eq!(resolved.greet(), "hello");
    }
}
