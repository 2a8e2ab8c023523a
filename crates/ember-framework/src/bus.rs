//! Event bus: registration-order fan-out with failure isolation.
//!
//! The bus is a synchronous call-out layer, not a queue. [`EventBus::publish`]
//! delivers the event to every subscriber of that kind, sequentially, in
//! registration order, on the calling task, and completes before the runtime
//! moves to the next external input.
//!
//! A handler that returns an error is logged with the owning plugin's
//! identity and dispatch continues; one misbehaving plugin cannot halt the
//! bus.
//!
//! # Nested publish
//!
//! `publish` is not re-entrant in the naive sense: a handler that publishes
//! from within a dispatch would interleave side effects. Instead, nested
//! publishes are queued and drained after the current dispatch completes,
//! preserving overall FIFO order. The queue is only ever consulted on the
//! dispatching task; the runtime dispatches one event at a time.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error};

use ember_core::{Event, EventKind, HandlerResult};

/// Type of a subscribed event handler.
///
/// Handlers receive the event behind an `Arc` (events are immutable and
/// shared across the whole fan-out) and report failure through
/// [`HandlerResult`] rather than panicking.
pub type EventHandler = Arc<dyn Fn(Arc<Event>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

struct Subscription {
    plugin_id: String,
    handler: EventHandler,
}

/// Registration-order event fan-out for subscriber plugins.
///
/// The subscription table is populated during the load phase and append-only
/// afterwards; [`remove_plugin`](Self::remove_plugin) exists for
/// reload/teardown. Duplicate registration of the same handler produces
/// duplicate delivery; avoiding that is the caller's responsibility.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<EventKind, Vec<Subscription>>>,
    /// Events published from within a handler, drained after the current
    /// dispatch.
    pending: Mutex<VecDeque<Arc<Event>>>,
    dispatching: AtomicBool,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every event of `kind`, owned by `plugin_id`.
    pub fn subscribe(&self, plugin_id: impl Into<String>, kind: EventKind, handler: EventHandler) {
        let plugin_id = plugin_id.into();
        debug!(plugin = %plugin_id, kind = ?kind, "Subscription registered");
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push(Subscription { plugin_id, handler });
    }

    /// Drops every subscription owned by `plugin_id`.
    pub fn remove_plugin(&self, plugin_id: &str) {
        let mut subscribers = self.subscribers.write();
        for subs in subscribers.values_mut() {
            subs.retain(|s| s.plugin_id != plugin_id);
        }
    }

    /// Returns the number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Publishes `event` to all subscribers of its kind.
    ///
    /// Called from within a handler of an ongoing dispatch, the event is
    /// queued instead and delivered once the current dispatch completes.
    pub async fn publish(&self, event: Event) {
        let event = Arc::new(event);

        if self.dispatching.swap(true, Ordering::AcqRel) {
            debug!(kind = ?event.kind(), "Nested publish queued");
            self.pending.lock().push_back(event);
            return;
        }

        self.deliver(&event).await;
        // Drain anything handlers published while we were dispatching.
        loop {
            let next = self.pending.lock().pop_front();
            match next {
                Some(queued) => self.deliver(&queued).await,
                None => break,
            }
        }
        self.dispatching.store(false, Ordering::Release);
    }

    async fn deliver(&self, event: &Arc<Event>) {
        let kind = event.kind();
        // Snapshot the handler list so delivery never holds the lock across
        // an await point.
        let handlers: Vec<(String, EventHandler)> = self
            .subscribers
            .read()
            .get(&kind)
            .map(|subs| {
                subs.iter()
                    .map(|s| (s.plugin_id.clone(), Arc::clone(&s.handler)))
                    .collect()
            })
            .unwrap_or_default();

        debug!(kind = ?kind, subscribers = handlers.len(), "Dispatching event");

        for (plugin_id, handler) in handlers {
            if let Err(e) = handler(Arc::clone(event)).await {
                error!(
                    plugin = %plugin_id,
                    kind = ?kind,
                    error = %e,
                    "Event handler failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.read();
        f.debug_struct("EventBus")
            .field("kinds", &subscribers.len())
            .field(
                "subscriptions",
                &subscribers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(counter: Arc<AtomicUsize>, add: usize) -> EventHandler {
        Arc::new(move |_| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(add, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    fn failing_handler() -> EventHandler {
        Arc::new(|_| Box::pin(async { Err("boom".into()) }))
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers_of_kind() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe("a", EventKind::Startup, counting_handler(Arc::clone(&counter), 1));
        bus.subscribe("b", EventKind::Startup, counting_handler(Arc::clone(&counter), 10));
        bus.subscribe("c", EventKind::Timer, counting_handler(Arc::clone(&counter), 100));

        bus.publish(Event::Startup).await;
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn delivery_follows_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(
                name,
                EventKind::Startup,
                Arc::new(move |_| {
                    let order = Arc::clone(&order);
                    Box::pin(async move {
                        order.lock().push(name);
                        Ok(())
                    })
                }),
            );
        }

        bus.publish(Event::Startup).await;
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe("bad", EventKind::Startup, failing_handler());
        bus.subscribe("good", EventKind::Startup, counting_handler(Arc::clone(&counter), 1));

        bus.publish(Event::Startup).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_means_duplicate_delivery() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(Arc::clone(&counter), 1);
        bus.subscribe("a", EventKind::Startup, Arc::clone(&handler));
        bus.subscribe("a", EventKind::Startup, handler);

        bus.publish(Event::Startup).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remove_plugin_drops_only_its_subscriptions() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe("gone", EventKind::Startup, counting_handler(Arc::clone(&counter), 1));
        bus.subscribe("kept", EventKind::Startup, counting_handler(Arc::clone(&counter), 10));
        bus.subscribe("gone", EventKind::Timer, counting_handler(Arc::clone(&counter), 100));

        bus.remove_plugin("gone");
        assert_eq!(bus.subscriber_count(EventKind::Startup), 1);
        assert_eq!(bus.subscriber_count(EventKind::Timer), 0);

        bus.publish(Event::Startup).await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn nested_publish_is_queued_and_drained_in_fifo_order() {
        let bus = Arc::new(EventBus::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        // Startup handler publishes a Timer event mid-dispatch; the second
        // Startup subscriber must still run before the Timer subscriber.
        {
            let nested_bus = Arc::clone(&bus);
            let order = Arc::clone(&order);
            bus.subscribe(
                "nester",
                EventKind::Startup,
                Arc::new(move |_| {
                    let bus = Arc::clone(&nested_bus);
                    let order = Arc::clone(&order);
                    Box::pin(async move {
                        order.lock().push("startup-a");
                        bus.publish(Event::Timer {
                            now: chrono::Local::now(),
                        })
                        .await;
                        Ok(())
                    })
                }),
            );
        }
        {
            let order = Arc::clone(&order);
            bus.subscribe(
                "second",
                EventKind::Startup,
                Arc::new(move |_| {
                    let order = Arc::clone(&order);
                    Box::pin(async move {
                        order.lock().push("startup-b");
                        Ok(())
                    })
                }),
            );
        }
        {
            let order = Arc::clone(&order);
            bus.subscribe(
                "timer",
                EventKind::Timer,
                Arc::new(move |_| {
                    let order = Arc::clone(&order);
                    Box::pin(async move {
                        order.lock().push("timer");
                        Ok(())
                    })
                }),
            );
        }

        bus.publish(Event::Startup).await;
        assert_eq!(*order.lock(), vec!["startup-a", "startup-b", "timer"]);
    }
}
