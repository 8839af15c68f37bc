//! Priority-ordered event dispatcher with bounded history.

use super::{
    envelope::{Event, EventKind, EventPayload},
    handler::{ErrorHandler, EventHandler, EventHandlerError},
};
use futures::FutureExt;
use mockable::{Clock, DefaultClock};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, error};
use uuid::Uuid;

/// Number of envelopes retained by the bus history.
pub const HISTORY_CAPACITY: usize = 1000;

#[derive(Clone)]
struct Subscription {
    handler: Arc<dyn EventHandler>,
    priority: i32,
}

#[derive(Default)]
struct Registry {
    subscribers: HashMap<EventKind, Vec<Subscription>>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
}

/// In-process publish/subscribe dispatcher.
///
/// Subscribers of one kind run sequentially in descending priority; equal
/// priorities keep registration order. The bus never reorders envelopes.
pub struct EventBus {
    registry: RwLock<Registry>,
    history: Mutex<VecDeque<Event>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count(None))
            .field("history", &self.history_len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates a bus stamping envelopes with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus stamping envelopes with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
            clock,
        }
    }

    /// Registers `handler` for `kind`.
    ///
    /// The handler is placed after every existing subscriber whose priority
    /// is greater than or equal to `priority`.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>, priority: i32) {
        let name = handler.name().to_owned();
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let handlers = registry.subscribers.entry(kind).or_default();
        let position = handlers
            .iter()
            .position(|existing| priority > existing.priority)
            .unwrap_or(handlers.len());
        handlers.insert(position, Subscription { handler, priority });
        debug!(handler = %name, kind = %kind, priority, "subscribed event handler");
    }

    /// Removes every registration of `handler` for `kind`.
    ///
    /// Handlers are compared by identity. Returns `true` when at least one
    /// registration was removed.
    pub fn unsubscribe(&self, kind: EventKind, handler: &Arc<dyn EventHandler>) -> bool {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let Some(handlers) = registry.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|existing| !Arc::ptr_eq(&existing.handler, handler));
        before != handlers.len()
    }

    /// Registers a handler notified of subscriber failures.
    pub fn add_error_handler(&self, handler: Arc<dyn ErrorHandler>) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .error_handlers
            .push(handler);
    }

    /// Publishes an event and awaits every subscriber in order.
    ///
    /// The envelope is recorded in the history before dispatch. Subscriber
    /// errors and panics are logged and forwarded to the error handlers.
    pub async fn emit(
        &self,
        kind: EventKind,
        payload: impl Into<EventPayload>,
        metadata: Option<Map<String, Value>>,
        correlation_id: Option<Uuid>,
    ) {
        let event = Event::new(
            kind,
            self.clock.utc(),
            payload.into(),
            metadata,
            correlation_id,
        );
        self.record(event.clone());

        let (handlers, error_handlers) = {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            let handlers = registry.subscribers.get(&kind).cloned().unwrap_or_default();
            (handlers, registry.error_handlers.clone())
        };
        debug!(kind = %kind, handlers = handlers.len(), "emitting event");

        for subscription in handlers {
            let handler = subscription.handler;
            let Err(err) = invoke(handler.as_ref(), &event).await else {
                continue;
            };
            error!(handler = handler.name(), kind = %kind, error = %err, "event handler failed");
            for error_handler in &error_handlers {
                let outcome = AssertUnwindSafe(error_handler.handle_error(
                    &event,
                    handler.name(),
                    &err,
                ))
                .catch_unwind()
                .await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(nested)) => error!(error = %nested, "error handler failed"),
                    Err(panic) => error!(
                        error = %panic_message(panic.as_ref()),
                        "error handler panicked"
                    ),
                }
            }
        }
    }

    /// Returns up to `limit` of the most recent envelopes, oldest first,
    /// optionally restricted to one kind.
    #[must_use]
    pub fn get_history(&self, kind: Option<EventKind>, limit: usize) -> Vec<Event> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<Event> = history
            .iter()
            .rev()
            .filter(|event| kind.is_none_or(|wanted| event.kind() == wanted))
            .take(limit)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    /// Counts subscribers for one kind, or across all kinds.
    #[must_use]
    pub fn subscriber_count(&self, kind: Option<EventKind>) -> usize {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        kind.map_or_else(
            || registry.subscribers.values().map(Vec::len).sum(),
            |wanted| registry.subscribers.get(&wanted).map_or(0, Vec::len),
        )
    }

    /// Removes all subscribers, error handlers and history.
    pub fn clear(&self) {
        *self.registry.write().unwrap_or_else(PoisonError::into_inner) = Registry::default();
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, event: Event) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(event);
    }

    fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

async fn invoke(handler: &dyn EventHandler, event: &Event) -> Result<(), EventHandlerError> {
    match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(EventHandlerError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
