//! Lifecycle plugins subscribed through the task service.

use crate::events::{EventHandler, EventKind};
use std::fmt;
use std::sync::Arc;

/// Optional callback for one lifecycle event kind.
#[derive(Clone, Default)]
pub enum LifecycleHook {
    /// No callback.
    #[default]
    NoOp,
    /// Callback subscribed to the event kind.
    Present(Arc<dyn EventHandler>),
}

impl LifecycleHook {
    /// Wraps a handler.
    #[must_use]
    pub const fn present(handler: Arc<dyn EventHandler>) -> Self {
        Self::Present(handler)
    }

    /// Returns the handler when present.
    #[must_use]
    pub const fn handler(&self) -> Option<&Arc<dyn EventHandler>> {
        match self {
            Self::NoOp => None,
            Self::Present(handler) => Some(handler),
        }
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => f.write_str("NoOp"),
            Self::Present(handler) => f.debug_tuple("Present").field(&handler.name()).finish(),
        }
    }
}

/// Plugin with independent hooks for the three lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct TaskPlugin {
    name: String,
    on_created: LifecycleHook,
    on_updated: LifecycleHook,
    on_status_changed: LifecycleHook,
}

impl TaskPlugin {
    /// Creates a plugin with every hook set to [`LifecycleHook::NoOp`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the `task.created` hook.
    #[must_use]
    pub fn on_created(mut self, hook: LifecycleHook) -> Self {
        self.on_created = hook;
        self
    }

    /// Sets the `task.updated` hook.
    #[must_use]
    pub fn on_updated(mut self, hook: LifecycleHook) -> Self {
        self.on_updated = hook;
        self
    }

    /// Sets the `task.status_changed` hook.
    #[must_use]
    pub fn on_status_changed(mut self, hook: LifecycleHook) -> Self {
        self.on_status_changed = hook;
        self
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns each present hook with the event kind it subscribes to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<(EventKind, Arc<dyn EventHandler>)> {
        [
            (EventKind::TaskCreated, &self.on_created),
            (EventKind::TaskUpdated, &self.on_updated),
            (EventKind::TaskStatusChanged, &self.on_status_changed),
        ]
        .into_iter()
        .filter_map(|(kind, hook)| hook.handler().map(|handler| (kind, Arc::clone(handler))))
        .collect()
    }
}
