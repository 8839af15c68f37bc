//! Subscriber contracts for the event bus.

use super::envelope::Event;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Failure reported by (or caught around) a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventHandlerError {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(String),
    /// The handler panicked while processing the event.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl EventHandlerError {
    /// Builds a [`EventHandlerError::Failed`] from any displayable value.
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }
}

/// Subscriber invoked for each emitted event of the kind it registered for.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in log lines and error reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Processes one event.
    ///
    /// # Errors
    ///
    /// Returns [`EventHandlerError`] when processing fails; the bus logs the
    /// failure and continues with the next subscriber.
    async fn handle(&self, event: &Event) -> Result<(), EventHandlerError>;
}

/// Receives failures raised by subscribers.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    /// Handles a subscriber failure.
    ///
    /// # Errors
    ///
    /// Errors are logged by the bus and otherwise ignored.
    async fn handle_error(
        &self,
        event: &Event,
        handler: &str,
        error: &EventHandlerError,
    ) -> Result<(), EventHandlerError>;
}

/// Adapts a synchronous closure into an [`EventHandler`].
pub struct FnEventHandler<F> {
    name: String,
    callback: F,
}

impl<F> FnEventHandler<F>
where
    F: Fn(&Event) -> Result<(), EventHandlerError> + Send + Sync,
{
    /// Wraps `callback` under the given handler name.
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> fmt::Debug for FnEventHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEventHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&Event) -> Result<(), EventHandlerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> Result<(), EventHandlerError> {
        (self.callback)(event)
    }
}
