//! In-process publish/subscribe for task lifecycle events.
//!
//! The [`EventBus`] dispatches [`Event`] envelopes to subscribers registered
//! per [`EventKind`], highest priority first. Subscriber failures are
//! contained: they are logged and forwarded to error handlers but never
//! reach the emitter.

mod bus;
mod envelope;
mod handler;

pub use bus::{EventBus, HISTORY_CAPACITY};
pub use envelope::{Event, EventKind, EventPayload};
pub use handler::{ErrorHandler, EventHandler, EventHandlerError, FnEventHandler};
