//! In-process gateway event bus.
//!
//! The gateway client publishes platform events; cache components register
//! handlers that run on their own listener task.

mod event_bus;

pub use event_bus::{EventBus, EventHandler, Subscription};
