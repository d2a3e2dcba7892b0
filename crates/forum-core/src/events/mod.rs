//! Gateway events consumed by the cache

mod gateway_event;

pub use gateway_event::{GatewayEvent, MessageDeleteEvent};
