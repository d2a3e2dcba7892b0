//! # forum-core
//!
//! Domain layer containing entities, value objects, upstream ports, and gateway events.
//! This crate has zero dependencies on infrastructure (runtime, caches, HTTP clients).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Author, Channel, ChannelKind, ForumTag, Guild, MemberRecord, Message};
pub use error::DomainError;
pub use events::{GatewayEvent, MessageDeleteEvent};
pub use traits::{
    ChannelDirectory, HistoryAnchor, HistoryClient, HistoryQuery, MemberClient, UpstreamResult,
};
pub use value_objects::{ChannelFlags, Snowflake, SnowflakeParseError};
