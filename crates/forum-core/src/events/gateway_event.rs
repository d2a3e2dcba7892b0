//! Gateway events - live notifications pushed by the platform
//!
//! The gateway client publishes these onto the process event bus; the cache
//! ingests the message events and ignores the rest.

use serde::{Deserialize, Serialize};

use crate::entities::{Channel, Message};
use crate::value_objects::Snowflake;

/// Events the viewer subscribes to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEvent {
    // =========================================================================
    // Message Events
    // =========================================================================
    MessageCreate(Message),
    MessageUpdate(Message),
    MessageDelete(MessageDeleteEvent),

    // =========================================================================
    // Channel Events
    // =========================================================================
    ChannelUpdate(Channel),
}

impl GatewayEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageCreate(_) => "MESSAGE_CREATE",
            Self::MessageUpdate(_) => "MESSAGE_UPDATE",
            Self::MessageDelete(_) => "MESSAGE_DELETE",
            Self::ChannelUpdate(_) => "CHANNEL_UPDATE",
        }
    }

    /// Channel the event applies to
    pub fn channel_id(&self) -> Snowflake {
        match self {
            Self::MessageCreate(m) | Self::MessageUpdate(m) => m.channel_id,
            Self::MessageDelete(e) => e.channel_id,
            Self::ChannelUpdate(c) => c.id,
        }
    }
}

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}
