//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use forum_core::entities::{Channel, ForumTag, Guild, Message};

use super::responses::{ChannelSummary, GuildSummary, MessageView, TagResponse};

// ============================================================================
// Guild Mappers
// ============================================================================

impl From<&Guild> for GuildSummary {
    fn from(guild: &Guild) -> Self {
        Self {
            id: guild.id.to_string(),
            name: guild.name.clone(),
            icon_url: guild.icon_url(),
            description: guild.description.clone(),
        }
    }
}

// ============================================================================
// Channel Mappers
// ============================================================================

impl From<&ForumTag> for TagResponse {
    fn from(tag: &ForumTag) -> Self {
        Self {
            id: tag.id.to_string(),
            name: tag.name.clone(),
            emoji: tag.emoji_name.clone(),
        }
    }
}

impl From<&Channel> for ChannelSummary {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.to_string(),
            name: channel.name.clone(),
            message_count: channel.message_count,
            last_active: channel.last_active(),
            pinned: channel.is_pinned(),
            archived: channel.archived,
            locked: channel.locked,
            tags: Vec::new(),
        }
    }
}

impl ChannelSummary {
    /// Summary of a forum post with its tags resolved against the forum
    pub fn post(post: &Channel, forum: &Channel) -> Self {
        Self {
            tags: post.resolve_tags(forum).iter().map(TagResponse::from).collect(),
            ..Self::from(post)
        }
    }
}

// ============================================================================
// Message Mappers
// ============================================================================

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            content: message.content.clone(),
            created_at: message.created_at(),
            edited_at: message.edited_at,
            pinned: message.pinned,
        }
    }
}
