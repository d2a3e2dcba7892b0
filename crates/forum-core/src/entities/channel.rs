//! Channel entity - forums, their threads, and plain text channels

use serde::{Deserialize, Serialize};

use crate::value_objects::{ChannelFlags, Snowflake};

/// Channel type enum (platform numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "i16", into = "i16")]
pub enum ChannelKind {
    /// Guild text channel
    #[default]
    GuildText,
    /// Public thread (a forum post)
    PublicThread,
    /// Private thread
    PrivateThread,
    /// Forum channel holding posts as threads
    GuildForum,
    /// Anything the viewer does not render
    Other(i16),
}

impl From<i16> for ChannelKind {
    fn from(value: i16) -> Self {
        match value {
            0 => Self::GuildText,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            15 => Self::GuildForum,
            other => Self::Other(other),
        }
    }
}

impl From<ChannelKind> for i16 {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::GuildText => 0,
            ChannelKind::PublicThread => 11,
            ChannelKind::PrivateThread => 12,
            ChannelKind::GuildForum => 15,
            ChannelKind::Other(other) => other,
        }
    }
}

/// Tag available on a forum channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumTag {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji_name: Option<String>,
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default)]
    pub flags: ChannelFlags,
    #[serde(default)]
    pub nsfw: bool,
    /// Thread archived by the platform (no new messages accepted)
    #[serde(default)]
    pub archived: bool,
    /// Thread locked by moderators
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<Snowflake>,
    #[serde(default)]
    pub applied_tags: Vec<Snowflake>,
    #[serde(default)]
    pub available_tags: Vec<ForumTag>,
}

impl Channel {
    /// Create a bare channel of the given kind
    #[must_use]
    pub fn new(id: Snowflake, guild_id: Snowflake, kind: ChannelKind, name: String) -> Self {
        Self {
            id,
            guild_id: Some(guild_id),
            parent_id: None,
            name,
            kind,
            flags: ChannelFlags::empty(),
            nsfw: false,
            archived: false,
            locked: false,
            message_count: 0,
            last_message_id: None,
            applied_tags: Vec::new(),
            available_tags: Vec::new(),
        }
    }

    /// Create a public thread (forum post) under `forum_id`
    #[must_use]
    pub fn new_post(id: Snowflake, guild_id: Snowflake, forum_id: Snowflake, name: String) -> Self {
        let mut post = Self::new(id, guild_id, ChannelKind::PublicThread, name);
        post.parent_id = Some(forum_id);
        post
    }

    #[inline]
    #[must_use]
    pub fn is_forum(&self) -> bool {
        matches!(self.kind, ChannelKind::GuildForum)
    }

    #[inline]
    #[must_use]
    pub fn is_public_thread(&self) -> bool {
        matches!(self.kind, ChannelKind::PublicThread)
    }

    #[inline]
    #[must_use]
    pub fn is_thread(&self) -> bool {
        matches!(self.kind, ChannelKind::PublicThread | ChannelKind::PrivateThread)
    }

    #[inline]
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.flags.is_pinned()
    }

    /// Check whether the channel will never receive new messages
    ///
    /// Only threads can be archived or locked; a plain channel keeps going.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        self.is_thread() && (self.archived || self.locked)
    }

    /// Timestamp of the last message, if the channel has one
    #[must_use]
    pub fn last_active(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.last_message_id
            .filter(|id| !id.is_zero())
            .map(|id| id.created_at())
    }

    /// Resolve applied tag IDs against a forum's available tags
    #[must_use]
    pub fn resolve_tags(&self, forum: &Channel) -> Vec<ForumTag> {
        self.applied_tags
            .iter()
            .filter_map(|id| forum.available_tags.iter().find(|tag| tag.id == *id))
            .cloned()
            .collect()
    }
}
