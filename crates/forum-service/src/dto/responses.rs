//! Response DTOs for page views
//!
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use forum_cache::AuthorDisplay;
use serde::Serialize;

// ============================================================================
// Common Types
// ============================================================================

/// Guild header shown on every page
#[derive(Debug, Clone, Serialize)]
pub struct GuildSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Tag applied to a forum post
#[derive(Debug, Clone, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// Forum channel or post header
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub message_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub archived: bool,
    pub locked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagResponse>,
}

// ============================================================================
// Thread Responses
// ============================================================================

/// A single rendered message
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    pub pinned: bool,
}

/// Consecutive messages by the same author
#[derive(Debug, Clone, Serialize)]
pub struct AuthorGroup {
    pub author: AuthorDisplay,
    pub messages: Vec<MessageView>,
}

/// One page of a forum post
#[derive(Debug, Clone, Serialize)]
pub struct ThreadPage {
    pub guild: GuildSummary,
    pub post: ChannelSummary,
    pub groups: Vec<AuthorGroup>,
    /// Cursor for the older page (`?before=`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Cursor for the newer page (`?after=`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// False when member lookup failed and authors show fallback identities
    pub members_resolved: bool,
}

impl ThreadPage {
    /// Total messages across all groups
    pub fn message_count(&self) -> usize {
        self.groups.iter().map(|g| g.messages.len()).sum()
    }
}

// ============================================================================
// Forum Responses
// ============================================================================

/// A forum channel on the guild overview
#[derive(Debug, Clone, Serialize)]
pub struct ForumSummary {
    pub forum: ChannelSummary,
    pub posts: Vec<ChannelSummary>,
    pub message_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

/// Guild overview listing its forums
#[derive(Debug, Clone, Serialize)]
pub struct ForumOverview {
    pub guild: GuildSummary,
    pub forums: Vec<ForumSummary>,
}

/// One page of a forum's posts
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub guild: GuildSummary,
    pub forum: ChannelSummary,
    pub posts: Vec<ChannelSummary>,
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
}
