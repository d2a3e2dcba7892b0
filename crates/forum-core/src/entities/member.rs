//! Member record - a user's display identity within a guild

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Resolved guild member display attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Global avatar hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Guild-specific avatar hash, preferred over the global one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_avatar: Option<String>,
}

impl MemberRecord {
    /// Create a record with only the username known
    pub fn new(guild_id: Snowflake, user_id: Snowflake, username: impl Into<String>) -> Self {
        Self {
            guild_id,
            user_id,
            username: username.into(),
            nickname: None,
            avatar: None,
            guild_avatar: None,
        }
    }

    /// Get display name (nickname if set, otherwise username)
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }

    /// Avatar hash to render, guild avatar first
    pub fn effective_avatar(&self) -> Option<&str> {
        self.guild_avatar.as_deref().or(self.avatar.as_deref())
    }
}
