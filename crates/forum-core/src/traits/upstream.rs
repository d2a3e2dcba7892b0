//! Upstream traits (ports) - the platform's REST API as the cache needs it
//!
//! The domain layer defines what it needs; the gateway/REST client provides
//! the implementation. Rate limiting and retries are the client's business.

use async_trait::async_trait;

use crate::entities::{Channel, Guild, MemberRecord, Message};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for upstream operations
pub type UpstreamResult<T> = Result<T, DomainError>;

// ============================================================================
// History
// ============================================================================

/// Where a history page starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAnchor {
    /// The newest messages in the channel
    Latest,
    /// Messages strictly older than the ID
    Before(Snowflake),
    /// Messages strictly newer than the ID (`After(MIN)` is the oldest page)
    After(Snowflake),
}

/// A single history request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub anchor: HistoryAnchor,
    pub limit: usize,
}

impl HistoryQuery {
    pub fn latest(limit: usize) -> Self {
        Self {
            anchor: HistoryAnchor::Latest,
            limit,
        }
    }

    pub fn before(id: Snowflake, limit: usize) -> Self {
        Self {
            anchor: HistoryAnchor::Before(id),
            limit,
        }
    }

    pub fn after(id: Snowflake, limit: usize) -> Self {
        Self {
            anchor: HistoryAnchor::After(id),
            limit,
        }
    }
}

#[async_trait]
pub trait HistoryClient: Send + Sync {
    /// Fetch up to `query.limit` messages adjacent to the anchor
    ///
    /// Order of the returned messages is not significant.
    async fn fetch_history(
        &self,
        channel_id: Snowflake,
        query: HistoryQuery,
    ) -> UpstreamResult<Vec<Message>>;
}

// ============================================================================
// Members
// ============================================================================

#[async_trait]
pub trait MemberClient: Send + Sync {
    /// Fetch guild members for the given users in one batch
    ///
    /// Users that are no longer members are simply absent from the result.
    async fn fetch_members(
        &self,
        guild_id: Snowflake,
        user_ids: &[Snowflake],
    ) -> UpstreamResult<Vec<MemberRecord>>;
}

// ============================================================================
// Channels
// ============================================================================

#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Find a channel (including threads) by ID
    async fn channel(&self, id: Snowflake) -> UpstreamResult<Channel>;

    /// List all channels and active threads in a guild
    async fn guild_channels(&self, guild_id: Snowflake) -> UpstreamResult<Vec<Channel>>;

    /// Find a guild by ID
    async fn guild(&self, id: Snowflake) -> UpstreamResult<Guild>;
}
