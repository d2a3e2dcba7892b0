//! Domain errors - error types shared by the cache and its upstream ports
//!
//! Every variant is `Clone` because one upstream failure is handed to every
//! caller waiting on the same coalesced fetch.

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Guild not found: {0}")]
    GuildNotFound(Snowflake),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    #[error("Member not found in guild")]
    MemberNotFound,

    // =========================================================================
    // Upstream Errors
    // =========================================================================
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Timed out: {0}")]
    Timeout(String),

    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Cache invariant violated in channel {channel_id}: {reason}")]
    Invariant { channel_id: Snowflake, reason: String },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Build an invariant violation for a channel
    pub fn invariant(channel_id: Snowflake, reason: impl Into<String>) -> Self {
        Self::Invariant {
            channel_id,
            reason: reason.into(),
        }
    }

    /// Get an error code string for rendered error pages
    pub fn code(&self) -> &'static str {
        match self {
            Self::GuildNotFound(_) => "UNKNOWN_GUILD",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",
            Self::MemberNotFound => "UNKNOWN_MEMBER",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::RateLimited { .. } => "UPSTREAM_RATE_LIMITED",
            Self::Timeout(_) => "TIMEOUT",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Invariant { .. } => "CACHE_INVARIANT",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GuildNotFound(_)
                | Self::ChannelNotFound(_)
                | Self::MessageNotFound(_)
                | Self::MemberNotFound
        )
    }

    /// Check if the upstream platform failed (transport, status, rate limit)
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::RateLimited { .. })
    }

    /// Check if a deadline expired
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Check if this is a cache consistency fault
    pub fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant { .. })
    }
}
