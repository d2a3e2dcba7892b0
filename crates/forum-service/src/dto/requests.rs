//! Request DTOs for page views
//!
//! Query strings arrive as raw strings; parsing happens here so services only
//! see typed cursors.

use forum_cache::Direction;
use forum_core::Snowflake;
use serde::Deserialize;

use crate::services::{ServiceError, ServiceResult};

// ============================================================================
// Thread Requests
// ============================================================================

/// Raw `?after=` / `?before=` query of a thread page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadQuery {
    pub after: Option<String>,
    pub before: Option<String>,
}

impl ThreadQuery {
    /// Parse into a page request
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` for a non-numeric cursor
    pub fn into_request(self) -> ServiceResult<PageRequest> {
        PageRequest::from_query(self.after.as_deref(), self.before.as_deref())
    }
}

/// Which slice of a thread to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<Snowflake>,
    pub direction: Direction,
}

impl PageRequest {
    /// The oldest messages of a thread
    pub fn first() -> Self {
        Self {
            cursor: None,
            direction: Direction::After,
        }
    }

    pub fn after(cursor: Snowflake) -> Self {
        Self {
            cursor: Some(cursor),
            direction: Direction::After,
        }
    }

    pub fn before(cursor: Snowflake) -> Self {
        Self {
            cursor: Some(cursor),
            direction: Direction::Before,
        }
    }

    /// Build from query parameters; `after` wins when both are present
    ///
    /// Empty values count as absent.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` for a non-numeric cursor
    pub fn from_query(after: Option<&str>, before: Option<&str>) -> ServiceResult<Self> {
        fn non_empty(raw: Option<&str>) -> Option<&str> {
            raw.filter(|s| !s.trim().is_empty())
        }

        if let Some(raw) = non_empty(after) {
            return Ok(Self::after(parse_cursor(raw)?));
        }
        if let Some(raw) = non_empty(before) {
            return Ok(Self::before(parse_cursor(raw)?));
        }
        Ok(Self::first())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

fn parse_cursor(raw: &str) -> ServiceResult<Snowflake> {
    Snowflake::parse(raw).map_err(|e| ServiceError::validation(format!("cursor {raw:?}: {e}")))
}

// ============================================================================
// Forum Requests
// ============================================================================

/// Raw page number of a forum listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForumQuery {
    pub page: Option<String>,
}

impl ForumQuery {
    /// Page number, 1-based; missing, garbage, or zero means the first page
    pub fn page_number(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }
}
