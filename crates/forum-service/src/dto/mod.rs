//! Data transfer objects for page views
//!
//! This module provides:
//! - Request DTOs parsing raw query parameters
//! - Response DTOs for rendering
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{ForumQuery, PageRequest, ThreadQuery};

pub use responses::{
    AuthorGroup, ChannelSummary, ForumOverview, ForumSummary, GuildSummary, MessageView,
    PostPage, TagResponse, ThreadPage,
};
