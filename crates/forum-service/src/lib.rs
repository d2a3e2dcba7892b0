//! # forum-service
//!
//! Application layer: pagination over the message cache, event ingestion,
//! and the thread and forum views built on top of them.

pub mod dto;
pub mod services;

pub use services::{
    ForumService, Page, PaginationEngine, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, ThreadService,
};
