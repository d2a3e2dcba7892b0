//! Page services
//!
//! Orchestrates the cache components into the views the site renders.

pub mod context;
pub mod error;
pub mod eviction;
pub mod forum;
pub mod ingest;
pub mod pagination;
pub mod thread;

pub use context::{BackgroundTasks, ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use eviction::{EvictionHandle, IdleEviction};
pub use forum::ForumService;
pub use ingest::{EventIngest, IngestHandle};
pub use pagination::{Page, PaginationEngine};
pub use thread::{group_messages, ThreadService};
