//! # forum-cache
//!
//! Message consistency cache for forum channels.
//!
//! ## Features
//!
//! - **Channel store**: ordered, deduplicated messages per channel with a
//!   coverage index so reads never bridge an unfetched gap
//! - **Backfill**: per-channel state machine that fetches history on demand
//!   and never re-fetches archived channels once fully cached
//! - **Members**: batched author lookups, attempted once per channel
//! - **Event bus**: fan-out of gateway events to registered handlers
//!
//! ## Example
//!
//! ```ignore
//! use forum_cache::{BackfillConfig, BackfillController, ChannelStore, Direction};
//!
//! let store = Arc::new(ChannelStore::new());
//! let backfill = BackfillController::new(store.clone(), history, directory, BackfillConfig::default());
//!
//! backfill.ensure_window(channel_id, None, Direction::After, 25).await?;
//! let window = store.window(channel_id, None, Direction::After, 25)?;
//! ```

pub mod backfill;
pub mod flight;
pub mod members;
pub mod pubsub;
pub mod store;

pub use backfill::{BackfillConfig, BackfillController};
pub use flight::SingleFlight;
pub use members::{AuthorDisplay, MemberResolver, UNKNOWN_AUTHOR};
pub use pubsub::{EventBus, EventHandler, Subscription};
pub use store::{covered_span, BackfillState, ChannelStore, Coverage, Direction, Window};
