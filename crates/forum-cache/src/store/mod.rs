//! In-memory channel message store.

mod channel_store;
mod coverage;

pub use channel_store::{BackfillState, ChannelStore, Direction, Window};
pub use coverage::{covered_span, Coverage};
