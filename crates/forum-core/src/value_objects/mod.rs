//! Value objects - immutable types that represent domain concepts

mod channel_flags;
mod snowflake;

pub use channel_flags::ChannelFlags;
pub use snowflake::{Snowflake, SnowflakeParseError};
