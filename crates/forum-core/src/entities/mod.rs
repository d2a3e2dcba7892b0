//! Domain entities - the platform objects the viewer caches and renders

mod channel;
mod guild;
mod member;
mod message;

pub use channel::{Channel, ChannelKind, ForumTag};
pub use guild::Guild;
pub use member::MemberRecord;
pub use message::{Author, Message};
