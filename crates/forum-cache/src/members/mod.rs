//! Guild member resolution for message authors.

mod resolver;

pub use resolver::{AuthorDisplay, MemberResolver, UNKNOWN_AUTHOR};
