//! Test fixtures
//!
//! Builders for guilds, forums, posts, and messages.

use chrono::Utc;
use forum_core::{Author, Channel, ChannelKind, ForumTag, Guild, MemberRecord, Message, Snowflake};
use std::sync::atomic::{AtomicI64, Ordering};

// Channel and guild IDs stay far away from the small message IDs tests use
static COUNTER: AtomicI64 = AtomicI64::new(1_000_000);

/// Generate a unique ID for test entities
pub fn unique_id() -> Snowflake {
    Snowflake::new(COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Snowflake created `minutes_ago` minutes before now
pub fn snowflake_minutes_ago(minutes_ago: i64) -> Snowflake {
    Snowflake::from_timestamp(Utc::now().timestamp_millis() - minutes_ago * 60_000)
}

pub fn author(id: i64) -> Author {
    Author::new(Snowflake::new(id), format!("user{id}"))
}

/// Message `id` in `channel_id` by `author_id`
pub fn message(channel_id: Snowflake, id: i64, author_id: i64) -> Message {
    Message::new(
        Snowflake::new(id),
        channel_id,
        author(author_id),
        format!("message {id}"),
    )
}

/// Messages with IDs `1..=count`, authored in runs of three by two users
pub fn history(channel_id: Snowflake, count: i64) -> Vec<Message> {
    (1..=count)
        .map(|id| message(channel_id, id, 10 + ((id - 1) / 3) % 2))
        .collect()
}

pub fn member(guild_id: Snowflake, user_id: i64, nickname: &str) -> MemberRecord {
    let mut record = MemberRecord::new(guild_id, Snowflake::new(user_id), format!("user{user_id}"));
    record.nickname = Some(nickname.to_string());
    record
}

pub fn guild() -> Guild {
    let id = unique_id();
    Guild::new(id, format!("guild-{id}"))
}

pub fn forum(guild_id: Snowflake, name: &str) -> Channel {
    let mut forum = Channel::new(unique_id(), guild_id, ChannelKind::GuildForum, name.to_string());
    forum.available_tags = vec![
        ForumTag {
            id: unique_id(),
            name: "question".to_string(),
            emoji_name: None,
        },
        ForumTag {
            id: unique_id(),
            name: "solved".to_string(),
            emoji_name: Some("✅".to_string()),
        },
    ];
    forum
}

/// Public thread in `forum` whose last message is `minutes_ago` old
pub fn post(forum: &Channel, name: &str, minutes_ago: i64) -> Channel {
    let guild_id = forum.guild_id.unwrap_or_default();
    let mut post = Channel::new_post(unique_id(), guild_id, forum.id, name.to_string());
    post.last_message_id = Some(snowflake_minutes_ago(minutes_ago));
    post
}

/// Archived public thread in `forum`
pub fn archived_post(forum: &Channel, name: &str) -> Channel {
    let mut post = post(forum, name, 60 * 24 * 30);
    post.archived = true;
    post
}
