//! End-to-end tests of the thread and forum views
//!
//! Run with: `cargo test -p integration-tests`

use forum_core::{Channel, ChannelFlags, Guild, Snowflake};
use forum_service::dto::PageRequest;
use forum_service::{ForumService, ThreadService};
use integration_tests::*;
use std::time::Duration;
use tokio::time::Instant;

struct Seeded {
    guild: Guild,
    forum: Channel,
    post: Channel,
}

/// A guild with a forum and a 30-message post; user 10 is a member with a nickname
fn seed(cache: &TestCache) -> Seeded {
    let guild = guild();
    let forum = forum(guild.id, "help");
    let mut post = post(&forum, "how do I", 5);
    post.message_count = 30;
    post.applied_tags = vec![forum.available_tags[1].id];

    cache.platform.add_messages(post.id, history(post.id, 30));
    cache.platform.add_member(member(guild.id, 10, "Ten"));
    cache.platform.add_guild(guild.clone());
    cache.platform.put_channel(forum.clone());
    cache.platform.put_channel(post.clone());
    Seeded { guild, forum, post }
}

// ============================================================================
// Thread pages
// ============================================================================

#[tokio::test]
async fn test_thread_pages_group_authors() {
    let cache = TestCache::start().expect("Failed to start cache");
    let s = seed(&cache);
    let threads = ThreadService::new(&cache.ctx);

    let first = threads
        .thread_page(s.guild.id, s.post.id, PageRequest::first(), cache.ctx.member_deadline())
        .await
        .expect("Failed to render first page");

    assert_eq!(first.message_count(), 25);
    assert_eq!(first.groups.len(), 9);
    assert_eq!(first.prev, None);
    assert_eq!(first.next.as_deref(), Some("25"));
    assert!(first.members_resolved);
    assert_eq!(first.post.id, s.post.id.to_string());
    assert_eq!(first.post.tags[0].name, "solved");
    assert_eq!(first.guild.name, s.guild.name);

    let ten = &first.groups[0].author;
    assert_eq!(ten.name, "Ten");
    assert!(ten.resolved);
    let eleven = &first.groups[1].author;
    assert_eq!(eleven.name, "user11");
    assert!(!eleven.resolved);

    let second = threads
        .thread_page(
            s.guild.id,
            s.post.id,
            PageRequest::after(Snowflake::new(25)),
            cache.ctx.member_deadline(),
        )
        .await
        .expect("Failed to render second page");

    assert_eq!(second.message_count(), 5);
    assert_eq!(second.groups.len(), 2);
    assert_eq!(second.prev.as_deref(), Some("26"));
    assert_eq!(second.next, None);

    let back = threads
        .thread_page(
            s.guild.id,
            s.post.id,
            PageRequest::before(Snowflake::new(26)),
            cache.ctx.member_deadline(),
        )
        .await
        .expect("Failed to render previous page");
    assert_eq!(back.groups[0].messages[0].id, "1");
    assert_eq!(back.next.as_deref(), Some("25"));

    // Same authors throughout, so one lookup covers every render
    assert_eq!(cache.platform.member_calls(), 1);
}

#[tokio::test]
async fn test_thread_page_serializes() {
    let cache = TestCache::start().expect("Failed to start cache");
    let s = seed(&cache);

    let page = ThreadService::new(&cache.ctx)
        .thread_page(s.guild.id, s.post.id, PageRequest::first(), cache.ctx.member_deadline())
        .await
        .expect("Failed to render page");
    let json = serde_json::to_value(&page).expect("Failed to serialize page");

    assert_eq!(json["members_resolved"], true);
    assert_eq!(json["groups"][0]["author"]["name"], "Ten");
    assert_eq!(json["groups"][0]["messages"][0]["content"], "message 1");
}

#[tokio::test]
async fn test_member_timeout_degrades_then_recovers() {
    let cache = TestCache::start().expect("Failed to start cache");
    let s = seed(&cache);
    let threads = ThreadService::new(&cache.ctx);
    cache.platform.set_member_delay(Duration::from_millis(200));

    let page = threads
        .thread_page(
            s.guild.id,
            s.post.id,
            PageRequest::first(),
            Instant::now() + Duration::from_millis(20),
        )
        .await
        .expect("Page should render without members");
    assert!(!page.members_resolved);
    assert_eq!(page.message_count(), 25);
    assert_eq!(page.groups[0].author.name, "user10");
    assert!(!page.groups[0].author.resolved);

    let page = threads
        .thread_page(s.guild.id, s.post.id, PageRequest::first(), cache.ctx.member_deadline())
        .await
        .expect("Failed to render page");
    assert!(page.members_resolved);
    assert_eq!(page.groups[0].author.name, "Ten");
    assert!(cache.platform.member_calls() <= 2);
}

#[tokio::test]
async fn test_member_failure_is_retried() {
    let cache = TestCache::start().expect("Failed to start cache");
    let s = seed(&cache);
    let threads = ThreadService::new(&cache.ctx);

    cache.platform.fail_members(true);
    let page = threads
        .thread_page(s.guild.id, s.post.id, PageRequest::first(), cache.ctx.member_deadline())
        .await
        .expect("Page should render without members");
    assert!(!page.members_resolved);

    cache.platform.fail_members(false);
    let page = threads
        .thread_page(s.guild.id, s.post.id, PageRequest::first(), cache.ctx.member_deadline())
        .await
        .expect("Failed to render page");
    assert!(page.members_resolved);
    assert_eq!(cache.platform.member_calls(), 2);
}

#[tokio::test]
async fn test_thread_page_lookup_errors() {
    let cache = TestCache::start().expect("Failed to start cache");
    let s = seed(&cache);
    let threads = ThreadService::new(&cache.ctx);
    let deadline = cache.ctx.member_deadline();

    // The forum itself is not a post
    let err = threads
        .thread_page(s.guild.id, s.forum.id, PageRequest::first(), deadline)
        .await
        .expect_err("forum should not render as a thread");
    assert_eq!(err.status_code(), 404);

    // Post of another guild
    let other = guild();
    cache.platform.add_guild(other.clone());
    let err = threads
        .thread_page(other.id, s.post.id, PageRequest::first(), deadline)
        .await
        .expect_err("post should not render under another guild");
    assert_eq!(err.status_code(), 404);

    let mut nsfw = post(&s.forum, "spicy", 1);
    nsfw.nsfw = true;
    cache.platform.put_channel(nsfw.clone());
    let err = threads
        .thread_page(s.guild.id, nsfw.id, PageRequest::first(), deadline)
        .await
        .expect_err("NSFW post should be refused");
    assert_eq!(err.status_code(), 403);

    let err = PageRequest::from_query(Some("abc"), None)
        .expect_err("malformed cursor should be rejected");
    assert_eq!(err.status_code(), 400);

    // Nothing above fetched history for the refused channels
    assert_eq!(cache.ctx.store().message_count(nsfw.id), 0);
    assert_eq!(cache.ctx.store().message_count(s.forum.id), 0);
}

// ============================================================================
// Forum listings
// ============================================================================

#[tokio::test]
async fn test_forum_overview_orders_by_activity() {
    let cache = TestCache::start().expect("Failed to start cache");
    let guild = guild();
    let quiet = forum(guild.id, "announcements");
    let busy = forum(guild.id, "help");
    let empty = forum(guild.id, "archive");

    let mut old = post(&quiet, "welcome", 60);
    old.message_count = 7;
    let mut recent = post(&quiet, "rules", 5);
    recent.message_count = 3;
    let mut newest = post(&busy, "crash on start", 1);
    newest.message_count = 2;

    cache.platform.add_guild(guild.clone());
    for channel in [quiet.clone(), busy.clone(), empty.clone(), old, recent, newest] {
        cache.platform.put_channel(channel);
    }

    let overview = ForumService::new(&cache.ctx)
        .forum_overview(guild.id)
        .await
        .expect("Failed to build overview");

    let names: Vec<&str> = overview.forums.iter().map(|f| f.forum.name.as_str()).collect();
    assert_eq!(names, vec!["help", "announcements", "archive"]);
    assert_eq!(overview.forums[1].message_count, 10);
    assert_eq!(overview.forums[1].posts.len(), 2);
    assert!(overview.forums[2].last_active.is_none());
    assert_eq!(overview.guild.id, guild.id.to_string());
}

#[tokio::test]
async fn test_forum_posts_paginate_pinned_first() {
    let cache = TestCache::start().expect("Failed to start cache");
    let guild = guild();
    let forum = forum(guild.id, "help");
    cache.platform.add_guild(guild.clone());
    cache.platform.put_channel(forum.clone());

    let mut oldest_id = None;
    for minutes_ago in 1..=30 {
        let mut post = post(&forum, &format!("post {minutes_ago}"), minutes_ago);
        if minutes_ago == 30 {
            post.flags = ChannelFlags::PINNED;
            oldest_id = Some(post.id);
        }
        cache.platform.put_channel(post);
    }
    let forums = ForumService::new(&cache.ctx);

    let first = forums
        .forum_posts(guild.id, forum.id, 0)
        .await
        .expect("Failed to list posts");
    assert_eq!(first.page, 1);
    assert_eq!(first.posts.len(), 25);
    assert_eq!(first.prev, None);
    assert_eq!(first.next, Some(2));
    assert_eq!(Some(first.posts[0].id.clone()), oldest_id.map(|id| id.to_string()));
    assert!(first.posts[0].pinned);
    assert_eq!(first.posts[1].name, "post 1");
    assert_eq!(first.posts[2].name, "post 2");

    let second = forums
        .forum_posts(guild.id, forum.id, 2)
        .await
        .expect("Failed to list posts");
    assert_eq!(second.posts.len(), 5);
    assert_eq!(second.prev, Some(1));
    assert_eq!(second.next, None);
    assert_eq!(second.posts[4].name, "post 29");
}

#[tokio::test]
async fn test_forum_posts_refuses_nsfw_and_foreign_forums() {
    let cache = TestCache::start().expect("Failed to start cache");
    let other = guild();
    let guild = guild();
    let mut nsfw = forum(guild.id, "after dark");
    nsfw.nsfw = true;
    let foreign = forum(other.id, "elsewhere");

    cache.platform.add_guild(guild.clone());
    cache.platform.add_guild(other);
    cache.platform.put_channel(nsfw.clone());
    cache.platform.put_channel(foreign.clone());
    let forums = ForumService::new(&cache.ctx);

    let err = forums
        .forum_posts(guild.id, nsfw.id, 1)
        .await
        .expect_err("NSFW forum should be refused");
    assert_eq!(err.status_code(), 403);

    let err = forums
        .forum_posts(guild.id, foreign.id, 1)
        .await
        .expect_err("foreign forum should be hidden");
    assert_eq!(err.status_code(), 404);

    let err = forums
        .forum_overview(unique_id())
        .await
        .expect_err("unknown guild should fail");
    assert_eq!(err.status_code(), 404);
}
