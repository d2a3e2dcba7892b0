//! Test helpers
//!
//! An in-memory platform that stands in for the REST API, and a harness
//! wiring it into a `ServiceContext`.

use async_trait::async_trait;
use forum_cache::Direction;
use forum_common::CacheConfig;
use forum_core::{
    Channel, ChannelDirectory, DomainError, Guild, HistoryAnchor, HistoryClient, HistoryQuery,
    MemberClient, MemberRecord, Message, Snowflake, UpstreamResult,
};
use forum_service::{Page, ServiceContext, ServiceContextBuilder};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fake platform
// ============================================================================

/// In-memory platform with call counters and fault injection
#[derive(Default)]
pub struct FakePlatform {
    guilds: Mutex<HashMap<Snowflake, Guild>>,
    channels: Mutex<HashMap<Snowflake, Channel>>,
    messages: Mutex<HashMap<Snowflake, Vec<Message>>>,
    members: Mutex<HashMap<(Snowflake, Snowflake), MemberRecord>>,
    queries: Mutex<Vec<(Snowflake, HistoryQuery)>>,
    history_calls: AtomicUsize,
    member_calls: AtomicUsize,
    fail_history: AtomicBool,
    fail_members: AtomicBool,
    corrupt_next_history: AtomicBool,
    history_delay_ms: AtomicU64,
    member_delay_ms: AtomicU64,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // === Seeding ===

    pub fn add_guild(&self, guild: Guild) {
        self.guilds.lock().insert(guild.id, guild);
    }

    /// Add or replace a channel
    pub fn put_channel(&self, channel: Channel) {
        self.channels.lock().insert(channel.id, channel);
    }

    /// Add messages to a channel's history
    pub fn add_messages(&self, channel_id: Snowflake, messages: Vec<Message>) {
        let mut all = self.messages.lock();
        let history = all.entry(channel_id).or_default();
        history.extend(messages);
        history.sort_by_key(|m| m.id);
        history.dedup_by_key(|m| m.id);
    }

    pub fn add_member(&self, member: MemberRecord) {
        self.members
            .lock()
            .insert((member.guild_id, member.user_id), member);
    }

    // === Fault injection ===

    pub fn fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    pub fn fail_members(&self, fail: bool) {
        self.fail_members.store(fail, Ordering::SeqCst);
    }

    /// Make the next history response carry a message from another channel
    pub fn corrupt_next_history(&self) {
        self.corrupt_next_history.store(true, Ordering::SeqCst);
    }

    pub fn set_history_delay(&self, delay: Duration) {
        self.history_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    pub fn set_member_delay(&self, delay: Duration) {
        self.member_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    // === Inspection ===

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn member_calls(&self) -> usize {
        self.member_calls.load(Ordering::SeqCst)
    }

    /// History queries made so far, oldest first
    pub fn queries(&self) -> Vec<(Snowflake, HistoryQuery)> {
        self.queries.lock().clone()
    }

    async fn delay(millis: &AtomicU64) {
        let millis = millis.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

#[async_trait]
impl HistoryClient for FakePlatform {
    async fn fetch_history(
        &self,
        channel_id: Snowflake,
        query: HistoryQuery,
    ) -> UpstreamResult<Vec<Message>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push((channel_id, query));
        Self::delay(&self.history_delay_ms).await;

        if self.fail_history.load(Ordering::SeqCst) {
            return Err(DomainError::Upstream("history unavailable".to_string()));
        }
        if !self.channels.lock().contains_key(&channel_id) {
            return Err(DomainError::ChannelNotFound(channel_id));
        }

        let all = self.messages.lock();
        let history = all.get(&channel_id).map_or(&[][..], Vec::as_slice);
        let mut page: Vec<Message> = match query.anchor {
            HistoryAnchor::Latest => {
                history[history.len().saturating_sub(query.limit)..].to_vec()
            }
            HistoryAnchor::Before(id) => {
                let older: Vec<&Message> = history.iter().filter(|m| m.id < id).collect();
                older[older.len().saturating_sub(query.limit)..]
                    .iter()
                    .map(|m| (*m).clone())
                    .collect()
            }
            HistoryAnchor::After(id) => history
                .iter()
                .filter(|m| m.id > id)
                .take(query.limit)
                .cloned()
                .collect(),
        };
        // Newest first, like the platform
        page.reverse();

        if self.corrupt_next_history.swap(false, Ordering::SeqCst) {
            if let Some(mut stray) = page.first().cloned() {
                stray.channel_id = stray.channel_id.next();
                page.push(stray);
            }
        }
        Ok(page)
    }
}

#[async_trait]
impl MemberClient for FakePlatform {
    async fn fetch_members(
        &self,
        guild_id: Snowflake,
        user_ids: &[Snowflake],
    ) -> UpstreamResult<Vec<MemberRecord>> {
        self.member_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(&self.member_delay_ms).await;

        if self.fail_members.load(Ordering::SeqCst) {
            return Err(DomainError::Upstream("members unavailable".to_string()));
        }

        let members = self.members.lock();
        Ok(user_ids
            .iter()
            .filter_map(|user_id| members.get(&(guild_id, *user_id)).cloned())
            .collect())
    }
}

#[async_trait]
impl ChannelDirectory for FakePlatform {
    async fn channel(&self, id: Snowflake) -> UpstreamResult<Channel> {
        self.channels
            .lock()
            .get(&id)
            .cloned()
            .ok_or(DomainError::ChannelNotFound(id))
    }

    async fn guild_channels(&self, guild_id: Snowflake) -> UpstreamResult<Vec<Channel>> {
        let mut channels: Vec<Channel> = self
            .channels
            .lock()
            .values()
            .filter(|c| c.guild_id == Some(guild_id))
            .cloned()
            .collect();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }

    async fn guild(&self, id: Snowflake) -> UpstreamResult<Guild> {
        self.guilds
            .lock()
            .get(&id)
            .cloned()
            .ok_or(DomainError::GuildNotFound(id))
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A service context backed by a fake platform
pub struct TestCache {
    pub ctx: ServiceContext,
    pub platform: Arc<FakePlatform>,
}

impl TestCache {
    /// Start with the default cache configuration
    pub fn start() -> anyhow::Result<Self> {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> anyhow::Result<Self> {
        let _ = forum_common::try_init_tracing();

        let platform = FakePlatform::new();
        let ctx = ServiceContextBuilder::new()
            .config(config)
            .history(platform.clone())
            .member_client(platform.clone())
            .directory(platform.clone())
            .build()?;
        Ok(Self { ctx, platform })
    }

    /// Read one page through the pagination engine
    pub async fn page(
        &self,
        channel_id: Snowflake,
        cursor: Option<i64>,
        direction: Direction,
        limit: usize,
    ) -> anyhow::Result<Page> {
        Ok(self
            .ctx
            .pagination()
            .page(channel_id, cursor.map(Snowflake::new), direction, limit)
            .await?)
    }
}

/// Raw IDs of a page's messages
pub fn ids(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(|m| m.id.into_inner()).collect()
}

/// Assert that messages are strictly ascending by ID
pub fn assert_ascending(messages: &[Message]) -> anyhow::Result<()> {
    if let Some(pair) = messages.windows(2).find(|w| w[0].id >= w[1].id) {
        anyhow::bail!("messages out of order: {} then {}", pair[0].id, pair[1].id);
    }
    Ok(())
}

/// Poll `check` until it holds or a second passes
pub async fn eventually(mut check: impl FnMut() -> bool) -> anyhow::Result<()> {
    for _ in 0..100 {
        if check() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    anyhow::bail!("condition not reached within 1s")
}
