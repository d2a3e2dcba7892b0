//! Member resolver - batched, deduplicated guild member lookups
//!
//! Authors are attempted at most once per channel, whether or not the
//! platform returned them, so re-rendering a page never repeats a lookup.
//! Lookups for one channel are coalesced; every caller is bounded by its own
//! deadline.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use forum_core::{Author, DomainError, MemberClient, MemberRecord, Message, Snowflake};
use serde::Serialize;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, instrument, warn};

use crate::flight::SingleFlight;

/// Name shown when nothing is known about an author
pub const UNKNOWN_AUTHOR: &str = "Unknown user";

/// Upper bound on one shared upstream lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

type MemberKey = (Snowflake, Snowflake);

/// How an author is rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorDisplay {
    pub id: Snowflake,
    pub name: String,
    pub avatar: Option<String>,
    pub bot: bool,
    /// Whether guild member data was available
    pub resolved: bool,
}

/// Resolves message authors to guild members
pub struct MemberResolver {
    client: Arc<dyn MemberClient>,
    members: Arc<DashMap<MemberKey, Arc<MemberRecord>>>,
    attempted: Arc<DashMap<Snowflake, HashSet<Snowflake>>>,
    flights: SingleFlight<Snowflake, ()>,
    lookup_timeout: Duration,
}

impl MemberResolver {
    pub fn new(client: Arc<dyn MemberClient>) -> Self {
        Self {
            client,
            members: Arc::new(DashMap::new()),
            attempted: Arc::new(DashMap::new()),
            flights: SingleFlight::new(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Bound the shared upstream lookup
    ///
    /// Callers still wait no longer than their own deadline; this only
    /// limits how long a lookup nobody waits for keeps running.
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Resolve the authors of `messages` that were not attempted for this channel
    ///
    /// Returns immediately when every author was already attempted.
    ///
    /// # Errors
    /// Returns `DomainError::Timeout` if `deadline` passes first, or the
    /// upstream error of a failed lookup. Neither marks the authors attempted.
    #[instrument(skip_all, fields(guild_id = %guild_id, channel_id = %channel_id))]
    pub async fn ensure(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        messages: &[Message],
        deadline: Instant,
    ) -> Result<(), DomainError> {
        let authors: BTreeSet<Snowflake> = messages.iter().map(|m| m.author.id).collect();

        // A second round covers joining a lookup started for other authors.
        for _ in 0..2 {
            let pending = self.pending(guild_id, channel_id, &authors);
            if pending.is_empty() {
                return Ok(());
            }

            let lookup = MemberLookup {
                client: Arc::clone(&self.client),
                members: Arc::clone(&self.members),
                attempted: Arc::clone(&self.attempted),
                guild_id,
                channel_id,
                user_ids: pending,
                timeout: self.lookup_timeout,
            };
            match timeout_at(deadline, self.flights.run(channel_id, lookup.run())).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("member resolution deadline passed");
                    return Err(DomainError::Timeout(format!(
                        "member resolution for channel {channel_id}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Authors still to look up; ones cached through another channel are
    /// recorded against this channel too, so pruning keeps them
    fn pending(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        authors: &BTreeSet<Snowflake>,
    ) -> Vec<Snowflake> {
        if authors.is_empty() {
            return Vec::new();
        }
        let mut attempted = self.attempted.entry(channel_id).or_default();
        let mut pending = Vec::new();
        for &id in authors {
            if attempted.contains(&id) {
                continue;
            }
            if self.members.contains_key(&(guild_id, id)) {
                attempted.insert(id);
            } else {
                pending.push(id);
            }
        }
        pending
    }

    /// Cached member record
    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Arc<MemberRecord>> {
        self.members
            .get(&(guild_id, user_id))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Display identity for an author
    ///
    /// Prefers the guild member (nickname, guild avatar), then the identity
    /// the platform embedded in the message, then a placeholder.
    pub fn author(&self, guild_id: Snowflake, author: &Author) -> AuthorDisplay {
        if let Some(member) = self.member(guild_id, author.id) {
            return AuthorDisplay {
                id: author.id,
                name: member
                    .nickname
                    .clone()
                    .unwrap_or_else(|| author.display_name().to_string()),
                avatar: member
                    .effective_avatar()
                    .map(str::to_string)
                    .or_else(|| author.avatar.clone()),
                bot: author.bot,
                resolved: true,
            };
        }

        let name = if author.username.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            author.display_name().to_string()
        };
        AuthorDisplay {
            id: author.id,
            name,
            avatar: author.avatar.clone(),
            bot: author.bot,
            resolved: false,
        }
    }

    /// Forget which authors were attempted for a channel
    pub fn forget_channel(&self, channel_id: Snowflake) -> usize {
        self.forget_channels(&[channel_id])
    }

    /// Forget dropped channels and the members only they referenced
    ///
    /// Returns the number of member records released.
    pub fn forget_channels(&self, channel_ids: &[Snowflake]) -> usize {
        let mut forgot = false;
        for channel_id in channel_ids {
            forgot |= self.attempted.remove(channel_id).is_some();
        }
        if !forgot {
            return 0;
        }

        let referenced: HashSet<Snowflake> = self
            .attempted
            .iter()
            .flat_map(|entry| entry.value().iter().copied().collect::<Vec<_>>())
            .collect();
        let before = self.members.len();
        self.members
            .retain(|(_, user_id), _| referenced.contains(user_id));
        let released = before.saturating_sub(self.members.len());
        if released > 0 {
            debug!(channels = channel_ids.len(), released, "released member records");
        }
        released
    }

    /// Number of cached member records
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// One batched member lookup, owned by the task that runs it
struct MemberLookup {
    client: Arc<dyn MemberClient>,
    members: Arc<DashMap<MemberKey, Arc<MemberRecord>>>,
    attempted: Arc<DashMap<Snowflake, HashSet<Snowflake>>>,
    guild_id: Snowflake,
    channel_id: Snowflake,
    user_ids: Vec<Snowflake>,
    timeout: Duration,
}

impl MemberLookup {
    async fn run(self) -> Result<(), DomainError> {
        let records = timeout(
            self.timeout,
            self.client.fetch_members(self.guild_id, &self.user_ids),
        )
        .await
        .map_err(|_| {
            DomainError::Timeout(format!("member lookup for channel {}", self.channel_id))
        })??;

        debug!(
            channel_id = %self.channel_id,
            requested = self.user_ids.len(),
            returned = records.len(),
            "resolved members"
        );
        // Attempted first, so a concurrent prune never sees records it can't account for.
        self.attempted
            .entry(self.channel_id)
            .or_default()
            .extend(self.user_ids.iter().copied());
        for record in records {
            self.members
                .insert((self.guild_id, record.user_id), Arc::new(record));
        }
        Ok(())
    }
}
