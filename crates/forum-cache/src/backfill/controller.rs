//! Backfill controller - decides when a channel's history must be fetched
//!
//! State machine per channel:
//!
//! ```text
//! Unknown --first fetch--> Backfilling --live--------> Complete
//!                               |      --archived----> Inactive
//!                               +------failure-------> Unknown
//! ```
//!
//! `Complete` channels fetch only the gap a request needs. `Inactive`
//! channels are served from memory forever.

use std::sync::Arc;

use forum_common::CacheConfig;
use forum_core::{ChannelDirectory, DomainError, HistoryClient, HistoryQuery, Snowflake};
use tracing::{debug, info, instrument, warn};

use crate::flight::SingleFlight;
use crate::store::{covered_span, BackfillState, ChannelStore, Direction};

/// Coalesced flights a single request may go through before it settles
/// for whatever is cached.
const MAX_ROUNDS: usize = 3;

/// Backfill tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillConfig {
    /// Messages requested per history call
    pub fetch_limit: usize,
    /// History pages fetched to fully cache an archived channel
    pub inactive_max_pages: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for BackfillConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            fetch_limit: config.history_fetch_limit,
            inactive_max_pages: config.inactive_backfill_max_pages,
        }
    }
}

/// Guarantees a requested window is materialized before it is read
pub struct BackfillController {
    store: Arc<ChannelStore>,
    history: Arc<dyn HistoryClient>,
    directory: Arc<dyn ChannelDirectory>,
    flights: SingleFlight<Snowflake, ()>,
    config: BackfillConfig,
}

impl BackfillController {
    pub fn new(
        store: Arc<ChannelStore>,
        history: Arc<dyn HistoryClient>,
        directory: Arc<dyn ChannelDirectory>,
        config: BackfillConfig,
    ) -> Self {
        Self {
            store,
            history,
            directory,
            flights: SingleFlight::new(),
            config,
        }
    }

    pub fn store(&self) -> &Arc<ChannelStore> {
        &self.store
    }

    /// Check whether a backfill for the channel is running
    pub fn in_flight(&self, channel_id: Snowflake) -> bool {
        self.flights.in_flight(&channel_id)
    }

    /// Make sure the window `(cursor, direction, limit)` can be read from the store
    ///
    /// At most one backfill per channel runs at a time; concurrent callers
    /// wait for it and re-check their own window afterwards. The fetch runs on
    /// its own task, so dropping this future does not cancel it.
    ///
    /// # Errors
    /// Returns the upstream error of a failed fetch, after the channel has
    /// been reset so the next request retries.
    #[instrument(skip(self, channel_id), fields(channel_id = %channel_id))]
    pub async fn ensure_window(
        &self,
        channel_id: Snowflake,
        cursor: Option<Snowflake>,
        direction: Direction,
        limit: usize,
    ) -> Result<(), DomainError> {
        for round in 0..MAX_ROUNDS {
            if self.satisfied(channel_id, cursor, direction, limit) {
                return Ok(());
            }

            let job = BackfillJob {
                store: Arc::clone(&self.store),
                history: Arc::clone(&self.history),
                directory: Arc::clone(&self.directory),
                fetch_limit: self.config.fetch_limit.max(limit),
                inactive_max_pages: self.config.inactive_max_pages,
                channel_id,
                cursor,
                direction,
                limit,
            };
            self.flights.run(channel_id, job.run()).await?;
            debug!(round, "backfill flight settled");
        }

        if !self.satisfied(channel_id, cursor, direction, limit) {
            debug!("window still partially covered, serving cached slice");
        }
        Ok(())
    }

    fn satisfied(
        &self,
        channel_id: Snowflake,
        cursor: Option<Snowflake>,
        direction: Direction,
        limit: usize,
    ) -> bool {
        match self.store.state(channel_id) {
            BackfillState::Inactive => true,
            BackfillState::Complete => self.store.is_covered(channel_id, cursor, direction, limit),
            BackfillState::Unknown | BackfillState::Backfilling => false,
        }
    }
}

/// One backfill flight, owned by the task that runs it
struct BackfillJob {
    store: Arc<ChannelStore>,
    history: Arc<dyn HistoryClient>,
    directory: Arc<dyn ChannelDirectory>,
    fetch_limit: usize,
    inactive_max_pages: usize,
    channel_id: Snowflake,
    cursor: Option<Snowflake>,
    direction: Direction,
    limit: usize,
}

impl BackfillJob {
    async fn run(self) -> Result<(), DomainError> {
        match self.store.state(self.channel_id) {
            BackfillState::Inactive => Ok(()),
            BackfillState::Complete if self.covered() => Ok(()),
            BackfillState::Complete => self.fill_gap().await.map(|_| ()).inspect_err(|e| {
                warn!(channel_id = %self.channel_id, error = %e, "gap fetch failed");
            }),
            BackfillState::Unknown | BackfillState::Backfilling => self.initial().await,
        }
    }

    fn covered(&self) -> bool {
        self.store
            .is_covered(self.channel_id, self.cursor, self.direction, self.limit)
    }

    async fn initial(&self) -> Result<(), DomainError> {
        self.store
            .set_state(self.channel_id, BackfillState::Backfilling);
        let guard = BackfillGuard {
            store: &self.store,
            channel_id: self.channel_id,
            armed: true,
        };

        let first = match (self.cursor, self.direction) {
            (None, _) => HistoryQuery::latest(self.fetch_limit),
            (Some(cursor), Direction::After) => HistoryQuery::after(cursor, self.fetch_limit),
            (Some(cursor), Direction::Before) => HistoryQuery::before(cursor, self.fetch_limit),
        };

        match self.classify(first).await {
            Ok(state) => {
                guard.settle(state);
                info!(
                    channel_id = %self.channel_id,
                    state = ?state,
                    cached = self.store.message_count(self.channel_id),
                    "channel backfilled"
                );
                Ok(())
            }
            Err(e) => {
                drop(guard);
                warn!(channel_id = %self.channel_id, error = %e, "backfill failed, channel reset");
                Err(e)
            }
        }
    }

    async fn classify(&self, first: HistoryQuery) -> Result<BackfillState, DomainError> {
        self.fetch(first).await?;

        let channel = self.directory.channel(self.channel_id).await?;
        if channel.is_inactive() {
            if self.fetch_everything().await? {
                return Ok(BackfillState::Inactive);
            }
            warn!(
                channel_id = %self.channel_id,
                pages = self.inactive_max_pages,
                "archived history exceeds page budget, keeping channel live"
            );
        }

        if !self.covered() {
            self.fill_gap().await?;
        }
        Ok(BackfillState::Complete)
    }

    /// Fetch the page adjacent to the covered span the request falls in
    async fn fill_gap(&self) -> Result<usize, DomainError> {
        let anchor = self.direction.anchor(self.cursor);
        let span = self.store.span_containing(self.channel_id, anchor);

        let query = match (self.direction, span, self.cursor) {
            (Direction::After, Some((_, hi)), _) => HistoryQuery::after(hi, self.fetch_limit),
            (Direction::After, None, cursor) => {
                HistoryQuery::after(cursor.unwrap_or(Snowflake::MIN), self.fetch_limit)
            }
            (Direction::Before, Some((lo, _)), _) => HistoryQuery::before(lo, self.fetch_limit),
            (Direction::Before, None, Some(cursor)) => {
                HistoryQuery::before(cursor, self.fetch_limit)
            }
            (Direction::Before, None, None) => HistoryQuery::latest(self.fetch_limit),
        };
        self.fetch(query).await
    }

    /// Walk back from the live end until the first message is cached
    ///
    /// Returns whether the whole history fit in the page budget.
    async fn fetch_everything(&self) -> Result<bool, DomainError> {
        for _ in 0..self.inactive_max_pages {
            let query = match self.store.span_containing(self.channel_id, Snowflake::MAX) {
                None => HistoryQuery::latest(self.fetch_limit),
                Some((lo, _)) if lo == Snowflake::MIN => return Ok(true),
                Some((lo, _)) => HistoryQuery::before(lo, self.fetch_limit),
            };
            self.fetch(query).await?;
        }
        Ok(self.store.is_fully_covered(self.channel_id))
    }

    async fn fetch(&self, query: HistoryQuery) -> Result<usize, DomainError> {
        let messages = self
            .history
            .fetch_history(self.channel_id, query)
            .await?;
        let ids: Vec<Snowflake> = messages.iter().map(|m| m.id).collect();
        let span = covered_span(query, &ids);
        let added = self.store.merge_history(self.channel_id, messages, span)?;

        debug!(
            channel_id = %self.channel_id,
            anchor = ?query.anchor,
            fetched = ids.len(),
            added,
            "merged history page"
        );
        Ok(ids.len())
    }
}

/// Resets a channel to `Unknown` unless the backfill settles it
///
/// Covers error returns and panics alike, so a channel is never left in
/// `Backfilling`.
struct BackfillGuard<'a> {
    store: &'a ChannelStore,
    channel_id: Snowflake,
    armed: bool,
}

impl BackfillGuard<'_> {
    fn settle(mut self, state: BackfillState) {
        self.armed = false;
        if !self
            .store
            .transition(self.channel_id, BackfillState::Backfilling, state)
        {
            debug!(channel_id = %self.channel_id, "channel discarded during backfill");
        }
    }
}

impl Drop for BackfillGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store
                .transition(self.channel_id, BackfillState::Backfilling, BackfillState::Unknown);
        }
    }
}
