//! Pagination engine
//!
//! Turns a cursor request into an ordered page: the backfill controller makes
//! the window available, the store slices it.

use forum_cache::{BackfillState, Direction, Window};
use forum_core::{DomainError, Message, Snowflake};
use tracing::{debug, error, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// One page of messages in ascending ID order
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub messages: Vec<Message>,
    pub has_before: bool,
    pub has_after: bool,
}

impl Page {
    /// Cursor for the previous (older) page
    pub fn prev_cursor(&self) -> Option<Snowflake> {
        self.has_before
            .then(|| self.messages.first().map(|m| m.id))
            .flatten()
    }

    /// Cursor for the next (newer) page
    pub fn next_cursor(&self) -> Option<Snowflake> {
        self.has_after
            .then(|| self.messages.last().map(|m| m.id))
            .flatten()
    }
}

impl From<Window> for Page {
    fn from(window: Window) -> Self {
        Self {
            messages: window.messages,
            has_before: window.has_before,
            has_after: window.has_after,
        }
    }
}

/// Cursor pagination over cached channels
pub struct PaginationEngine<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PaginationEngine<'a> {
    /// Create a new PaginationEngine
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Up to `limit` messages strictly before or after `cursor`
    ///
    /// `limit` is clamped to `1..=max_page_size`. A cache consistency fault
    /// discards the channel and rebuilds the page once from scratch.
    #[instrument(skip(self, channel_id), fields(channel_id = %channel_id))]
    pub async fn page(
        &self,
        channel_id: Snowflake,
        cursor: Option<Snowflake>,
        direction: Direction,
        limit: usize,
    ) -> ServiceResult<Page> {
        let limit = limit.clamp(1, self.ctx.config().max_page_size.max(1));

        match self.build(channel_id, cursor, direction, limit).await {
            Err(e) if e.is_invariant() => {
                error!(error = %e, "cache invariant violated, rebuilding channel");
                self.ctx.store().discard(channel_id);
                self.ctx.members().forget_channel(channel_id);
                Ok(self.build(channel_id, cursor, direction, limit).await?)
            }
            result => Ok(result?),
        }
    }

    async fn build(
        &self,
        channel_id: Snowflake,
        cursor: Option<Snowflake>,
        direction: Direction,
        limit: usize,
    ) -> Result<Page, DomainError> {
        let mut window = self.fill(channel_id, cursor, direction, limit).await?;
        if dropped_before_read(&window, self.ctx.store().state(channel_id)) {
            debug!("channel dropped between backfill and read, filling again");
            window = self.fill(channel_id, cursor, direction, limit).await?;
        }
        Ok(Page::from(window))
    }

    async fn fill(
        &self,
        channel_id: Snowflake,
        cursor: Option<Snowflake>,
        direction: Direction,
        limit: usize,
    ) -> Result<Window, DomainError> {
        self.ctx
            .backfill()
            .ensure_window(channel_id, cursor, direction, limit)
            .await?;
        self.ctx
            .store()
            .window(channel_id, cursor, direction, limit)
    }
}

/// A filled window always reads covered; an uncovered read of an `Unknown`
/// channel means eviction or invalidation removed it in between
fn dropped_before_read(window: &Window, state: BackfillState) -> bool {
    !window.covered && state == BackfillState::Unknown
}
