//! Channel store - ordered, deduplicated messages per channel
//!
//! Each channel entry sits behind its own mutex inside a `DashMap`, so work on
//! one channel never blocks another. Locks are held only for in-memory work;
//! nothing here awaits or touches the network.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use forum_core::{DomainError, Message, Snowflake};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::coverage::Coverage;

/// Backfill lifecycle of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillState {
    /// Nothing is known about the channel's history
    #[default]
    Unknown,
    /// The first history fetch is in progress
    Backfilling,
    /// Live channel; gaps are filled on demand
    Complete,
    /// Archived or locked channel with its full history cached; never fetched again
    Inactive,
}

/// Paging direction relative to a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Older messages, ending just before the cursor
    Before,
    /// Newer messages, starting just after the cursor
    After,
}

impl Direction {
    /// The first ID a page in this direction may contain
    ///
    /// Without a cursor, `After` starts at the oldest message and `Before` at
    /// the newest.
    pub fn anchor(self, cursor: Option<Snowflake>) -> Snowflake {
        match (self, cursor) {
            (Self::After, Some(cursor)) => cursor.next(),
            (Self::After, None) => Snowflake::MIN,
            (Self::Before, Some(cursor)) => cursor.prev(),
            (Self::Before, None) => Snowflake::MAX,
        }
    }
}

/// A contiguous slice of a channel, always in ascending ID order
#[derive(Debug, Clone, Default)]
pub struct Window {
    pub messages: Vec<Message>,
    pub has_before: bool,
    pub has_after: bool,
    /// Whether the read was clamped to a covered span
    pub covered: bool,
}

/// Per-channel cache entry
#[derive(Debug)]
struct ChannelEntry {
    messages: BTreeMap<Snowflake, Message>,
    /// Deleted IDs; a history page fetched before the delete must not restore them
    deleted: BTreeSet<Snowflake>,
    coverage: Coverage,
    state: BackfillState,
    last_activity_at: DateTime<Utc>,
}

impl ChannelEntry {
    fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
            deleted: BTreeSet::new(),
            coverage: Coverage::new(),
            state: BackfillState::Unknown,
            last_activity_at: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_activity_at).to_std().unwrap_or_default()
    }

    fn is_covered(&self, anchor: Snowflake, direction: Direction, limit: usize) -> bool {
        let Some((lo, hi)) = self.coverage.span_containing(anchor) else {
            return false;
        };
        // One extra message decides has_before/has_after exactly.
        let wanted = limit.saturating_add(1);
        match direction {
            Direction::After => {
                hi == Snowflake::MAX || self.messages.range(anchor..=hi).take(wanted).count() >= wanted
            }
            Direction::Before => {
                lo == Snowflake::MIN
                    || self.messages.range(lo..=anchor).rev().take(wanted).count() >= wanted
            }
        }
    }

    fn window(&self, anchor: Snowflake, direction: Direction, limit: usize) -> Window {
        let (covered, (lo, hi)) = match self.coverage.span_containing(anchor) {
            Some(span) => (true, span),
            None => (false, (Snowflake::MIN, Snowflake::MAX)),
        };

        let messages: Vec<Message> = match direction {
            Direction::After if anchor <= hi => self
                .messages
                .range(anchor..=hi)
                .take(limit)
                .map(|(_, m)| m.clone())
                .collect(),
            Direction::Before if lo <= anchor => {
                let mut page: Vec<Message> = self
                    .messages
                    .range(lo..=anchor)
                    .rev()
                    .take(limit)
                    .map(|(_, m)| m.clone())
                    .collect();
                page.reverse();
                page
            }
            _ => Vec::new(),
        };

        // An empty page is bounded by the anchor itself.
        let (first, last) = match (messages.first(), messages.last()) {
            (Some(first), Some(last)) => (first.id, last.id),
            _ => match direction {
                Direction::After => (anchor, anchor.prev()),
                Direction::Before => (anchor.next(), anchor),
            },
        };

        let before_cached = first > lo && self.messages.range(lo..first).next_back().is_some();
        let after_cached = last < hi && self.messages.range(last.next()..=hi).next().is_some();
        let (edge_before, edge_after) = if covered {
            (lo > Snowflake::MIN, hi < Snowflake::MAX)
        } else {
            (false, false)
        };

        Window {
            messages,
            has_before: before_cached || edge_before,
            has_after: after_cached || edge_after,
            covered,
        }
    }
}

/// Verify the ordering and ownership guarantees of a window
fn verify_window(channel_id: Snowflake, window: &Window) -> Result<(), DomainError> {
    if let Some(stray) = window.messages.iter().find(|m| m.channel_id != channel_id) {
        return Err(DomainError::invariant(
            channel_id,
            format!("message {} belongs to channel {}", stray.id, stray.channel_id),
        ));
    }
    if let Some(pair) = window.messages.windows(2).find(|pair| pair[0].id >= pair[1].id) {
        return Err(DomainError::invariant(
            channel_id,
            format!("window out of order at {} -> {}", pair[0].id, pair[1].id),
        ));
    }
    Ok(())
}

/// Process-wide message store
#[derive(Default)]
pub struct ChannelStore {
    channels: DashMap<Snowflake, Arc<Mutex<ChannelEntry>>>,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a channel, creating it if needed
    ///
    /// The map guard is released before the entry is locked.
    fn entry(&self, channel_id: Snowflake) -> Arc<Mutex<ChannelEntry>> {
        self.channels
            .entry(channel_id)
            .or_insert_with(|| Arc::new(Mutex::new(ChannelEntry::new())))
            .value()
            .clone()
    }

    fn existing(&self, channel_id: Snowflake) -> Option<Arc<Mutex<ChannelEntry>>> {
        self.channels.get(&channel_id).map(|e| e.value().clone())
    }

    // ========================================================================
    // Event-driven mutation
    // ========================================================================

    /// Insert or replace a message by ID
    ///
    /// `mark_edited` sets the edited marker for display. A late update for a
    /// deleted message is dropped.
    pub fn upsert(&self, mut message: Message, mark_edited: bool) {
        if mark_edited {
            message.mark_edited();
        }
        let entry = self.entry(message.channel_id);
        let mut entry = entry.lock();
        if entry.deleted.contains(&message.id) {
            debug!(message_id = %message.id, "ignoring event for deleted message");
            return;
        }
        entry.messages.insert(message.id, message);
    }

    /// Remove a message, returning whether it was cached
    ///
    /// The ID is remembered even when the message was not cached yet, so a
    /// history page already in flight cannot bring it back.
    pub fn remove(&self, channel_id: Snowflake, message_id: Snowflake) -> bool {
        self.existing(channel_id).is_some_and(|entry| {
            let mut entry = entry.lock();
            entry.deleted.insert(message_id);
            entry.messages.remove(&message_id).is_some()
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Up to `limit` messages strictly before or after `cursor`
    ///
    /// Without a cursor the page starts at the oldest (`After`) or ends at the
    /// newest (`Before`) message. The read never crosses an unknown gap: it
    /// stays inside the covered span containing its anchor, and a span edge
    /// that is not the channel boundary reports that more may exist.
    ///
    /// # Errors
    /// Returns `DomainError::Invariant` if the cached slice is not strictly
    /// ascending or contains another channel's message.
    pub fn window(
        &self,
        channel_id: Snowflake,
        cursor: Option<Snowflake>,
        direction: Direction,
        limit: usize,
    ) -> Result<Window, DomainError> {
        let Some(entry) = self.existing(channel_id) else {
            return Ok(Window::default());
        };

        let window = {
            let mut entry = entry.lock();
            entry.touch();
            entry.window(direction.anchor(cursor), direction, limit)
        };
        verify_window(channel_id, &window)?;
        Ok(window)
    }

    /// Check whether a window can be served without fetching
    pub fn is_covered(
        &self,
        channel_id: Snowflake,
        cursor: Option<Snowflake>,
        direction: Direction,
        limit: usize,
    ) -> bool {
        self.existing(channel_id).is_some_and(|entry| {
            entry
                .lock()
                .is_covered(direction.anchor(cursor), direction, limit)
        })
    }

    /// The covered span containing `id`
    pub fn span_containing(
        &self,
        channel_id: Snowflake,
        id: Snowflake,
    ) -> Option<(Snowflake, Snowflake)> {
        self.existing(channel_id)
            .and_then(|entry| entry.lock().coverage.span_containing(id))
    }

    /// Check whether the channel is cached from its first message to the live end
    pub fn is_fully_covered(&self, channel_id: Snowflake) -> bool {
        self.existing(channel_id)
            .is_some_and(|entry| entry.lock().coverage.is_complete())
    }

    /// Number of cached messages in a channel
    pub fn message_count(&self, channel_id: Snowflake) -> usize {
        self.existing(channel_id)
            .map_or(0, |entry| entry.lock().messages.len())
    }

    /// Cached message IDs in ascending order
    pub fn message_ids(&self, channel_id: Snowflake) -> Vec<Snowflake> {
        self.existing(channel_id)
            .map(|entry| entry.lock().messages.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Get a single cached message
    pub fn message(&self, channel_id: Snowflake, message_id: Snowflake) -> Option<Message> {
        self.existing(channel_id)
            .and_then(|entry| entry.lock().messages.get(&message_id).cloned())
    }

    /// Number of channels with an entry
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    // ========================================================================
    // Backfill support
    // ========================================================================

    /// Merge a history response and record the span it proves complete
    ///
    /// Returns the number of messages that were not cached before.
    ///
    /// # Errors
    /// Returns `DomainError::Invariant` (and merges nothing) if a message
    /// belongs to another channel or lies outside `span`.
    pub fn merge_history(
        &self,
        channel_id: Snowflake,
        messages: Vec<Message>,
        span: (Snowflake, Snowflake),
    ) -> Result<usize, DomainError> {
        let (lo, hi) = span;
        if let Some(stray) = messages.iter().find(|m| m.channel_id != channel_id) {
            return Err(DomainError::invariant(
                channel_id,
                format!("history returned message {} of channel {}", stray.id, stray.channel_id),
            ));
        }
        if let Some(outside) = messages.iter().find(|m| m.id < lo || m.id > hi) {
            return Err(DomainError::invariant(
                channel_id,
                format!("history returned message {} outside [{lo}, {hi}]", outside.id),
            ));
        }

        let entry = self.entry(channel_id);
        let mut entry = entry.lock();
        let mut added = 0;
        for message in messages {
            if entry.deleted.contains(&message.id) {
                continue;
            }
            // Live events may already hold a newer copy of this message.
            if let std::collections::btree_map::Entry::Vacant(slot) =
                entry.messages.entry(message.id)
            {
                slot.insert(message);
                added += 1;
            }
        }
        entry.coverage.insert(lo, hi);
        entry.touch();
        Ok(added)
    }

    /// Current backfill state (`Unknown` for channels without an entry)
    pub fn state(&self, channel_id: Snowflake) -> BackfillState {
        self.existing(channel_id)
            .map_or(BackfillState::Unknown, |entry| entry.lock().state)
    }

    pub(crate) fn set_state(&self, channel_id: Snowflake, state: BackfillState) {
        self.entry(channel_id).lock().state = state;
    }

    /// Move from `from` to `to`, returning false if the state changed meanwhile
    pub(crate) fn transition(
        &self,
        channel_id: Snowflake,
        from: BackfillState,
        to: BackfillState,
    ) -> bool {
        let Some(entry) = self.existing(channel_id) else {
            return false;
        };
        let mut entry = entry.lock();
        if entry.state == from {
            entry.state = to;
            true
        } else {
            false
        }
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Drop everything cached for a channel; its state returns to `Unknown`
    pub fn discard(&self, channel_id: Snowflake) {
        if self.channels.remove(&channel_id).is_some() {
            warn!(channel_id = %channel_id, "discarded channel cache");
        }
    }

    /// Drop live channels not read for longer than `max_idle`
    ///
    /// Inactive channels are kept because they are never fetched again, and
    /// channels mid-backfill are left to finish. Returns the evicted channels.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<Snowflake> {
        let now = Utc::now();
        let evicted = self.drop_where(|entry| {
            !matches!(
                entry.state,
                BackfillState::Inactive | BackfillState::Backfilling
            ) && entry.idle_for(now) >= max_idle
        });
        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), "evicted idle channels");
        }
        evicted
    }

    /// Drop every channel that can still receive messages
    ///
    /// Used when live events were lost and gap-freedom no longer holds.
    /// Returns the dropped channels.
    pub fn invalidate_live(&self) -> Vec<Snowflake> {
        let dropped = self.drop_where(|entry| entry.state != BackfillState::Inactive);
        warn!(dropped = dropped.len(), "invalidated live channel caches");
        dropped
    }

    fn drop_where(&self, mut drop: impl FnMut(&ChannelEntry) -> bool) -> Vec<Snowflake> {
        let mut dropped = Vec::new();
        self.channels.retain(|channel_id, entry| {
            let keep = !drop(&entry.lock());
            if !keep {
                dropped.push(*channel_id);
            }
            keep
        });
        dropped
    }
}
