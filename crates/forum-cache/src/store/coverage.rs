//! Coverage index - which ID ranges of a channel are known to be complete
//!
//! A span `[lo, hi]` (inclusive) means every message the platform holds with
//! an ID in that range is present in the cache. `Snowflake::MIN` as a lower
//! bound means "from the first message"; `Snowflake::MAX` as an upper bound
//! means "up to the live end", kept current by gateway events.

use std::collections::BTreeMap;

use forum_core::{HistoryAnchor, HistoryQuery, Snowflake};

/// Disjoint, non-adjacent inclusive ID spans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    spans: BTreeMap<Snowflake, Snowflake>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `[lo, hi]` as complete, merging overlapping or touching spans
    pub fn insert(&mut self, lo: Snowflake, hi: Snowflake) {
        if lo > hi {
            return;
        }

        // Spans are disjoint and sorted, so their ends descend with their starts.
        let absorbed: Vec<Snowflake> = self
            .spans
            .range(..=hi.next())
            .rev()
            .take_while(|(_, &end)| end >= lo.prev())
            .map(|(&start, _)| start)
            .collect();

        let (mut lo, mut hi) = (lo, hi);
        for start in absorbed {
            if let Some(end) = self.spans.remove(&start) {
                lo = lo.min(start);
                hi = hi.max(end);
            }
        }
        self.spans.insert(lo, hi);
    }

    /// The span containing `id`, if any
    pub fn span_containing(&self, id: Snowflake) -> Option<(Snowflake, Snowflake)> {
        self.spans
            .range(..=id)
            .next_back()
            .filter(|(_, &end)| end >= id)
            .map(|(&start, &end)| (start, end))
    }

    /// Check whether the whole channel, first message to live end, is covered
    pub fn is_complete(&self) -> bool {
        self.span_containing(Snowflake::MIN)
            .is_some_and(|(_, hi)| hi == Snowflake::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn spans(&self) -> impl Iterator<Item = (Snowflake, Snowflake)> + '_ {
        self.spans.iter().map(|(&lo, &hi)| (lo, hi))
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }
}

/// The span a history response proves complete
///
/// A short page (fewer than `query.limit` messages) reached the channel
/// boundary in its direction. A full page only covers up to its furthest
/// message.
pub fn covered_span(query: HistoryQuery, ids: &[Snowflake]) -> (Snowflake, Snowflake) {
    let short = ids.len() < query.limit;
    let oldest = ids.iter().copied().min();
    let newest = ids.iter().copied().max();

    match query.anchor {
        HistoryAnchor::Latest => match (short, oldest) {
            (false, Some(oldest)) => (oldest, Snowflake::MAX),
            _ => (Snowflake::MIN, Snowflake::MAX),
        },
        HistoryAnchor::Before(id) => match (short, oldest) {
            (false, Some(oldest)) => (oldest, id.prev()),
            _ => (Snowflake::MIN, id.prev()),
        },
        HistoryAnchor::After(id) => {
            // No message has the zero ID, so the oldest page starts at the boundary.
            let lo = if id == Snowflake::MIN { id } else { id.next() };
            match (short, newest) {
                (false, Some(newest)) => (lo, newest),
                _ => (lo, Snowflake::MAX),
            }
        }
    }
}
