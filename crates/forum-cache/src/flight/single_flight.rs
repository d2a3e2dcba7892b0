//! Keyed single-flight
//!
//! At most one operation per key runs at a time. Callers that arrive while an
//! operation is outstanding await the same shared result instead of starting
//! their own. The operation body runs on its own task, so dropping a waiting
//! caller never cancels it, and the body clears its marker when it finishes
//! (including by panic).

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use forum_core::DomainError;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tracing::trace;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, DomainError>>>;

struct Flight<T> {
    id: u64,
    result: SharedResult<T>,
}

/// Coalesces concurrent operations on the same key
pub struct SingleFlight<K, T> {
    flights: Arc<DashMap<K, Flight<T>>>,
    next_id: AtomicU64,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Check whether an operation for `key` is outstanding
    pub fn in_flight(&self, key: &K) -> bool {
        self.flights.contains_key(key)
    }

    /// Number of outstanding operations
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Run `operation` for `key`, or join the one already running
    ///
    /// When joining, `operation` is dropped without being polled and the
    /// caller receives the running operation's result. Callers that need a
    /// result for their own inputs should re-check after joining.
    pub async fn run<F>(&self, key: K, operation: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>> + Send + 'static,
    {
        let result = match self.flights.entry(key.clone()) {
            Entry::Occupied(existing) => {
                trace!(flight_id = existing.get().id, "joining outstanding flight");
                existing.get().result.clone()
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel();
                let result = async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(DomainError::InternalError(
                            "coalesced operation ended without a result".to_string(),
                        ))
                    })
                }
                .boxed()
                .shared();
                slot.insert(Flight {
                    id,
                    result: result.clone(),
                });

                let marker = FlightMarker {
                    flights: Arc::clone(&self.flights),
                    key,
                    id,
                };
                tokio::spawn(async move {
                    let outcome = operation.await;
                    drop(marker);
                    let _ = tx.send(outcome);
                });
                result
            }
        };

        result.await
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the flight entry when the operation task ends
struct FlightMarker<K: Eq + Hash, T> {
    flights: Arc<DashMap<K, Flight<T>>>,
    key: K,
    id: u64,
}

impl<K: Eq + Hash, T> Drop for FlightMarker<K, T> {
    fn drop(&mut self) {
        // A newer flight may already own the key if this one was forgotten.
        self.flights.remove_if(&self.key, |_, flight| flight.id == self.id);
    }
}
