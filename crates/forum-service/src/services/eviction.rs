//! Idle eviction - periodically drops live channels nobody reads

use std::sync::Arc;
use std::time::Duration;

use forum_cache::{ChannelStore, MemberResolver};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Sweeps shorter than this are not worth the wakeups
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic idle-channel sweeper
pub struct IdleEviction;

impl IdleEviction {
    /// Start sweeping every quarter of `max_idle`
    pub fn start(
        store: Arc<ChannelStore>,
        members: Arc<MemberResolver>,
        max_idle: Duration,
    ) -> EvictionHandle {
        Self::start_with_period(store, members, max_idle, (max_idle / 4).max(MIN_SWEEP_INTERVAL))
    }

    /// Start sweeping every `period`
    ///
    /// Member records referenced only by evicted channels go with them.
    pub fn start_with_period(
        store: Arc<ChannelStore>,
        members: Arc<MemberResolver>,
        max_idle: Duration,
        period: Duration,
    ) -> EvictionHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; nothing can be idle yet
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let evicted = store.evict_idle(max_idle);
                        let released = members.forget_channels(&evicted);
                        debug!(
                            evicted = evicted.len(),
                            released,
                            remaining = store.channel_count(),
                            "idle sweep"
                        );
                    }
                }
            }
            info!("idle eviction stopped");
        });

        EvictionHandle {
            shutdown_tx,
            task,
        }
    }
}

/// Running sweeper; call [`EvictionHandle::shutdown`] to stop it
pub struct EvictionHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl EvictionHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}
