//! Event ingest - keeps the channel store current from gateway events
//!
//! Handlers only mutate the store; they never call the platform.

use std::sync::Arc;

use forum_cache::{ChannelStore, EventBus, EventHandler, MemberResolver, Subscription};
use forum_core::GatewayEvent;
use tracing::{debug, warn};

/// Applies message events to the channel store
pub struct EventIngest {
    store: Arc<ChannelStore>,
    members: Arc<MemberResolver>,
}

impl EventIngest {
    pub fn new(store: Arc<ChannelStore>, members: Arc<MemberResolver>) -> Self {
        Self { store, members }
    }

    /// Register with the bus and start ingesting
    pub fn start(
        bus: &EventBus,
        store: Arc<ChannelStore>,
        members: Arc<MemberResolver>,
    ) -> IngestHandle {
        let subscription = bus.register(Arc::new(Self::new(store, members)));
        IngestHandle { subscription }
    }
}

impl EventHandler for EventIngest {
    fn name(&self) -> &'static str {
        "event-ingest"
    }

    fn handle(&self, event: &GatewayEvent) {
        match event {
            GatewayEvent::MessageCreate(message) => {
                self.store.upsert(message.clone(), false);
            }
            GatewayEvent::MessageUpdate(message) => {
                self.store.upsert(message.clone(), true);
            }
            GatewayEvent::MessageDelete(delete) => {
                if !self.store.remove(delete.channel_id, delete.id) {
                    debug!(message_id = %delete.id, channel_id = %delete.channel_id, "delete for uncached message");
                }
            }
            GatewayEvent::ChannelUpdate(_) => {}
        }
    }

    fn lagged(&self, skipped: u64) {
        // Dropped events may have left gaps in any live channel
        warn!(skipped, "event ingest lagged, invalidating live channels");
        let dropped = self.store.invalidate_live();
        self.members.forget_channels(&dropped);
    }
}

/// Running ingest; call [`IngestHandle::shutdown`] to stop it
pub struct IngestHandle {
    subscription: Subscription,
}

impl IngestHandle {
    pub fn is_running(&self) -> bool {
        self.subscription.is_active()
    }

    /// Unsubscribe and wait for the listener to exit
    pub async fn shutdown(self) {
        self.subscription.unsubscribe().await;
    }
}
