//! Service context - dependency container for services
//!
//! Holds the cache components and upstream ports needed by services.

use std::sync::Arc;

use forum_cache::{BackfillConfig, BackfillController, ChannelStore, EventBus, MemberResolver};
use forum_common::CacheConfig;
use forum_core::traits::{ChannelDirectory, HistoryClient, MemberClient};
use tokio::time::Instant;

use super::error::{ServiceError, ServiceResult};
use super::eviction::{EvictionHandle, IdleEviction};
use super::ingest::{EventIngest, IngestHandle};
use super::pagination::PaginationEngine;

/// Service context containing all dependencies
///
/// Cloning is cheap; every component is shared.
#[derive(Clone)]
pub struct ServiceContext {
    config: CacheConfig,

    // Cache
    store: Arc<ChannelStore>,
    backfill: Arc<BackfillController>,
    members: Arc<MemberResolver>,

    // Upstream
    directory: Arc<dyn ChannelDirectory>,

    // Events
    event_bus: EventBus,
}

impl ServiceContext {
    /// Create a new service context wiring the cache to its upstream ports
    pub fn new(
        config: CacheConfig,
        history: Arc<dyn HistoryClient>,
        member_client: Arc<dyn MemberClient>,
        directory: Arc<dyn ChannelDirectory>,
    ) -> Self {
        let store = Arc::new(ChannelStore::new());
        let backfill = Arc::new(BackfillController::new(
            Arc::clone(&store),
            history,
            Arc::clone(&directory),
            BackfillConfig::from(&config),
        ));
        let members = Arc::new(
            MemberResolver::new(member_client).with_lookup_timeout(config.member_timeout()),
        );
        let event_bus = EventBus::new(config.event_buffer);

        Self {
            config,
            store,
            backfill,
            members,
            directory,
            event_bus,
        }
    }

    // === Configuration ===

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Deadline for a member lookup started now
    pub fn member_deadline(&self) -> Instant {
        Instant::now() + self.config.member_timeout()
    }

    // === Cache ===

    /// Get the channel message store
    pub fn store(&self) -> &Arc<ChannelStore> {
        &self.store
    }

    /// Get the backfill controller
    pub fn backfill(&self) -> &BackfillController {
        self.backfill.as_ref()
    }

    /// Get the member resolver
    pub fn members(&self) -> &MemberResolver {
        self.members.as_ref()
    }

    /// Pagination over the cache
    pub fn pagination(&self) -> PaginationEngine<'_> {
        PaginationEngine::new(self)
    }

    // === Upstream ===

    /// Get the channel directory
    pub fn directory(&self) -> &dyn ChannelDirectory {
        self.directory.as_ref()
    }

    // === Events ===

    /// Get the gateway event bus; the gateway client publishes here
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // === Background work ===

    /// Start event ingestion and, if configured, idle eviction
    pub fn start_background(&self) -> BackgroundTasks {
        let ingest = EventIngest::start(
            &self.event_bus,
            Arc::clone(&self.store),
            Arc::clone(&self.members),
        );
        let eviction = self.config.idle_eviction().map(|max_idle| {
            IdleEviction::start(Arc::clone(&self.store), Arc::clone(&self.members), max_idle)
        });
        BackgroundTasks { ingest, eviction }
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("config", &self.config)
            .field("cached_channels", &self.store.channel_count())
            .field("event_subscribers", &self.event_bus.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Background tasks started by [`ServiceContext::start_background`]
pub struct BackgroundTasks {
    ingest: IngestHandle,
    eviction: Option<EvictionHandle>,
}

impl BackgroundTasks {
    /// Stop all background tasks and wait for them to exit
    pub async fn shutdown(self) {
        self.ingest.shutdown().await;
        if let Some(eviction) = self.eviction {
            eviction.shutdown().await;
        }
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    config: Option<CacheConfig>,
    history: Option<Arc<dyn HistoryClient>>,
    member_client: Option<Arc<dyn MemberClient>>,
    directory: Option<Arc<dyn ChannelDirectory>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            history: None,
            member_client: None,
            directory: None,
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryClient>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn member_client(mut self, client: Arc<dyn MemberClient>) -> Self {
        self.member_client = Some(client);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn ChannelDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Build the ServiceContext
    ///
    /// The cache configuration defaults when not set.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any upstream port is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.config.unwrap_or_default(),
            self.history
                .ok_or_else(|| ServiceError::validation("history client is required"))?,
            self.member_client
                .ok_or_else(|| ServiceError::validation("member client is required"))?,
            self.directory
                .ok_or_else(|| ServiceError::validation("channel directory is required"))?,
        ))
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
