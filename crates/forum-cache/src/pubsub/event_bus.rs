//! Gateway event bus.
//!
//! A broadcast channel fans events out to every registered handler. Each
//! registration owns a listener task and a control channel used to stop it.

use std::sync::Arc;

use forum_core::GatewayEvent;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Receives events from the bus on a dedicated listener task
///
/// Handlers must not block: they run inline on the listener loop.
pub trait EventHandler: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Handle one event
    fn handle(&self, event: &GatewayEvent);

    /// Called when the listener fell behind and `skipped` events were dropped
    fn lagged(&self, skipped: u64) {
        tracing::warn!(handler = self.name(), skipped, "Event handler lagged");
    }
}

/// Process-wide gateway event bus
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning how many subscribers will see it
    pub fn publish(&self, event: GatewayEvent) -> usize {
        tracing::trace!(event_type = event.event_type(), channel_id = %event.channel_id(), "Publishing event");
        // No subscribers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    /// Raw receiver for consumers that drive their own loop
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Register a handler and start its listener
    ///
    /// Events published after this call returns are delivered to the handler.
    pub fn register<H: EventHandler>(&self, handler: Arc<H>) -> Subscription {
        let receiver = self.sender.subscribe();
        let (control_tx, control_rx) = mpsc::channel(1);
        let name = handler.name();
        let task = tokio::spawn(Self::listener_loop(handler, receiver, control_rx));
        tracing::info!(handler = name, "Event handler registered");

        Subscription {
            name,
            control_tx,
            task,
        }
    }

    /// Background listener loop
    async fn listener_loop<H: EventHandler>(
        handler: Arc<H>,
        mut receiver: broadcast::Receiver<GatewayEvent>,
        mut control_rx: mpsc::Receiver<ListenerCommand>,
    ) {
        loop {
            tokio::select! {
                biased;

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(ListenerCommand::Shutdown) | None => {
                            tracing::info!(handler = handler.name(), "Event handler shutting down");
                            break;
                        }
                    }
                }
                received = receiver.recv() => {
                    match received {
                        Ok(event) => handler.handle(&event),
                        Err(RecvError::Lagged(skipped)) => handler.lagged(skipped),
                        Err(RecvError::Closed) => {
                            tracing::warn!(handler = handler.name(), "Event bus closed");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Commands for a listener task
#[derive(Debug)]
enum ListenerCommand {
    Shutdown,
}

/// A registered handler; dropping it without `unsubscribe` detaches the listener
pub struct Subscription {
    name: &'static str,
    control_tx: mpsc::Sender<ListenerCommand>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether the listener task is still running
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the listener and wait for it to exit
    pub async fn unsubscribe(self) {
        // A closed channel means the listener already stopped
        let _ = self.control_tx.send(ListenerCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::error!(handler = self.name, error = %e, "Event listener task failed");
        }
    }
}
