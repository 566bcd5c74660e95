/// Live listener connection manager
///
/// Keeps the set of open push streams and fans completion events out to all
/// of them. Delivery is at-most-once: no backlog for late joiners, no retry,
/// and a listener whose buffer is full or closed is dropped on the spot.
use super::StreamMessage;
use crate::metrics;
use crate::models::CompletionEvent;
use futures::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Type alias for a listener's frame sender
pub type StreamSender = mpsc::Sender<StreamMessage>;

/// Manages active push-stream connections
///
/// Thread-safe connection manager using Arc<RwLock<>> for shared state.
/// Publishing only takes the read lock; membership changes take the write lock.
#[derive(Clone)]
pub struct ConnectionManager {
    /// Map of connection_id -> frame sender
    connections: Arc<RwLock<HashMap<Uuid, StreamSender>>>,
    /// Frames a listener may have queued before it counts as disconnected
    buffer: usize,
}

/// One open push stream, owned by the HTTP response that serves it.
///
/// Dropping the listener (client went away) removes it from the manager.
pub struct Listener {
    id: Uuid,
    receiver: mpsc::Receiver<StreamMessage>,
    manager: ConnectionManager,
}

impl Listener {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next frame; `None` once the manager dropped this listener
    pub async fn recv(&mut self) -> Option<StreamMessage> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of `recv`
    pub fn try_recv(&mut self) -> Option<StreamMessage> {
        self.receiver.try_recv().ok()
    }

    /// Frames as a stream, for streaming HTTP bodies
    pub fn into_stream(self) -> impl Stream<Item = StreamMessage> {
        futures::stream::unfold(self, |mut listener| async move {
            let msg = listener.recv().await?;
            Some((msg, listener))
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        // Outside a runtime the next publish or heartbeat prunes the closed sender.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let manager = self.manager.clone();
            let id = self.id;
            handle.spawn(async move {
                manager.unsubscribe(id).await;
            });
        }
    }
}

impl ConnectionManager {
    /// Create a new ConnectionManager
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    /// Register a new listener
    pub async fn subscribe(&self) -> Listener {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();

        let total = {
            let mut connections = self.connections.write().await;
            connections.insert(id, sender);
            connections.len()
        };
        metrics::set_stream_listeners(total);
        debug!(connection_id = %id, total, "Listener connected");

        Listener {
            id,
            receiver,
            manager: self.clone(),
        }
    }

    /// Remove a listener; returns whether it was still registered
    pub async fn unsubscribe(&self, id: Uuid) -> bool {
        let (removed, total) = {
            let mut connections = self.connections.write().await;
            let removed = connections.remove(&id).is_some();
            (removed, connections.len())
        };

        if removed {
            metrics::set_stream_listeners(total);
            debug!(connection_id = %id, total, "Listener disconnected");
        }
        removed
    }

    /// Announce a stored thumbnail to every connected listener
    ///
    /// Returns the number of listeners the event was handed to. Zero listeners
    /// is not an error.
    pub async fn publish(&self, event: CompletionEvent) -> usize {
        self.broadcast(StreamMessage::completion(event)).await
    }

    /// Broadcast a frame to all connected listeners without waiting on any
    pub async fn broadcast(&self, message: StreamMessage) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        {
            let connections = self.connections.read().await;
            for (id, sender) in connections.iter() {
                match sender.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    // Full or closed: treat as disconnected
                    Err(_) => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            self.remove_all(&dead).await;
        }

        delivered
    }

    /// Send a keep-alive to all listeners, pruning the ones that are gone
    pub async fn ping_all(&self) -> usize {
        self.broadcast(StreamMessage::ping()).await
    }

    async fn remove_all(&self, ids: &[Uuid]) {
        let total = {
            let mut connections = self.connections.write().await;
            for id in ids {
                connections.remove(id);
            }
            connections.len()
        };
        metrics::set_stream_listeners(total);
        debug!(dropped = ids.len(), total, "Dropped unreachable listeners");
    }

    /// Get the total number of active connections
    pub async fn total_connections(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Clear all connections (graceful shutdown)
    pub async fn clear_all(&self) {
        self.connections.write().await.clear();
        metrics::set_stream_listeners(0);
    }

    /// Periodically ping every listener until `shutdown` flips to true
    pub fn spawn_heartbeat(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Heartbeat stopping");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let reached = manager.ping_all().await;
                        debug!(reached, "Heartbeat sent");
                    }
                }
            }
        })
    }
}
