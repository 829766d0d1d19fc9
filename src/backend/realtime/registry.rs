/**
 * Subscriber Registry
 *
 * Shared, internally synchronized index of who listens where:
 *
 * - `channels`    destination -> `broadcast::Sender`, one ring per destination
 * - `connections` connection id -> bound principal and its subscriptions
 * - `sessions`    principal -> live connection ids
 *
 * All three are sharded `DashMap`s, so publishers on different destinations
 * and connections opening or closing do not contend on a single lock.
 *
 * # Ordering
 *
 * Each destination has exactly one broadcast ring. Every subscriber of that
 * destination observes events in the order the ring accepted them.
 *
 * # Delivery Semantics
 *
 * At-most-once with no replay: an event published while nobody listens is
 * dropped, and a subscription only sees events published after it was made.
 * A receiver that falls more than `capacity` events behind skips the
 * overwritten ones.
 */

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::{BroadcastEvent, Destination, UserId};

/// Identity of one live connection
pub type ConnectionId = Uuid;

/// An event as carried on a destination ring
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Registry-wide sequence number
    pub seq: u64,
    pub destination: Destination,
    pub event: BroadcastEvent,
}

impl Delivery {
    /// Value of the MESSAGE frame's `message-id` header
    pub fn message_id(&self) -> String {
        format!("{}-{}", self.destination, self.seq)
    }
}

/// Result of handing an event to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted for this many live subscriptions
    Delivered(usize),
    /// Nobody was listening; the event was dropped
    Miss,
}

#[derive(Debug, Default)]
struct ConnectionEntry {
    principal: Option<UserId>,
    subscriptions: HashMap<String, Destination>,
}

/// Destination and principal index shared by every connection
pub struct SubscriberRegistry {
    channels: DashMap<Destination, broadcast::Sender<Arc<Delivery>>>,
    connections: DashMap<ConnectionId, ConnectionEntry>,
    sessions: DashMap<UserId, HashSet<ConnectionId>>,
    capacity: usize,
    sequence: AtomicU64,
}

impl SubscriberRegistry {
    /// Create a registry whose rings hold `capacity` events each
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            connections: DashMap::new(),
            sessions: DashMap::new(),
            capacity: capacity.max(1),
            sequence: AtomicU64::new(1),
        }
    }

    /// Record a new, not yet authenticated connection
    pub fn register(&self, connection: ConnectionId) {
        self.connections.insert(connection, ConnectionEntry::default());
        tracing::debug!("[Realtime] Connection {} registered", connection);
    }

    /// Bind a connection to its authenticated principal
    pub fn bind(&self, connection: ConnectionId, user_id: UserId) {
        if let Some(mut entry) = self.connections.get_mut(&connection) {
            entry.principal = Some(user_id);
        }
        self.sessions.entry(user_id).or_default().insert(connection);
        tracing::debug!("[Realtime] Connection {} bound to user {}", connection, user_id);
    }

    /// Subscribe a connection to a destination
    ///
    /// # Returns
    /// The receiving end of the destination's ring, positioned after every
    /// event already published.
    pub fn subscribe(
        &self,
        connection: ConnectionId,
        subscription_id: &str,
        destination: Destination,
    ) -> broadcast::Receiver<Arc<Delivery>> {
        let rx = self
            .channels
            .entry(destination)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        if let Some(mut entry) = self.connections.get_mut(&connection) {
            entry
                .subscriptions
                .insert(subscription_id.to_string(), destination);
        }
        rx
    }

    /// Remove a connection from every index
    ///
    /// Callers drop the connection's receivers before calling this.
    pub fn unregister(&self, connection: ConnectionId) {
        let Some((_, entry)) = self.connections.remove(&connection) else {
            return;
        };

        if let Some(user_id) = entry.principal {
            let now_empty = match self.sessions.get_mut(&user_id) {
                Some(mut live) => {
                    live.remove(&connection);
                    live.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.sessions.remove_if(&user_id, |_, live| live.is_empty());
            }
        }

        tracing::debug!(
            "[Realtime] Connection {} unregistered ({} subscriptions)",
            connection,
            entry.subscriptions.len()
        );
    }

    /// Hand an event to its destination's ring
    pub fn publish(&self, destination: Destination, event: BroadcastEvent) -> DeliveryOutcome {
        let Some(tx) = self.channels.get(&destination).map(|tx| tx.value().clone()) else {
            return DeliveryOutcome::Miss;
        };

        let delivery = Arc::new(Delivery {
            seq: self.sequence.fetch_add(1, Ordering::Relaxed),
            destination,
            event,
        });

        match tx.send(delivery) {
            Ok(count) => DeliveryOutcome::Delivered(count),
            Err(_) => DeliveryOutcome::Miss,
        }
    }

    /// Number of live connections bound to a principal
    pub fn live_sessions(&self, user_id: UserId) -> usize {
        self.sessions.get(&user_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of live subscriptions on a destination
    pub fn subscriber_count(&self, destination: &Destination) -> usize {
        self.channels
            .get(destination)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Destinations of a connection's subscriptions, keyed by subscription id
    pub fn subscriptions_of(&self, connection: ConnectionId) -> HashMap<String, Destination> {
        self.connections
            .get(&connection)
            .map(|entry| entry.subscriptions.clone())
            .unwrap_or_default()
    }

    /// Number of destination rings currently allocated
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Drop rings nobody listens to
    ///
    /// # Returns
    /// Number of rings removed
    pub fn prune_idle_channels(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, tx| tx.receiver_count() > 0);
        let removed = before.saturating_sub(self.channels.len());
        if removed > 0 {
            tracing::debug!("[Realtime] Pruned {} idle channels", removed);
        }
        removed
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(room: i64, text: &str) -> BroadcastEvent {
        BroadcastEvent::chat(room, serde_json::json!({ "content": text }))
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_miss() {
        let registry = SubscriberRegistry::new(8);
        assert_eq!(
            registry.publish(Destination::Room(1), chat(1, "lost")),
            DeliveryOutcome::Miss
        );
    }

    #[tokio::test]
    async fn test_room_isolation_and_order() {
        let registry = SubscriberRegistry::new(8);
        let conn = Uuid::new_v4();
        registry.register(conn);
        let mut room1 = registry.subscribe(conn, "s1", Destination::Room(1));
        let mut room2 = registry.subscribe(conn, "s2", Destination::Room(2));

        for i in 0..3 {
            registry.publish(Destination::Room(1), chat(1, &format!("m{}", i)));
        }
        registry.publish(Destination::Room(2), chat(2, "other"));

        for i in 0..3 {
            let delivery = room1.recv().await.unwrap();
            assert_eq!(delivery.event.payload["content"], format!("m{}", i));
        }
        assert_eq!(room2.recv().await.unwrap().event.payload["content"], "other");
        assert!(room1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let registry = SubscriberRegistry::new(8);
        let conn = Uuid::new_v4();
        registry.register(conn);
        let _early = registry.subscribe(conn, "early", Destination::DashboardStats);
        registry.publish(Destination::DashboardStats, BroadcastEvent::stats(serde_json::json!({})));

        let mut late = registry.subscribe(conn, "late", Destination::DashboardStats);
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_session_index_tracks_bind_and_unregister() {
        let registry = SubscriberRegistry::new(8);
        let tab1 = Uuid::new_v4();
        let tab2 = Uuid::new_v4();
        registry.register(tab1);
        registry.register(tab2);
        registry.bind(tab1, 5);
        registry.bind(tab2, 5);
        assert_eq!(registry.live_sessions(5), 2);

        registry.unregister(tab1);
        assert_eq!(registry.live_sessions(5), 1);
        registry.unregister(tab2);
        assert_eq!(registry.live_sessions(5), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_prune_idle_channels() {
        let registry = SubscriberRegistry::new(8);
        let conn = Uuid::new_v4();
        registry.register(conn);
        let rx = registry.subscribe(conn, "s", Destination::Room(9));
        assert_eq!(registry.prune_idle_channels(), 0);

        drop(rx);
        assert_eq!(registry.prune_idle_channels(), 1);
        assert_eq!(registry.channel_count(), 0);
    }
}
