/**
 * Broadcast Router
 *
 * Domain services hand `BroadcastEvent`s to the router; the router resolves
 * the address to a destination and fans the event out through the
 * subscriber registry.
 *
 * # Addressing Modes
 *
 * - **Global** (`stats.dashboard`) - every connection subscribed to the topic
 * - **Room** (`room.<projectId>`) - connections subscribed to that room
 * - **User** (`user.<userId>.notifications`) - every live session of the
 *   principal that subscribed to its queue; each gets its own copy
 *
 * A directed event for a principal with no live session is a
 * `DeliveryOutcome::Miss`. That is not an error: the notification record is
 * persisted before the router is called.
 */

use std::sync::Arc;

use crate::backend::realtime::registry::{DeliveryOutcome, SubscriberRegistry};
use crate::shared::{Address, BroadcastEvent};

/// Fans events out to live subscriptions
#[derive(Clone)]
pub struct BroadcastRouter {
    registry: Arc<SubscriberRegistry>,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Publish an event to whoever listens on its destination right now
    ///
    /// Safe to call concurrently from any number of producers.
    pub fn publish(&self, event: BroadcastEvent) -> DeliveryOutcome {
        let destination = event.destination();

        if let Address::User(user_id) = event.address {
            if self.registry.live_sessions(user_id) == 0 {
                tracing::debug!("[Realtime] No live session for user {}, event dropped", user_id);
                return DeliveryOutcome::Miss;
            }
        }

        let outcome = self.registry.publish(destination, event);
        match outcome {
            DeliveryOutcome::Delivered(count) => {
                tracing::debug!("[Realtime] Event on {} delivered to {} subscribers", destination, count);
            }
            DeliveryOutcome::Miss => {
                tracing::debug!("[Realtime] No subscribers on {}", destination);
            }
        }
        outcome
    }
}
