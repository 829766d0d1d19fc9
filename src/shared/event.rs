/**
 * Broadcast Event Envelope
 *
 * Domain services describe what happened with a `BroadcastEvent`: which
 * logical stream it belongs to, who it is addressed to and a JSON payload.
 * The router turns the address into a concrete destination and fans the
 * event out to whoever is subscribed there at that instant.
 */
use serde::{Deserialize, Serialize};

use super::destination::Destination;
use super::{ProjectId, UserId};

/// Logical stream an event belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Chat message in a project room
    Chat,
    /// Per-user notification
    Notification,
    /// Dashboard statistics
    Stat,
}

/// Addressing mode of an event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "id", rename_all = "snake_case")]
pub enum Address {
    /// Every connection subscribed to the global topic
    Global,
    /// Connections subscribed to one project's room
    Room(ProjectId),
    /// Every live session of one principal that listens on its queue
    User(UserId),
}

impl Address {
    /// Destination the address resolves to
    pub fn destination(&self) -> Destination {
        match *self {
            Address::Global => Destination::DashboardStats,
            Address::Room(id) => Destination::Room(id),
            Address::User(id) => Destination::UserNotifications(id),
        }
    }
}

/// Event handed to the broadcast router
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastEvent {
    /// Stream the event belongs to
    pub channel: Channel,
    /// Who receives it
    pub address: Address,
    /// JSON body delivered to subscribers
    pub payload: serde_json::Value,
    /// RFC3339 time the event was created
    pub timestamp: String,
}

impl BroadcastEvent {
    /// Create a new event stamped with the current time
    pub fn new(channel: Channel, address: Address, payload: serde_json::Value) -> Self {
        Self {
            channel,
            address,
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Chat message for a project room
    pub fn chat(project_id: ProjectId, payload: serde_json::Value) -> Self {
        Self::new(Channel::Chat, Address::Room(project_id), payload)
    }

    /// Notification for a single principal
    pub fn notification(user_id: UserId, payload: serde_json::Value) -> Self {
        Self::new(Channel::Notification, Address::User(user_id), payload)
    }

    /// Dashboard statistics for every subscriber of the global topic
    pub fn stats(payload: serde_json::Value) -> Self {
        Self::new(Channel::Stat, Address::Global, payload)
    }

    /// Destination this event is delivered on
    pub fn destination(&self) -> Destination {
        self.address.destination()
    }

    /// Serialized body of the MESSAGE frame
    pub fn body(&self) -> String {
        self.payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_pick_address() {
        let chat = BroadcastEvent::chat(4, serde_json::json!({"content": "hi"}));
        assert_eq!(chat.channel, Channel::Chat);
        assert_eq!(chat.destination(), Destination::Room(4));

        let note = BroadcastEvent::notification(9, serde_json::json!({"message": "m"}));
        assert_eq!(note.channel, Channel::Notification);
        assert_eq!(note.destination(), Destination::UserNotifications(9));

        let stats = BroadcastEvent::stats(serde_json::json!({"users": 1}));
        assert_eq!(stats.channel, Channel::Stat);
        assert_eq!(stats.destination(), Destination::DashboardStats);
    }

    #[test]
    fn test_body_is_payload_json() {
        let event = BroadcastEvent::chat(1, serde_json::json!({"content": "hello"}));
        assert_eq!(event.body(), r#"{"content":"hello"}"#);
        assert!(!event.timestamp.is_empty());
    }

    #[test]
    fn test_address_serialization() {
        let json = serde_json::to_value(Address::Room(3)).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "room", "id": 3}));
        let json = serde_json::to_value(Address::Global).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "global"}));
    }
}
