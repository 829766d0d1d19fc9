/**
 * Destination Names
 *
 * Every frame on the multiplexed connection addresses a destination. Three
 * are subscribable streams and two are application endpoints that clients
 * SEND to:
 *
 * - `room.<projectId>`            chat fan-out for one project
 * - `user.<userId>.notifications` directed queue for one principal
 * - `stats.dashboard`             global dashboard statistics
 * - `app.chat.<projectId>.send`   client-to-server chat endpoint
 * - `app.chat.<projectId>.join`   announce joining a room
 */
use std::fmt;
use std::str::FromStr;

use super::error::SharedError;
use super::{ProjectId, UserId};

/// Prefix of client-to-server application destinations
pub const APPLICATION_PREFIX: &str = "app.";

/// Parsed destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// `room.<projectId>`
    Room(ProjectId),
    /// `user.<userId>.notifications`
    UserNotifications(UserId),
    /// `stats.dashboard`
    DashboardStats,
    /// `app.chat.<projectId>.send`
    ChatSend(ProjectId),
    /// `app.chat.<projectId>.join`
    ChatJoin(ProjectId),
}

impl Destination {
    /// Parse a destination string
    ///
    /// Identifiers must be plain decimal numbers; anything else is rejected
    /// so that `room.01` and `room.1` never name two different channels.
    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        let parts: Vec<&str> = raw.split('.').collect();
        let parsed = match parts.as_slice() {
            ["room", id] => parse_id(id).map(Destination::Room),
            ["user", id, "notifications"] => parse_id(id).map(Destination::UserNotifications),
            ["stats", "dashboard"] => Some(Destination::DashboardStats),
            ["app", "chat", id, "send"] => parse_id(id).map(Destination::ChatSend),
            ["app", "chat", id, "join"] => parse_id(id).map(Destination::ChatJoin),
            _ => None,
        };
        parsed.ok_or_else(|| SharedError::destination(raw))
    }

    /// Whether this is a client-to-server application destination
    pub fn is_application(&self) -> bool {
        matches!(self, Destination::ChatSend(_) | Destination::ChatJoin(_))
    }

    /// Whether clients may subscribe to this destination
    pub fn is_subscribable(&self) -> bool {
        !self.is_application()
    }
}

/// Whether a raw destination string carries the application prefix
pub fn has_application_prefix(raw: &str) -> bool {
    raw.starts_with(APPLICATION_PREFIX)
}

fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Room(id) => write!(f, "room.{}", id),
            Destination::UserNotifications(id) => write!(f, "user.{}.notifications", id),
            Destination::DashboardStats => f.write_str("stats.dashboard"),
            Destination::ChatSend(id) => write!(f, "app.chat.{}.send", id),
            Destination::ChatJoin(id) => write!(f, "app.chat.{}.join", id),
        }
    }
}

impl FromStr for Destination {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Destination::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_destinations() {
        assert_eq!(Destination::parse("room.42").unwrap(), Destination::Room(42));
        assert_eq!(
            Destination::parse("user.7.notifications").unwrap(),
            Destination::UserNotifications(7)
        );
        assert_eq!(
            Destination::parse("stats.dashboard").unwrap(),
            Destination::DashboardStats
        );
        assert_eq!(
            Destination::parse("app.chat.3.send").unwrap(),
            Destination::ChatSend(3)
        );
        assert_eq!(
            Destination::parse("app.chat.3.join").unwrap(),
            Destination::ChatJoin(3)
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in [
            "",
            "room",
            "room.",
            "room.abc",
            "room.-1",
            "room.01",
            "room.1.extra",
            "user.1",
            "user.x.notifications",
            "stats",
            "app.chat.1",
            "app.chat.1.leave",
            "topic.room.1",
        ] {
            assert!(Destination::parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_display_matches_parse() {
        for dest in [
            Destination::Room(1),
            Destination::UserNotifications(99),
            Destination::DashboardStats,
            Destination::ChatSend(5),
            Destination::ChatJoin(6),
        ] {
            assert_eq!(dest.to_string().parse::<Destination>().unwrap(), dest);
        }
    }

    #[test]
    fn test_application_prefix() {
        assert!(Destination::ChatSend(1).is_application());
        assert!(!Destination::ChatJoin(1).is_subscribable());
        assert!(!Destination::Room(1).is_application());
        assert!(has_application_prefix("app.anything"));
        assert!(!has_application_prefix("room.1"));
    }
}
