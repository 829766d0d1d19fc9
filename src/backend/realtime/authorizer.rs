/**
 * Destination Authorizer
 *
 * Decides, for every frame after the handshake, whether the connection may
 * perform it. Two stages:
 *
 * 1. Command policy (pure, see `command_rule`)
 *
 * | Command                       | Rule                |
 * |-------------------------------|---------------------|
 * | CONNECT / STOMP / DISCONNECT  | allow               |
 * | SEND to an `app.` destination | requires principal  |
 * | SUBSCRIBE                     | requires principal  |
 * | anything else                 | deny                |
 *
 * 2. Destination access
 *
 * - `room.<id>`, `app.chat.<id>.send` and `app.chat.<id>.join`: project
 *   member or Admin
 * - `user.<id>.notifications`: only user `<id>`
 * - `stats.dashboard`: any authenticated principal
 *
 * A missing principal is an `AuthenticationFailure`, anything else refused
 * is `AuthorizationDenied`.
 */

use sqlx::SqlitePool;

use crate::backend::auth::principal::Principal;
use crate::backend::error::BackendError;
use crate::backend::projects::access::ensure_member;
use crate::shared::destination::has_application_prefix;
use crate::shared::{Command, Destination, Frame};

/// Outcome of the command policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRule {
    Allow,
    RequirePrincipal,
    Deny,
}

/// Command policy table
pub fn command_rule(command: Command, destination: Option<&str>) -> CommandRule {
    match command {
        Command::Connect | Command::Stomp | Command::Disconnect => CommandRule::Allow,
        Command::Send if destination.is_some_and(has_application_prefix) => {
            CommandRule::RequirePrincipal
        }
        Command::Subscribe => CommandRule::RequirePrincipal,
        _ => CommandRule::Deny,
    }
}

/// Checks frames against the command policy and destination access rules
#[derive(Clone)]
pub struct DestinationAuthorizer {
    pool: SqlitePool,
}

impl DestinationAuthorizer {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Authorize a frame for the connection's principal
    ///
    /// # Returns
    /// * `Ok(None)` - Allowed, the frame carries no destination to act on
    /// * `Ok(Some(destination))` - Allowed on this parsed destination
    ///
    /// # Errors
    /// * `AuthenticationFailure` - Frame needs a principal, connection has none
    /// * `AuthorizationDenied` - Command or destination refused
    /// * `SharedError` - Destination missing or malformed
    /// * `Store` - Membership lookup failed after retries
    pub async fn authorize(
        &self,
        principal: Option<&Principal>,
        frame: &Frame,
    ) -> Result<Option<Destination>, BackendError> {
        let raw = frame.destination();

        match command_rule(frame.command, raw) {
            CommandRule::Allow => return Ok(None),
            CommandRule::Deny => {
                return Err(BackendError::forbidden(format!(
                    "{} is not permitted",
                    frame.command
                )));
            }
            CommandRule::RequirePrincipal => {}
        }

        let principal = principal.ok_or(BackendError::AuthenticationFailure)?;
        let raw = raw.ok_or_else(|| {
            BackendError::validation("destination", "Destination header is required")
        })?;
        let destination = Destination::parse(raw)?;

        let usable = match frame.command {
            Command::Send => destination.is_application(),
            _ => destination.is_subscribable(),
        };
        if !usable {
            return Err(BackendError::forbidden(format!(
                "{} is not permitted on {}",
                frame.command, destination
            )));
        }

        self.check_access(principal, destination).await?;
        Ok(Some(destination))
    }

    /// Destination access rules for an authenticated principal
    pub async fn check_access(
        &self,
        principal: &Principal,
        destination: Destination,
    ) -> Result<(), BackendError> {
        match destination {
            Destination::Room(project_id)
            | Destination::ChatSend(project_id)
            | Destination::ChatJoin(project_id) => {
                ensure_member(&self.pool, principal, project_id).await
            }
            Destination::UserNotifications(user_id) => {
                if user_id == principal.id {
                    Ok(())
                } else {
                    tracing::warn!(
                        "[Realtime] User {} denied access to notifications of user {}",
                        principal.id,
                        user_id
                    );
                    Err(BackendError::forbidden("Cannot access another user's notifications"))
                }
            }
            Destination::DashboardStats => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_rule_table() {
        assert_eq!(command_rule(Command::Connect, None), CommandRule::Allow);
        assert_eq!(command_rule(Command::Stomp, None), CommandRule::Allow);
        assert_eq!(command_rule(Command::Disconnect, None), CommandRule::Allow);
        assert_eq!(
            command_rule(Command::Send, Some("app.chat.1.send")),
            CommandRule::RequirePrincipal
        );
        assert_eq!(command_rule(Command::Send, Some("room.1")), CommandRule::Deny);
        assert_eq!(command_rule(Command::Send, None), CommandRule::Deny);
        assert_eq!(
            command_rule(Command::Subscribe, Some("room.1")),
            CommandRule::RequirePrincipal
        );

        for command in [
            Command::Unsubscribe,
            Command::Ack,
            Command::Nack,
            Command::Begin,
            Command::Commit,
            Command::Abort,
        ] {
            assert_eq!(command_rule(command, Some("room.1")), CommandRule::Deny);
        }
    }
}
