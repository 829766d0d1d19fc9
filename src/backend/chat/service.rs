/**
 * Chat Service
 *
 * Validates, persists and broadcasts a chat message to its project room.
 * Reached from both the realtime SEND to `app.chat.<id>.send` and
 * POST /api/chat/rooms/{id}/messages; callers check membership first.
 * A SEND to `app.chat.<id>.join` stores and broadcasts a `JOIN`
 * announcement the same way.
 *
 * # Validation
 *
 * - Content is trimmed and must not be empty
 * - At most 2000 characters
 */

use sqlx::SqlitePool;

use crate::backend::auth::principal::Principal;
use crate::backend::chat::db::{save_message, ChatMessage, MessageType};
use crate::backend::error::BackendError;
use crate::backend::realtime::router::BroadcastRouter;
use crate::shared::{BroadcastEvent, ProjectId};

/// Maximum message length in characters
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Validate message content
///
/// # Returns
/// The trimmed content
pub fn validate_content(content: &str) -> Result<&str, BackendError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(BackendError::validation("content", "Message cannot be empty"));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(BackendError::validation(
            "content",
            format!("Message must be at most {} characters", MAX_MESSAGE_LEN),
        ));
    }
    Ok(content)
}

/// Sends chat messages
#[derive(Clone)]
pub struct ChatService {
    pool: SqlitePool,
    router: BroadcastRouter,
}

impl ChatService {
    pub fn new(pool: SqlitePool, router: BroadcastRouter) -> Self {
        Self { pool, router }
    }

    /// Persist a message and publish it to `room.<project_id>`
    pub async fn send_message(
        &self,
        project_id: ProjectId,
        sender: &Principal,
        content: &str,
    ) -> Result<ChatMessage, BackendError> {
        let content = validate_content(content)?;
        self.store_and_publish(project_id, sender, MessageType::Chat, content)
            .await
    }

    /// Announce that `sender` joined the room
    pub async fn announce_join(
        &self,
        project_id: ProjectId,
        sender: &Principal,
    ) -> Result<ChatMessage, BackendError> {
        let content = format!("{} joined the chat", sender.username);
        self.store_and_publish(project_id, sender, MessageType::Join, &content)
            .await
    }

    async fn store_and_publish(
        &self,
        project_id: ProjectId,
        sender: &Principal,
        message_type: MessageType,
        content: &str,
    ) -> Result<ChatMessage, BackendError> {
        let message = save_message(&self.pool, project_id, sender.id, message_type, content).await?;

        let payload = serde_json::to_value(&message)?;
        let outcome = self.router.publish(BroadcastEvent::chat(project_id, payload));
        tracing::debug!(
            "[Chat] {:?} message {} in room {} from {} ({:?})",
            message_type,
            message.id,
            project_id,
            sender.username,
            outcome
        );

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content() {
        assert_eq!(validate_content("  hello ").unwrap(), "hello");
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(MAX_MESSAGE_LEN)).is_ok());
        assert!(validate_content(&"x".repeat(MAX_MESSAGE_LEN + 1)).is_err());
        // length counts characters, not bytes
        assert!(validate_content(&"é".repeat(MAX_MESSAGE_LEN)).is_ok());
    }
}
