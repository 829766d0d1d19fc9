//! Chat Backend Module
//!
//! This module contains the server-side project chat:
//! - Message validation and persistence
//! - Live broadcast to `room.<projectId>`
//! - Room history, message count and deletion over HTTP
//! - `JOIN` announcements next to ordinary `CHAT` posts
//!
//! # Architecture
//!
//! - **`service`** - `ChatService`: validate, persist, publish
//! - **`handlers`** - HTTP history and send endpoints
//! - **`db`** - Database operations for persistence
//!
//! Realtime clients send with `SEND app.chat.<projectId>.send` and a
//! `{"content": "..."}` body; the session hands it to the same service.
//! `SEND app.chat.<projectId>.join` (empty body) announces the sender.
//!
//! # Example
//!
//! ```rust,no_run
//! use collabris::backend::chat::ChatService;
//! use collabris::backend::auth::{Principal, Role};
//!
//! # async fn example(chat: ChatService) -> Result<(), collabris::backend::BackendError> {
//! let sender = Principal::new(1, "ana", [Role::Member]);
//! let message = chat.send_message(7, &sender, "Standup in 5").await?;
//! # Ok(())
//! # }
//! ```

/// Database operations for chat messages
pub mod db;

/// HTTP handlers
pub mod handlers;

/// Validate, persist, publish
pub mod service;

pub use db::{ChatMessage, MessageType};
pub use service::ChatService;
