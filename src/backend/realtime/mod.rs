//! Real-time Messaging Module
//!
//! This module carries live events to browser clients over a WebSocket that
//! speaks STOMP 1.2 text frames. Chat messages, notifications and dashboard
//! statistics all travel through the same pipeline.
//!
//! # Architecture
//!
//! - **`gatekeeper`** - Authenticates the CONNECT frame (bearer token, enabled account)
//! - **`authorizer`** - Command policy and destination access checks
//! - **`registry`** - Destination rings and the per-principal session index
//! - **`router`** - `BroadcastRouter`: fans domain events out to subscribers
//! - **`session`** - Per-connection protocol state machine
//! - **`connection`** - axum WebSocket handler, reader and writer tasks
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── gatekeeper.rs   - Handshake authentication
//! ├── authorizer.rs   - Destination authorization
//! ├── registry.rs     - Subscriber registry
//! ├── router.rs       - Broadcast router
//! ├── session.rs      - Connection state machine
//! └── connection.rs   - WebSocket transport
//! ```
//!
//! # Destinations
//!
//! - `room.<projectId>` - Chat messages of a project (members only)
//! - `user.<userId>.notifications` - Notifications of one user (that user only)
//! - `stats.dashboard` - Periodic dashboard statistics (any authenticated user)
//! - `app.chat.<projectId>.send` - SEND target for chat messages
//!
//! # Delivery
//!
//! At-most-once, no replay. Events on one destination reach every
//! subscriber in the order the router accepted them. A directed event for a
//! user with no live session is a `DeliveryOutcome::Miss`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use collabris::backend::realtime::{BroadcastRouter, SubscriberRegistry};
//! use collabris::shared::BroadcastEvent;
//!
//! let router = BroadcastRouter::new(Arc::new(SubscriberRegistry::new(256)));
//! let outcome = router.publish(BroadcastEvent::chat(1, serde_json::json!({"content": "hi"})));
//! ```

/// Handshake authentication
pub mod gatekeeper;

/// Destination authorization
pub mod authorizer;

/// Subscriber registry
pub mod registry;

/// Broadcast router
pub mod router;

/// Connection state machine
pub mod session;

/// WebSocket transport
pub mod connection;

pub use authorizer::DestinationAuthorizer;
pub use connection::ws_handler;
pub use gatekeeper::{Gatekeeper, HandshakeOutcome, HandshakePolicy};
pub use registry::{Delivery, DeliveryOutcome, SubscriberRegistry};
pub use router::BroadcastRouter;
pub use session::{ConnectionSession, Flow, RealtimeContext};
