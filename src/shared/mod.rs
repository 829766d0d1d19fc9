//! Shared Module
//!
//! This module contains types that are shared between the server and its
//! clients. Everything here is transport-level data: the text frames that
//! travel over the multiplexed WebSocket, the destination names that address
//! them and the broadcast envelope produced by domain services.
//!
//! # Overview
//!
//! The shared module is platform-agnostic and does not depend on the
//! `ssr` feature, so a client crate can reuse the codec as-is.

/// STOMP-style frame codec
pub mod frame;

/// Destination names on the multiplexed connection
pub mod destination;

/// Broadcast event envelope
pub mod event;

/// Shared error types
pub mod error;

/// Identifier of a user (principal identity)
pub type UserId = i64;

/// Identifier of a project; doubles as the chat room id
pub type ProjectId = i64;

/// Identifier of a task node in the dependency graph
pub type TaskId = i64;

/// Re-export commonly used types for convenience
pub use destination::Destination;
pub use error::SharedError;
pub use event::{Address, BroadcastEvent, Channel};
pub use frame::{Command, Frame, FrameError};
