//! Shared Error Types
//!
//! This module defines error types that are shared between the server and
//! clients of the multiplexed connection. They cover failures that can be
//! detected without touching the store: malformed payloads, invalid input
//! and unknown destination names.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON serialization/deserialization failures
//! - `ValidationError` - Input validation failures (maps to HTTP 400)
//! - `DestinationError` - A destination name outside the known grammar
//!
//! # Usage
//!
//! ```rust
//! use collabris::shared::error::SharedError;
//!
//! let error = SharedError::validation("content", "Message content cannot be empty");
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across thread boundaries.
use thiserror::Error;

/// Shared error types that can occur on both ends of the connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Input validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Destination name that does not match any known pattern
    #[error("Unknown destination: {destination}")]
    DestinationError {
        /// The offending destination string
        destination: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new unknown-destination error
    pub fn destination(destination: impl Into<String>) -> Self {
        Self::DestinationError {
            destination: destination.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
