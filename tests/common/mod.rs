//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - In-memory database fixtures
//! - Application state wired for tests
//! - Authentication test helpers
//! - A mailer that records outgoing mail

#![allow(dead_code)]

pub mod auth_helpers;
pub mod database;
pub mod mail;

// Re-export commonly used utilities
pub use auth_helpers::*;
pub use database::*;
pub use mail::*;
