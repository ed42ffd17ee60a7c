//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services the bot-launcher brings up:
//! - Chat services (e.g., Slack)
//! - Database services (e.g., SurrealDB)
//! - The liveness endpoint
//!
//! The chat and database modules define both generic traits and concrete
//! implementations, allowing for extensibility and easy testing.

pub mod chat;
pub mod db;
pub mod health;
