//! Persistent storage for the bot.
//!
//! The launcher needs a one-shot initialization that must finish before the bot
//! connects, and somewhere to put incoming messages (and read them back).

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::base::types::{Res, Void};

pub mod surreal;

// Types.

/// A message record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// The channel the message arrived on.
    pub channel_id: String,
    /// The event payload exactly as the chat platform delivered it.
    pub raw: Value,
    /// RFC 3339 timestamp of when the message was stored.
    pub received_at: String,
}

// Traits.

/// Generic database client trait that clients must implement.
///
/// Implementing this trait allows different database backends to be used with the
/// bot-launcher.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Connects to the backend and prepares the schema.
    ///
    /// Called exactly once during startup; any error here aborts the launch.
    async fn initialize(&self) -> Void;

    /// Adds a message to the database for the given channel.
    async fn add_channel_message(&self, channel_id: &str, message: &Value) -> Void;

    /// Gets the stored messages for the given channel, oldest first.
    async fn get_channel_messages(&self, channel_id: &str) -> Res<Vec<StoredMessage>>;
}

// Structs.

/// Database client for bot-launcher.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DbClient {
    /// Wraps a backend implementation.
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
