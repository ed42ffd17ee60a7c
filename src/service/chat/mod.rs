//! Chat service integration for bot-launcher.
//!
//! This module provides the launcher's view of a chat platform:
//! - Confirming the bot's own identity (the startup handshake)
//! - Optionally discarding events queued before startup
//! - Running the receive loop that feeds incoming events to the handlers
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Slack.

pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    base::types::{BotIdentity, Res, Void},
    interaction::Dispatcher,
};

// Traits.

/// Generic "chat" trait that clients must implement.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Ask the platform who the bot is.
    ///
    /// This is the startup handshake: it is read-only and safe to repeat, and a
    /// success proves both connectivity and credentials.
    async fn whoami(&self) -> Res<BotIdentity>;

    /// Drop any events the platform queued while the bot was offline.
    ///
    /// Only invoked when explicitly enabled in configuration.
    async fn discard_pending_events(&self) -> Void;

    /// Start the receive loop, handing every incoming event to `dispatcher`.
    ///
    /// Returns once the loop stops.
    async fn start(&self, dispatcher: Dispatcher) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    /// Wraps a platform implementation.
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
