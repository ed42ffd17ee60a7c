//! Event handling for the bot-launcher.
//!
//! Handlers are collected in a [`HandlerRegistry`] before the bot connects. Once
//! the identity is confirmed, the registry is attached to a read-only
//! [`HandlerContext`], producing the [`Dispatcher`] the chat receive loop feeds.
//!
//! The dispatcher is the per-event isolation boundary: every event runs on its own
//! task, and a handler that errors or panics only costs that one event.

pub mod message_storage;

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{Instrument, error, info, instrument};

use crate::{
    base::{
        error_detail::ErrorDetail,
        types::{BotIdentity, Void},
    },
    service::db::DbClient,
};

// Types.

/// An incoming chat event, as handed to handlers.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub channel_id: String,
    pub ts: String,
    pub text: String,
    /// The platform's full event payload.
    pub raw: Value,
}

/// Read-only context every handler receives.
#[derive(Clone)]
pub struct HandlerContext {
    /// The identity confirmed by the startup handshake.
    pub identity: BotIdentity,
    pub db: DbClient,
}

/// What happened to one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Handled,
    Failed(ErrorDetail),
}

// Traits.

/// Something that reacts to incoming chat events.
#[async_trait]
pub trait GenericEventHandler: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Handle one event.
    async fn handle(&self, context: &HandlerContext, event: &ChatEvent) -> Void;
}

// Structs.

/// Handlers registered before startup, waiting to be attached.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn GenericEventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry the binary runs with.
    pub fn with_defaults() -> Self {
        Self::new().with(message_storage::MessageStorageHandler)
    }

    pub fn with(mut self, handler: impl GenericEventHandler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Binds the handlers to the connected context.
    pub fn attach(self, context: HandlerContext) -> Dispatcher {
        info!("Attaching {} handler(s) for `{}`.", self.handlers.len(), context.identity);

        Dispatcher {
            context,
            handlers: self.handlers.into(),
        }
    }
}

/// Routes events to the attached handlers.
///
/// It is trivially cloneable.
#[derive(Clone)]
pub struct Dispatcher {
    context: HandlerContext,
    handlers: Arc<[Arc<dyn GenericEventHandler>]>,
}

impl Dispatcher {
    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Runs every handler for `event` on a dedicated task and reports the outcome.
    ///
    /// Never fails: errors and panics are logged and returned as `EventOutcome::Failed`.
    #[instrument(name = "Dispatcher::dispatch", skip_all, fields(channel_id = %event.channel_id, ts = %event.ts))]
    pub async fn dispatch(&self, event: ChatEvent) -> EventOutcome {
        let started = Instant::now();
        let this = self.clone();

        let joined = tokio::spawn(async move { this.run_handlers(&event).await }.in_current_span()).await;

        let outcome = match joined {
            Ok(Ok(())) => EventOutcome::Handled,
            Ok(Err(detail)) => EventOutcome::Failed(detail),
            Err(join_error) if join_error.is_panic() => {
                let detail = ErrorDetail::from_panic(&*join_error.into_panic());
                error!("Handler panicked: {}", detail);
                EventOutcome::Failed(detail)
            }
            Err(join_error) => {
                let detail = ErrorDetail::from_std(&join_error);
                error!("Handler task was cancelled: {}", detail);
                EventOutcome::Failed(detail)
            }
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        info!(latency_ms, handled = outcome == EventOutcome::Handled, "Processed event in {} ms.", latency_ms);

        outcome
    }

    /// Dispatches without waiting, for receive loops that must not block.
    pub fn dispatch_detached(&self, event: ChatEvent) {
        let this = self.clone();
        tokio::spawn(
            async move {
                this.dispatch(event).await;
            }
            .in_current_span(),
        );
    }

    /// Runs all handlers; one failing does not stop the others. Reports the first failure.
    async fn run_handlers(&self, event: &ChatEvent) -> Result<(), ErrorDetail> {
        let mut first_failure = None;

        for handler in self.handlers.iter() {
            if let Err(err) = handler.handle(&self.context, event).await {
                let detail = ErrorDetail::from_error(&err);
                error!(handler = handler.name(), "Error while handling: {}", detail);
                first_failure.get_or_insert(detail);
            }
        }

        match first_failure {
            Some(detail) => Err(detail),
            None => Ok(()),
        }
    }
}

// Tests.
