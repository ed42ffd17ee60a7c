//! Ordered startup of the bot.
//!
//! The runtime brings everything up exactly once, in a fixed order:
//! health endpoint, storage, chat handshake, handler attachment, receive loop.
//! Only a storage failure or an exhausted handshake aborts the sequence.

use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        error_detail::ErrorDetail,
        types::{IdentityCell, LifecycleStage, Void},
    },
    connect::{self, RetryPolicy},
    interaction::{HandlerContext, HandlerRegistry},
    service::{chat::ChatClient, db::DbClient, health::HealthServer},
};

/// Runtime service context for the startup sequence.
///
/// Consumed by [`Runtime::launch`]; a runtime is started at most once.
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The database client instance.
    pub db: DbClient,
    /// The chat client instance.
    pub chat: ChatClient,
    /// Handlers to attach once connected.
    pub handlers: HandlerRegistry,
    /// Filled once by the chat handshake; see [`Runtime::identity`].
    identity: IdentityCell,
    stage: watch::Sender<LifecycleStage>,
}

impl Runtime {
    /// Create a new runtime instance with the production services.
    ///
    /// Performs no I/O: both clients connect during [`Runtime::launch`].
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Self {
        let db = DbClient::surreal(&config);
        let chat = ChatClient::slack(&config);

        Self::from_parts(config, db, chat, HandlerRegistry::with_defaults())
    }

    /// Create a runtime from already constructed services.
    pub fn from_parts(config: Config, db: DbClient, chat: ChatClient, handlers: HandlerRegistry) -> Self {
        let (stage, _) = watch::channel(LifecycleStage::Idle);

        Self {
            config,
            db,
            chat,
            handlers,
            identity: IdentityCell::new(),
            stage,
        }
    }

    /// Observe the startup stage.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleStage> {
        self.stage.subscribe()
    }

    /// The bot identity confirmed by the chat handshake.
    ///
    /// The returned cell shares its slot with the runtime, so a handle taken
    /// before [`Runtime::launch`] sees the identity once the handshake succeeds.
    pub fn identity(&self) -> IdentityCell {
        self.identity.clone()
    }

    /// Runs the startup sequence with an already serving health endpoint.
    ///
    /// Returns when the receive loop stops, or with the error that aborted startup.
    /// The health endpoint keeps serving either way.
    #[instrument(skip_all, fields(health = %health.local_addr()))]
    pub async fn launch(self, health: HealthServer) -> Void {
        self.advance(LifecycleStage::HealthUp)?;

        let result = self.bring_up().await;

        if let Err(err) = &result {
            error!("Startup aborted: {}", ErrorDetail::from_error(err));
            self.advance(LifecycleStage::Failed)?;
        }

        drop(health);
        result
    }

    async fn bring_up(&self) -> Void {
        // Storage.

        self.db.initialize().await.map_err(|e| e.context("Storage initialization failed"))?;
        self.advance(LifecycleStage::StorageReady)?;

        // Chat handshake.

        let policy = RetryPolicy::from_config(&self.config)?;
        let identity = connect::connect(&self.chat, &self.identity, &policy).await.into_result()?;
        self.advance(LifecycleStage::RemoteConnected)?;

        if self.config.discard_pending_events {
            info!("Discarding pending events ...");

            if let Err(err) = self.chat.discard_pending_events().await {
                warn!("Could not discard pending events: {}", ErrorDetail::from_error(&err));
            }
        }

        // Handlers.

        let context = HandlerContext { identity, db: self.db.clone() };
        let dispatcher = self.handlers.clone().attach(context);
        self.advance(LifecycleStage::HandlersAttached)?;

        // Receive loop.

        self.advance(LifecycleStage::Running)?;
        self.chat.start(dispatcher).await
    }

    /// Moves to `next`, refusing anything but the legal transition.
    fn advance(&self, next: LifecycleStage) -> Void {
        let current = *self.stage.borrow();

        if !current.can_enter(next) {
            return Err(anyhow::anyhow!("Illegal startup transition from {:?} to {:?}.", current, next));
        }

        self.stage.send_replace(next);
        info!(from = ?current, to = ?next, "Startup stage: {:?}", next);

        Ok(())
    }
}
