//! Slack implementation of the chat service.
//!
//! Uses the `auth.test` call as the startup handshake and a socket-mode listener
//! as the receive loop.

use crate::{
    base::{
        config::Config,
        error_detail::ErrorDetail,
        types::{BotIdentity, Res, Void},
    },
    interaction::{ChatEvent, Dispatcher},
};
use anyhow::Context;
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    ///
    /// Makes no request and loads no certificates, so it cannot fail.
    pub fn slack(config: &Config) -> Self {
        Self::new(Arc::new(SlackChatClient::new(config)))
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    dispatcher: Dispatcher,
}

/// Slack client implementation.
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    client: OnceCell<Arc<FullClient>>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    ///
    /// The HTTPS client is built on first use, so a missing root store shows up
    /// as a failed handshake attempt rather than a failed construction.
    fn new(config: &Config) -> Self {
        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        Self {
            app_token,
            bot_token,
            client: OnceCell::new(),
        }
    }

    /// Gets the shared HTTPS client, building it if no attempt has succeeded yet.
    async fn client(&self) -> Res<Arc<FullClient>> {
        self.client.get_or_try_init(|| async { build_client() }).await.cloned()
    }
}

/// Builds the Slack API client over rustls with the platform's root certificates.
fn build_client() -> Res<Arc<FullClient>> {
    debug!("Building the Slack HTTPS client ...");

    let https_connector = HttpsConnector::<HttpConnector>::builder()
        .with_native_roots()
        .context("Could not load the platform's root certificates")?
        .https_only()
        .enable_all_versions()
        .build();
    let connector = SlackClientHyperConnector::with_connector(https_connector);

    Ok(Arc::new(slack_morphism::SlackClient::new(connector)))
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    #[instrument(name = "SlackChatClient::whoami", skip_all)]
    async fn whoami(&self) -> Res<BotIdentity> {
        let client = self.client().await?;
        let session = client.open_session(&self.bot_token);
        let bot_user = session.auth_test().await.context("Slack `auth.test` failed")?;

        Ok(BotIdentity(bot_user.user_id.0))
    }

    async fn discard_pending_events(&self) -> Void {
        // Socket mode only ever delivers live events, so there is no backlog on Slack's side.
        info!("Socket mode keeps no event backlog; nothing to discard.");
        Ok(())
    }

    async fn start(&self, dispatcher: Dispatcher) -> Void {
        let client = self.client().await?;

        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(client)
                .with_error_handler(handle_listener_error)
                .with_user_state(SlackUserState { dispatcher }),
        );

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
///
/// Events are handed off to the dispatcher, which isolates and times each one.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            info!("Received message event ...");

            let channel_id = slack_message_event.origin.channel.as_ref().ok_or(anyhow::anyhow!("Failed to get channel ID"))?.0.to_owned();
            let text = slack_message_event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default();
            let ts = slack_message_event.origin.ts.0.clone();
            let raw = serde_json::to_value(&slack_message_event)?;

            user_state.dispatcher.dispatch_detached(ChatEvent { channel_id, ts, text, raw });
        }
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            info!("Received app mention event ...");

            let channel_id = slack_app_mention_event.channel.0.to_owned();
            let text = slack_app_mention_event.content.text.clone().unwrap_or_default();
            let ts = slack_app_mention_event.origin.ts.0.clone();
            let raw = serde_json::to_value(&slack_app_mention_event)?;

            user_state.dispatcher.dispatch_detached(ChatEvent { channel_id, ts, text, raw });
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

/// Catches anything a callback let escape; the event is acknowledged and the listener keeps going.
fn handle_listener_error(err: Box<dyn std::error::Error + Send + Sync>, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> HttpStatusCode {
    error!("Slack event handling failed: {}", ErrorDetail::from_std(&*err));

    HttpStatusCode::OK
}

// Tests.
