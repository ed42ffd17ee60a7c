//! This module handles the storage of messages in the database.

use async_trait::async_trait;
use tracing::instrument;

use crate::base::types::Void;

use super::{ChatEvent, GenericEventHandler, HandlerContext};

/// Stores every incoming event, verbatim, for future reference.
pub struct MessageStorageHandler;

#[async_trait]
impl GenericEventHandler for MessageStorageHandler {
    fn name(&self) -> &str {
        "message_storage"
    }

    #[instrument(name = "MessageStorageHandler::handle", skip_all)]
    async fn handle(&self, context: &HandlerContext, event: &ChatEvent) -> Void {
        context.db.add_channel_message(&event.channel_id, &event.raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        base::types::BotIdentity,
        interaction::{EventOutcome, HandlerRegistry},
        service::db::DbClient,
    };

    #[tokio::test]
    async fn stores_events_in_memory_database() {
        let db = DbClient::surreal_memory().await.unwrap();
        let dispatcher = HandlerRegistry::new().with(MessageStorageHandler).attach(HandlerContext {
            identity: BotIdentity::new("U12345"),
            db: db.clone(),
        });
        let raw = serde_json::json!({ "type": "message", "text": "hello", "user": "U999" });

        let outcome = dispatcher
            .dispatch(ChatEvent {
                channel_id: "C01TEST".to_string(),
                ts: "1234567890.123456".to_string(),
                text: "hello".to_string(),
                raw: raw.clone(),
            })
            .await;

        assert_eq!(outcome, EventOutcome::Handled);

        let stored = db.get_channel_messages("C01TEST").await.unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].channel_id, "C01TEST");
        assert_eq!(stored[0].raw, raw);
        assert!(!stored[0].received_at.is_empty());
    }
}
