//! SurrealDB implementation for bot-launcher data storage.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use surrealdb::{Surreal, engine::any::Any, opt::auth::Root};
use tracing::{info, instrument};

use crate::base::{
    config::{Config, ConfigInner},
    types::{Res, Void},
};

use super::{DbClient, GenericDbClient, StoredMessage};

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Creates a SurrealDB-backed client; nothing is contacted until `initialize`.
    pub fn surreal(config: &Config) -> Self {
        Self::new(Arc::new(SurrealDbClient::new(config)))
    }

    /// Creates and initializes an in-memory SurrealDB client.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::new(&Config::from(ConfigInner::default()));

        client.initialize().await?;

        Ok(Self::new(Arc::new(client)))
    }
}

// Structs.

/// SurrealDB client implementation.
pub struct SurrealDbClient {
    db: Surreal<Any>,
    endpoint: String,
    credentials: Option<(String, String)>,
    namespace: String,
    database: String,
}

impl SurrealDbClient {
    pub fn new(config: &Config) -> Self {
        let credentials = if config.db_username.is_empty() {
            None
        } else {
            Some((config.db_username.clone(), config.db_password.clone()))
        };

        Self {
            db: Surreal::init(),
            endpoint: config.db_endpoint.clone(),
            credentials,
            namespace: config.db_namespace.clone(),
            database: config.db_database.clone(),
        }
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(name = "SurrealDbClient::initialize", skip_all, fields(endpoint = %self.endpoint))]
    async fn initialize(&self) -> Void {
        self.db.connect(self.endpoint.as_str()).await?;

        // Authenticate with the database using the provided username and password.
        if let Some((username, password)) = &self.credentials {
            self.db.signin(Root { username, password }).await?;
        }

        self.db.use_ns(&self.namespace).use_db(&self.database).await?;

        // Define schemas.

        self.db.query("DEFINE TABLE IF NOT EXISTS message SCHEMALESS;").await?.check()?;
        self.db.query("DEFINE INDEX IF NOT EXISTS message_channel ON message FIELDS channel_id;").await?.check()?;

        info!("Database initialized successfully.");

        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn add_channel_message(&self, channel_id: &str, message: &Value) -> Void {
        let record = StoredMessage {
            channel_id: channel_id.to_string(),
            raw: message.clone(),
            received_at: chrono::Utc::now().to_rfc3339(),
        };

        self.db.query("CREATE message CONTENT $record;").bind(("record", record)).await?.check()?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_channel_messages(&self, channel_id: &str) -> Res<Vec<StoredMessage>> {
        let messages: Vec<StoredMessage> = self
            .db
            .query("SELECT channel_id, raw, received_at FROM message WHERE channel_id = $channel_id ORDER BY received_at ASC;")
            .bind(("channel_id", channel_id.to_string()))
            .await?
            .take(0)?;

        Ok(messages)
    }
}

// Tests.
