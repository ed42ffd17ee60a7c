//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;

use super::types::Res;

/// Default storage endpoint (in-memory SurrealDB).
fn default_db_endpoint() -> String {
    "mem://".to_string()
}

/// Default storage namespace.
fn default_db_namespace() -> String {
    "bot".to_string()
}

/// Default storage database.
fn default_db_database() -> String {
    "launcher".to_string()
}

/// Default port for the health endpoint.
fn default_health_port() -> u16 {
    8080
}

/// Default number of handshake attempts.
fn default_connect_max_attempts() -> u32 {
    10
}

/// Default pause between failed handshake attempts, in milliseconds.
fn default_connect_retry_delay_ms() -> u64 {
    5000
}

/// Configuration for the bot-launcher application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The shared settings.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The settings behind [`Config`]; environment variables use the `BOT_LAUNCHER_` prefix.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Slack app token (`SLACK_APP_TOKEN`).
    #[serde(default)]
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    #[serde(default)]
    pub slack_bot_token: String,
    /// Database endpoint URL (`DB_ENDPOINT`), e.g. `ws://localhost:8000` or `mem://`.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`); sign-in is skipped when empty.
    #[serde(default)]
    pub db_username: String,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: String,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Port the health endpoint binds to (`HEALTH_PORT`, or the bare `PORT`).
    #[serde(default = "default_health_port")]
    pub health_port: u16,
    /// Maximum number of handshake attempts at startup (`CONNECT_MAX_ATTEMPTS`).
    #[serde(default = "default_connect_max_attempts")]
    pub connect_max_attempts: u32,
    /// Fixed pause between failed handshake attempts (`CONNECT_RETRY_DELAY_MS`).
    #[serde(default = "default_connect_retry_delay_ms")]
    pub connect_retry_delay_ms: u64,
    /// Discard events queued on the remote side before launching (`DISCARD_PENDING_EVENTS`).
    /// Off unless explicitly enabled.
    #[serde(default)]
    pub discard_pending_events: bool,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            slack_app_token: String::new(),
            slack_bot_token: String::new(),
            db_endpoint: default_db_endpoint(),
            db_username: String::new(),
            db_password: String::new(),
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            health_port: default_health_port(),
            connect_max_attempts: default_connect_max_attempts(),
            connect_retry_delay_ms: default_connect_retry_delay_ms(),
            discard_pending_events: false,
        }
    }
}

impl Config {
    /// Loads settings from the environment and an optional TOML file, then validates them.
    ///
    /// Without `explicit_path`, `.hidden/config.toml` is used when present.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("BOT_LAUNCHER"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        // Hosting platforms hand out the listening port as a bare `PORT`.
        cfg = cfg.set_override_option("health_port", std::env::var("PORT").ok())?;

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Checks the invariants that deserialization alone cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.connect_max_attempts < 1 {
            return Err(anyhow::anyhow!("Connect max attempts must be at least 1."));
        }

        Ok(())
    }

    /// Pause between failed handshake attempts.
    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_startup_contract() {
        let config = Config::from(ConfigInner::default());

        assert_eq!(config.health_port, 8080);
        assert_eq!(config.connect_max_attempts, 10);
        assert_eq!(config.connect_retry_delay(), Duration::from_millis(5000));
        assert!(!config.discard_pending_events);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = Config::from(ConfigInner {
            connect_max_attempts: 0,
            ..Default::default()
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn file_values_are_deserialized() {
        let path = std::env::temp_dir().join(format!("bot-launcher-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "slack_bot_token = \"xoxb-test\"\nhealth_port = 9090\nconnect_max_attempts = 3\ndiscard_pending_events = true\n",
        )
        .unwrap();

        let config = Config::load(Some(&path));
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.slack_bot_token, "xoxb-test");
        assert_eq!(config.connect_max_attempts, 3);
        assert_eq!(config.connect_retry_delay_ms, 5000);
        assert!(config.discard_pending_events);
        if std::env::var("PORT").is_err() {
            assert_eq!(config.health_port, 9090);
        }
    }
}
