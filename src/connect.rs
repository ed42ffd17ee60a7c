//! Bounded, fixed-delay retry of the startup handshake.
//!
//! The handshake is attempted up to `max_attempts` times with the same pause
//! between every pair of failures. Every failure is treated as transient; there is
//! no backoff, jitter, or fast-fail on credential errors.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        error_detail::ErrorDetail,
        types::{BotIdentity, IdentityCell, Res},
    },
    service::chat::ChatClient,
};

/// How many times to try, and how long to wait between failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Res<Self> {
        if max_attempts < 1 {
            return Err(anyhow::anyhow!("A retry policy needs at least one attempt."));
        }

        Ok(Self { max_attempts, delay })
    }

    pub fn from_config(config: &Config) -> Res<Self> {
        Self::new(config.connect_max_attempts, config.connect_retry_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Result of one `connect` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an exhausted connection must abort startup"]
pub enum ConnectionOutcome {
    Connected { identity: BotIdentity },
    ExhaustedFailure { attempts: u32, last_error_detail: ErrorDetail },
}

impl ConnectionOutcome {
    /// Turns exhaustion into an error, so the caller has to propagate it.
    pub fn into_result(self) -> Result<BotIdentity, ConnectionExhausted> {
        match self {
            Self::Connected { identity } => Ok(identity),
            Self::ExhaustedFailure { attempts, last_error_detail } => Err(ConnectionExhausted { attempts, last_error_detail }),
        }
    }
}

/// The handshake never succeeded; fatal to startup.
#[derive(Debug, Error)]
#[error("Could not connect to the chat API after {attempts} attempt(s); last error: {last_error_detail}")]
pub struct ConnectionExhausted {
    pub attempts: u32,
    pub last_error_detail: ErrorDetail,
}

/// Performs the handshake until it succeeds or the policy runs out.
///
/// On success the confirmed identity is recorded into `identity` and no further
/// attempts are made.
#[instrument(skip_all, fields(max_attempts = policy.max_attempts))]
pub async fn connect(chat: &ChatClient, identity: &IdentityCell, policy: &RetryPolicy) -> ConnectionOutcome {
    let max_attempts = policy.max_attempts;
    let mut last_error_detail = None;

    for attempt in 1..=max_attempts {
        info!(attempt, "Connecting to the chat API (attempt {}/{}) ...", attempt, max_attempts);

        match chat.whoami().await {
            Ok(confirmed) => {
                if let Err(err) = identity.record(confirmed.clone()) {
                    error!("{}", ErrorDetail::from_error(&err));
                }

                info!(attempt, "Connected to the chat API as `{}`.", confirmed);

                return ConnectionOutcome::Connected { identity: confirmed };
            }
            Err(err) => {
                let detail = ErrorDetail::from_error(&err);
                warn!(attempt, "Connection attempt {}/{} failed: {}", attempt, max_attempts, detail);
                last_error_detail = Some(detail);

                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    error!("Giving up on the chat API after {} attempt(s).", max_attempts);

    ConnectionOutcome::ExhaustedFailure {
        attempts: max_attempts,
        last_error_detail: last_error_detail.unwrap_or_else(|| ErrorDetail::from_error(&anyhow::anyhow!("no attempt was made"))),
    }
}

// Tests.
