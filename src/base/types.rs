//! Shared result aliases and the startup state types.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use serde::{Deserialize, Serialize};

/// The crate-wide error type.
pub type Err = anyhow::Error;
/// Result alias over [`Err`].
pub type Res<T> = Result<T, Err>;
/// Result of an operation with no value.
pub type Void = Res<()>;

/// The remote-confirmed handle of the bot (e.g., the Slack bot user ID).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity(pub String);

impl BotIdentity {
    /// Wraps a handle returned by the chat platform.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// The raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write-once slot for the connected identity.
///
/// The retrier records into it after a confirmed handshake; everything after that
/// only reads. A second write is rejected.
#[derive(Debug, Clone, Default)]
pub struct IdentityCell {
    inner: Arc<OnceLock<BotIdentity>>,
}

impl IdentityCell {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the identity, failing if one was already recorded.
    pub fn record(&self, identity: BotIdentity) -> Res<()> {
        self.inner
            .set(identity)
            .map_err(|rejected| anyhow::anyhow!("Connected identity is already recorded; refusing to overwrite it with `{}`.", rejected))
    }

    /// The recorded identity, or `None` before the handshake succeeds.
    pub fn get(&self) -> Option<&BotIdentity> {
        self.inner.get()
    }
}

/// Stages of the process startup, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    /// Nothing started yet.
    Idle,
    /// The health endpoint is serving.
    HealthUp,
    /// Storage is initialized.
    StorageReady,
    /// The chat handshake confirmed the bot identity.
    RemoteConnected,
    /// Event handlers are bound to the dispatcher.
    HandlersAttached,
    /// The receive loop is running.
    Running,
    /// Terminal; reachable from any stage after `HealthUp`.
    Failed,
}

impl LifecycleStage {
    /// The stage that must follow this one on the happy path.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::HealthUp),
            Self::HealthUp => Some(Self::StorageReady),
            Self::StorageReady => Some(Self::RemoteConnected),
            Self::RemoteConnected => Some(Self::HandlersAttached),
            Self::HandlersAttached => Some(Self::Running),
            Self::Running | Self::Failed => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_enter(self, next: Self) -> bool {
        match next {
            Self::Failed => !matches!(self, Self::Idle | Self::Failed),
            _ => self.successor() == Some(next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_write_once() {
        let cell = IdentityCell::new();

        cell.record(BotIdentity::new("U111")).unwrap();
        assert!(cell.record(BotIdentity::new("U222")).is_err());

        assert_eq!(cell.get(), Some(&BotIdentity::new("U111")));
    }

    #[test]
    fn identity_cell_clones_share_the_slot() {
        let cell = IdentityCell::new();
        let reader = cell.clone();

        cell.record(BotIdentity::new("examplebot")).unwrap();

        assert_eq!(reader.get().map(BotIdentity::as_str), Some("examplebot"));
    }

    #[test]
    fn stages_cannot_be_skipped() {
        assert!(LifecycleStage::Idle.can_enter(LifecycleStage::HealthUp));
        assert!(LifecycleStage::HealthUp.can_enter(LifecycleStage::StorageReady));
        assert!(!LifecycleStage::HealthUp.can_enter(LifecycleStage::RemoteConnected));
        assert!(!LifecycleStage::StorageReady.can_enter(LifecycleStage::Running));
        assert!(!LifecycleStage::Running.can_enter(LifecycleStage::HealthUp));
    }

    #[test]
    fn failure_is_terminal_and_requires_health() {
        assert!(!LifecycleStage::Idle.can_enter(LifecycleStage::Failed));
        assert!(LifecycleStage::HealthUp.can_enter(LifecycleStage::Failed));
        assert!(LifecycleStage::RemoteConnected.can_enter(LifecycleStage::Failed));
        assert!(!LifecycleStage::Failed.can_enter(LifecycleStage::Failed));
        assert_eq!(LifecycleStage::Failed.successor(), None);
    }
}
