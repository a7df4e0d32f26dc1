//! Carries the in-progress design across the redirect to the payment page.
//!
//! ```text
//! NoHandoff --write--> HandoffWritten --(redirect, return)--> Consuming
//!     ^                                                          |
//!     +------------------- Restored | Discarded <----------------+
//! ```
//!
//! Consuming always deletes the stored snapshot before it reports, whether
//! or not there was one and whether or not it parsed.

use std::sync::Arc;

use crate::error::Result;
use crate::models::StyleConfig;
use crate::storage::{keys, StorageAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffState {
    NoHandoff,
    HandoffWritten,
    Consuming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    Absent,
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffOutcome {
    Restored(StyleConfig),
    Discarded(DiscardReason),
}

pub struct HandoffStore {
    storage: Arc<dyn StorageAdapter>,
    state: HandoffState,
}

impl HandoffStore {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        let state = if storage.get(keys::HANDOFF_PENDING_CONFIG).is_some() {
            HandoffState::HandoffWritten
        } else {
            HandoffState::NoHandoff
        };

        Self { storage, state }
    }

    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// Whether a snapshot is waiting in storage.
    pub fn is_pending(&self) -> bool {
        self.storage.get(keys::HANDOFF_PENDING_CONFIG).is_some()
    }

    /// Persists the full design. Returns only once the write has landed;
    /// navigation away must not start before that.
    pub fn write(&mut self, config: &StyleConfig) -> Result<()> {
        let snapshot = serde_json::to_string(config)?;
        self.storage.set(keys::HANDOFF_PENDING_CONFIG, &snapshot)?;
        self.state = HandoffState::HandoffWritten;
        tracing::info!("Hand-off written ({} bytes)", snapshot.len());
        Ok(())
    }

    /// Reads and deletes the snapshot. A missing or unparsable snapshot is
    /// discarded quietly. If the delete fails the snapshot stays pending.
    pub fn consume(&mut self) -> HandoffOutcome {
        self.state = HandoffState::Consuming;

        let raw = self.storage.get(keys::HANDOFF_PENDING_CONFIG);
        if let Err(e) = self.storage.remove(keys::HANDOFF_PENDING_CONFIG) {
            tracing::error!("Failed to delete hand-off snapshot: {}", e);
        }

        let outcome = match raw {
            None => HandoffOutcome::Discarded(DiscardReason::Absent),
            Some(raw) => match serde_json::from_str::<StyleConfig>(&raw) {
                Ok(config) => HandoffOutcome::Restored(config),
                Err(e) => HandoffOutcome::Discarded(DiscardReason::Corrupt(e.to_string())),
            },
        };

        match &outcome {
            HandoffOutcome::Restored(_) => tracing::info!("Hand-off restored"),
            HandoffOutcome::Discarded(DiscardReason::Absent) => {
                tracing::debug!("No hand-off to restore")
            }
            HandoffOutcome::Discarded(DiscardReason::Corrupt(e)) => {
                tracing::warn!("Discarding corrupt hand-off: {}", e)
            }
        }

        self.state = HandoffState::NoHandoff;
        outcome
    }
}

impl std::fmt::Debug for HandoffStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandoffStore")
            .field("storage", &"<storage>")
            .field("state", &self.state)
            .finish()
    }
}
