//! The persisted "this client has paid" flag.
//!
//! Read once when the store is initialized, afterwards changed only by
//! [`EntitlementStore::grant`], which needs a [`VerifiedPayment`]. There is
//! no way to revoke.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::storage::{keys, StorageAdapter};
use crate::verify::VerifiedPayment;

pub struct EntitlementStore {
    storage: Arc<dyn StorageAdapter>,
    granted: bool,
    granted_at: Option<DateTime<Utc>>,
}

impl EntitlementStore {
    /// Loads the persisted flag. Anything other than `"true"` reads as not
    /// entitled.
    pub fn init(storage: Arc<dyn StorageAdapter>) -> Self {
        let granted = storage
            .get(keys::ENTITLEMENT_GRANTED)
            .is_some_and(|v| v == "true");

        let granted_at = storage
            .get(keys::ENTITLEMENT_GRANTED_AT)
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc));

        tracing::debug!(granted, "Entitlement loaded");

        Self {
            storage,
            granted,
            granted_at: if granted { granted_at } else { None },
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    pub fn granted_at(&self) -> Option<DateTime<Utc>> {
        self.granted_at
    }

    /// Marks this client as entitled.
    ///
    /// The in-session flag is set before persisting, so a storage failure
    /// still leaves the paying user entitled until the process exits; the
    /// error is returned so the caller can report it. Granting twice keeps
    /// the first timestamp.
    pub fn grant(&mut self, proof: &VerifiedPayment) -> Result<()> {
        if self.granted {
            tracing::debug!("Entitlement already granted");
            return Ok(());
        }

        let at = proof.verified_at();
        self.granted = true;
        self.granted_at = Some(at);
        tracing::info!("Entitlement granted at {}", at.to_rfc3339());

        self.storage.set(keys::ENTITLEMENT_GRANTED, "true")?;
        self.storage.set(keys::ENTITLEMENT_GRANTED_AT, &at.to_rfc3339())?;
        Ok(())
    }
}

impl std::fmt::Debug for EntitlementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementStore")
            .field("storage", &"<storage>")
            .field("granted", &self.granted)
            .field("granted_at", &self.granted_at)
            .finish()
    }
}
