use std::collections::HashSet;
use std::sync::RwLock;

use futures::future::BoxFuture;

use super::{CheckoutLookup, PaymentStatus};
use crate::error::{AppError, Result};

/// Stand-in provider for development: sessions are paid once marked through
/// the dev endpoint. Never used outside dev mode.
#[derive(Debug, Default)]
pub struct DevCheckouts {
    paid: RwLock<HashSet<String>>,
}

impl DevCheckouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_paid(&self, session_id: &str) -> Result<()> {
        self.paid
            .write()
            .map_err(|_| AppError::Internal("dev checkout lock poisoned".into()))?
            .insert(session_id.to_string());
        Ok(())
    }
}

impl CheckoutLookup for DevCheckouts {
    fn payment_status<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<PaymentStatus>> {
        Box::pin(async move {
            let paid = self
                .paid
                .read()
                .map_err(|_| AppError::Internal("dev checkout lock poisoned".into()))?
                .contains(session_id);
            Ok(if paid {
                PaymentStatus::Paid
            } else {
                PaymentStatus::NotFound
            })
        })
    }
}
