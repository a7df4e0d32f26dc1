//! Server-side confirmation of checkout sessions with the payment provider.

mod dev;
mod stripe;

pub use dev::*;
pub use stripe::*;

use futures::future::BoxFuture;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NotFound,
}

/// Looks up the payment status of a checkout session by its id.
pub trait CheckoutLookup: Send + Sync {
    fn payment_status<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<PaymentStatus>>;
}

/// Checkout session ids as issued by the provider: `cs_` followed by
/// URL-safe characters.
pub fn is_valid_session_id(session_id: &str) -> bool {
    session_id.len() <= 255
        && session_id
            .strip_prefix("cs_")
            .is_some_and(|rest| {
                !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            })
}
