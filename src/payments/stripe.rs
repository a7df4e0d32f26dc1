use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{CheckoutLookup, PaymentStatus};
use crate::error::{AppError, Result};

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self::with_api_base(secret_key, STRIPE_API_BASE)
    }

    /// Points the client at a different API host (a mock server in tests).
    pub fn with_api_base(secret_key: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches a checkout session. `None` if Stripe does not know the id.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<StripeCheckoutSession>> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.api_base,
            urlencoding::encode(session_id)
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Verification(format!("Stripe API error: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Verification(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: StripeCheckoutSession = response
            .json()
            .await
            .map_err(|e| AppError::Verification(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(Some(session))
    }
}

impl CheckoutLookup for StripeClient {
    fn payment_status<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<PaymentStatus>> {
        Box::pin(async move {
            Ok(match self.retrieve_checkout_session(session_id).await? {
                None => PaymentStatus::NotFound,
                Some(session) if session.is_paid() => PaymentStatus::Paid,
                Some(_) => PaymentStatus::Unpaid,
            })
        })
    }
}

// ============ checkout.session ============

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub mode: Option<String>,   // "payment" for payment links
    pub status: Option<String>, // "open", "complete", "expired"
    pub payment_status: String, // "paid", "unpaid", "no_payment_required"
    pub customer_email: Option<String>,
}

impl StripeCheckoutSession {
    /// Money actually moved; an open or free session does not count.
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid" && self.status.as_deref().is_none_or(|s| s == "complete")
    }
}
