//! Client side of payment verification.
//!
//! Coming back from the payment page proves nothing by itself. The return
//! URL carries a checkout reference, which is exchanged with the
//! verification endpoint for a yes/no answer. Only a yes produces a
//! [`VerifiedPayment`], and only a [`VerifiedPayment`] can grant entitlement.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::error::{msg, AppError, Result};

/// Proof that a checkout reference was confirmed as paid.
///
/// Cannot be built outside this crate except through [`verify_reference`].
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    reference: String,
    verified_at: DateTime<Utc>,
}

impl VerifiedPayment {
    pub(crate) fn new(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            verified_at: Utc::now(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }
}

/// Something that can confirm a checkout reference.
///
/// `Ok(true)` means paid. `Ok(false)` and `Err` are both failures to the
/// caller; the split only matters for logging.
pub trait PaymentVerifier: Send + Sync {
    fn verify<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<bool>>;
}

/// Verifies `reference`, folding every non-success into
/// [`AppError::Verification`].
pub async fn verify_reference(
    verifier: &dyn PaymentVerifier,
    reference: Option<&str>,
) -> Result<VerifiedPayment> {
    let reference = reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::Verification(msg::MISSING_REFERENCE.into()))?;

    match verifier.verify(reference).await {
        Ok(true) => {
            tracing::info!("Payment reference verified");
            Ok(VerifiedPayment::new(reference))
        }
        Ok(false) => {
            tracing::warn!("Payment reference rejected by verifier");
            Err(AppError::Verification(msg::PAYMENT_NOT_COMPLETED.into()))
        }
        Err(AppError::Verification(reason)) => {
            tracing::warn!("Payment verification failed: {}", reason);
            Err(AppError::Verification(reason))
        }
        Err(e) => {
            tracing::warn!("Payment verification failed: {}", e);
            Err(AppError::Verification(e.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    verified: bool,
}

/// Calls the application's `GET /verify?session_id=…` endpoint.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    endpoint: String,
    http: HttpClient,
}

impl HttpVerifier {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(concat!("qrstudio/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            http,
        })
    }

    async fn request(&self, reference: &str) -> Result<bool> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("session_id", reference)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Verification(format!(
                "Verification endpoint returned {}",
                status.as_u16()
            )));
        }

        let body: VerifyResponse = response.json().await?;
        Ok(body.verified)
    }
}

impl PaymentVerifier for HttpVerifier {
    fn verify<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.request(reference))
    }
}
