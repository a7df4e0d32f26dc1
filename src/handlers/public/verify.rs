use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::extractors::Query;
use crate::handlers::AppState;
use crate::payments::{is_valid_session_id, PaymentStatus};

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

/// Confirms a checkout session with the payment provider.
///
/// Answers `{"verified": true}` only for a session the provider reports as
/// paid. Unknown and unpaid sessions are `false`; a malformed or missing id
/// is a 400 and a provider failure a 502, both of which clients treat as
/// not verified.
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>> {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(msg::MISSING_REFERENCE.into()))?;

    if !is_valid_session_id(&session_id) {
        return Err(AppError::BadRequest("Invalid session id".into()));
    }

    let checkouts = state
        .checkouts
        .as_ref()
        .ok_or_else(|| AppError::Internal(msg::VERIFIER_NOT_CONFIGURED.into()))?;

    let status = checkouts.payment_status(&session_id).await?;
    let verified = status == PaymentStatus::Paid;

    tracing::info!(?status, verified, "Checkout session checked");

    Ok(Json(VerifyResponse { verified }))
}
