use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Router};

use crate::error::{AppError, Result};
use crate::extractors::Path;
use crate::payments::{is_valid_session_id, DevCheckouts};

/// Marks a checkout session as paid (dev mode only).
pub async fn mark_session_paid(
    State(dev): State<Arc<DevCheckouts>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    if !is_valid_session_id(&session_id) {
        return Err(AppError::BadRequest("Invalid session id".into()));
    }
    dev.mark_paid(&session_id)?;
    tracing::info!("DEV: session {} marked paid", session_id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn router<S>(dev: Arc<DevCheckouts>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/dev/sessions/{session_id}/paid", post(mark_session_paid))
        .with_state(dev)
}
