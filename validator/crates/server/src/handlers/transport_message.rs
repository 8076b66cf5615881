use axum::Json;
use axum::extract::State;
use tracing::{debug, instrument};

use global_utils::common_resp::Empty;
use transport_bus::SignedEnvelope;

use crate::errors::ValidatorError;
use crate::init::AppState;

/// Inbound edge of the HTTP bus: verify the envelope against the sender's
/// registered identity key, then run the message through the dedup/FIFO
/// lanes. Rejects anything without a valid signature.
#[instrument(level = "trace", skip_all, fields(sender = %envelope.message.sender))]
pub async fn handle(
    State(state): State<AppState>,
    Json(envelope): Json<SignedEnvelope>,
) -> Result<Json<Empty>, ValidatorError> {
    let sender = envelope.message.sender;
    let key = state
        .peer_directory
        .get(sender)
        .ok_or_else(|| ValidatorError::Unauthenticated(format!("unknown sender party {sender}")))?;
    envelope
        .verify(key)
        .map_err(|e| ValidatorError::Unauthenticated(e.to_string()))?;

    let outcome = state
        .inbound
        .accept(envelope.message)
        .await
        .map_err(|e| ValidatorError::Internal(e.to_string()))?;
    debug!(?outcome, "transport message accepted");
    Ok(Json(Empty {}))
}
