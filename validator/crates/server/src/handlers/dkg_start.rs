use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use tss::DkgSummary;

use crate::errors::ValidatorError;
use crate::init::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DkgStartRequest {
    /// Optional externally chosen ceremony id; fresh otherwise.
    pub ceremony_id: Option<Uuid>,
}

#[instrument(level = "info", skip_all)]
pub async fn handle(
    State(state): State<AppState>,
    body: Option<Json<DkgStartRequest>>,
) -> Result<Json<DkgSummary>, ValidatorError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    tracing::info!(ceremony_id = ?request.ceremony_id, "operator requested key generation");
    let summary = state.node.start_dkg(request.ceremony_id).await?;
    tracing::info!(group_key = %summary.group_key, "key generation finished");
    Ok(Json(summary))
}
