use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::trace;

use crate::errors::ValidatorError;
use crate::init::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub key_store: bool,
    pub chains: bool,
    pub has_key_share: bool,
}

/// 200 when the key store and every chain worker are healthy, 503 with the
/// first failing reason otherwise.
#[tracing::instrument(skip_all, err)]
pub async fn handle(State(state): State<AppState>) -> Result<Json<HealthReport>, ValidatorError> {
    trace!("Performing healthcheck for validator...");
    state
        .key_store
        .healthcheck()
        .await
        .map_err(|e| ValidatorError::Unhealthy(format!("key store: [{e}]")))?;
    if !state.monitor.all_healthy().await {
        return Err(ValidatorError::Unhealthy("one or more chain workers are degraded".into()));
    }
    Ok(Json(HealthReport {
        healthy: true,
        key_store: true,
        chains: true,
        has_key_share: state.node.coordinator().has_key_share(),
    }))
}
