use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use chain_monitor::ChainHealth;

use crate::errors::ValidatorError;
use crate::init::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub party_id: u16,
    pub uptime_secs: u64,
    pub has_key_share: bool,
    pub pending_requests: Vec<String>,
    pub chains: BTreeMap<u32, ChainStatus>,
}

#[derive(Debug, Serialize)]
pub struct ChainStatus {
    pub name: String,
    #[serde(flatten)]
    pub health: ChainHealth,
}

#[tracing::instrument(skip_all)]
pub async fn handle(State(state): State<AppState>) -> Result<Json<StatusResponse>, ValidatorError> {
    let pending_requests = state
        .node
        .coordinator()
        .pending()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();

    let chains = state
        .monitor
        .health_check()
        .await
        .into_iter()
        .map(|(chain_id, (name, health))| (chain_id, ChainStatus { name, health }))
        .collect();

    Ok(Json(StatusResponse {
        party_id: state.node.party_id().as_u16(),
        uptime_secs: state.node.uptime().as_secs(),
        has_key_share: state.node.coordinator().has_key_share(),
        pending_requests,
        chains,
    }))
}
