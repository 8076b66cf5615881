use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tracing::instrument;

use chain_monitor::ChainEventMonitor;
use key_store::KeyStore;
use transport_bus::{Inbound, PeerDirectory};
use tss::{NodeMetrics, TssNode};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub node: Arc<TssNode>,
    pub monitor: Arc<ChainEventMonitor>,
    pub key_store: Arc<dyn KeyStore>,
    pub inbound: Arc<Inbound>,
    pub peer_directory: PeerDirectory,
    pub metrics: Arc<NodeMetrics>,
    pub started_at: Instant,
}

pub struct ValidatorApi {}

impl ValidatorApi {
    pub const HEALTH_ENDPOINT: &'static str = "/health";
    pub const STATUS_ENDPOINT: &'static str = "/status";
    pub const DKG_START_ENDPOINT: &'static str = "/api/dkg/start";
    pub const METRICS_ENDPOINT: &'static str = "/metrics";
    pub const TRANSPORT_MESSAGE_ENDPOINT: &'static str = "/api/transport/message";
}

#[instrument(level = "trace", skip_all)]
pub fn create_app(state: AppState) -> Router {
    tracing::info!("Creating app");
    Router::new()
        .route(ValidatorApi::HEALTH_ENDPOINT, get(handlers::health::handle))
        .route(ValidatorApi::STATUS_ENDPOINT, get(handlers::status::handle))
        .route(ValidatorApi::DKG_START_ENDPOINT, post(handlers::dkg_start::handle))
        .route(ValidatorApi::METRICS_ENDPOINT, get(handlers::metrics::handle))
        .route(
            ValidatorApi::TRANSPORT_MESSAGE_ENDPOINT,
            post(handlers::transport_message::handle),
        )
        .with_state(state)
}
