use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bridge_types::{PartyId, ThresholdParams};
use chain_monitor::ChainEventMonitor;
use global_utils::config_variant::ConfigVariant;
use global_utils::env_parser::{config_path_from_env, resolve_bind_addr};
use global_utils::http_client::HttpClient;
use global_utils::logger::init_logger;
use key_store::{FileKeyStore, KeyId, KeyStore, MemoryKeyStore, RemoteKmsKeyStore};
use transport_bus::{HttpBus, Inbound, PartyIdentity, PeerDirectory, PeerEndpoint};
use tss::{NodeConfig, NodeMetrics, TssNode};
use validator_config_parser::config::{KeyStoreBackend, ServerConfig};
use validator_server::init::{AppState, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let _logger_guard = init_logger();

    let config = match config_path_from_env() {
        Some(path) => ServerConfig::init_config(ConfigVariant::OnlyOneFilepath(path))?,
        None => ServerConfig::init_config(ConfigVariant::init())?,
    };
    info!(party_id = config.validator.party_id, "validator starting");

    let cancel = CancellationToken::new();

    // Key store first: a node with a broken custody backend must not come up.
    let key_store = build_key_store(&config).await?;
    key_store
        .healthcheck()
        .await
        .map_err(|e| anyhow!("key store unusable at startup: {e}"))?;

    // Transport bus next.
    let identity = match &config.transport.identity_key {
        Some(raw) => PartyIdentity::from_hex(raw)?,
        None => {
            let identity = PartyIdentity::generate();
            warn!(
                public_key = %identity.public_key_hex(),
                "no identity key configured; generated an ephemeral one, peers will not recognise it"
            );
            identity
        }
    };
    let party_id = PartyId::new(config.validator.party_id)?;
    let mut directory = PeerDirectory::new();
    directory.insert(party_id, identity.verifying_key());
    let mut endpoints = Vec::new();
    for peer in &config.transport.peers {
        let peer_id = PartyId::new(peer.party_id)?;
        directory.insert_hex(peer_id, &peer.public_key)?;
        endpoints.push(PeerEndpoint {
            party_id: peer_id,
            endpoint: peer.endpoint.clone(),
        });
    }
    let bus = Arc::new(HttpBus::new(party_id, identity.clone(), endpoints));
    let (inbound, node_inbox) = Inbound::channel(4096);

    // Chain monitor, then the TSS node consuming its events.
    let (monitor, signal_events) = ChainEventMonitor::start(config.monitor_config())?;
    let monitor = Arc::new(monitor);

    let metrics = Arc::new(NodeMetrics::new());
    let node = TssNode::start(
        NodeConfig {
            party_id,
            params: ThresholdParams::new(config.validator.threshold, config.validator.total_parties)?,
            key_id: KeyId(config.validator.key_id.clone()),
            round_timeout: config.timeouts.round_timeout(),
            signing_timeout: config.timeouts.signing_timeout(),
            heartbeat_window: config.timeouts.heartbeat_window(),
            heartbeat_period: config.timeouts.heartbeat_period(),
            active_chains: config.chains.iter().map(|c| c.chain_id).collect(),
        },
        bus,
        Arc::clone(&key_store),
        identity,
        directory.clone(),
        Arc::clone(&metrics),
        node_inbox,
        signal_events,
        cancel.clone(),
    )
    .await;

    let state = AppState {
        node,
        monitor: Arc::clone(&monitor),
        key_store,
        inbound: Arc::new(inbound),
        peer_directory: directory,
        metrics,
        started_at: Instant::now(),
    };
    let app = create_app(state);

    let addr_to_listen = resolve_bind_addr(&config.server.ip, config.server.port)?;
    let listener = TcpListener::bind(addr_to_listen)
        .await
        .context("Failed to bind to address")?;
    info!(addr = %listener.local_addr()?, "operator surface listening");

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        })
        .await
        .context("Failed to serve")?;

    // Drain: cancel everything, the monitor enforces its own grace period.
    cancel.cancel();
    if monitor.stop().await.is_err() {
        warn!("chain monitor did not drain cleanly");
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    info!("validator stopped");
    Ok(())
}

async fn build_key_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn KeyStore>> {
    match config.keystore.backend {
        KeyStoreBackend::File => {
            let path = config
                .keystore
                .path
                .clone()
                .ok_or_else(|| anyhow!("file keystore requires keystore_config.path"))?;
            let passphrase = std::env::var("KEYSTORE_PASSPHRASE")
                .map_err(|_| anyhow!("file keystore requires the KEYSTORE_PASSPHRASE env variable"))?;
            Ok(Arc::new(FileKeyStore::open(path, passphrase).await?))
        }
        KeyStoreBackend::Kms => {
            let url = config
                .keystore
                .kms_url
                .clone()
                .ok_or_else(|| anyhow!("kms keystore requires keystore_config.kms_url"))?;
            let wrap_key = config
                .keystore
                .kms_public_key
                .clone()
                .ok_or_else(|| anyhow!("kms keystore requires keystore_config.kms_public_key"))?;
            Ok(Arc::new(RemoteKmsKeyStore::new(HttpClient::new(url), &wrap_key)?))
        }
        KeyStoreBackend::Memory => {
            warn!("memory keystore selected; key shares will not survive a restart");
            Ok(Arc::new(MemoryKeyStore::new()))
        }
    }
}
