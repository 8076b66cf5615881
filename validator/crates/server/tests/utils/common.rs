use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use bridge_types::{PartyId, ThresholdParams};
use chain_monitor::{ChainEventMonitor, MonitorConfig};
use key_store::{KeyId, MemoryKeyStore};
use transport_bus::{Inbound, MemoryNetwork, PartyIdentity, PeerDirectory};
use tss::{NodeConfig, NodeMetrics, TssNode};
use validator_server::init::{AppState, create_app};

pub fn party(id: u16) -> PartyId {
    PartyId::new(id).unwrap()
}

/// A single running validator (party 1 of a 3-of-5 committee) wired from
/// in-memory components, plus the identities of its would-be peers.
pub struct TestContext {
    state: AppState,
    identities: BTreeMap<u16, PartyIdentity>,
    pub cancel: CancellationToken,
    /// Keeps the HTTP inbound lane's consumer side alive for the tests.
    _http_rx: mpsc::Receiver<transport_bus::WireMessage>,
}

impl TestContext {
    pub async fn start() -> anyhow::Result<Self> {
        let params = ThresholdParams::new(3, 5)?;
        let identities: BTreeMap<u16, PartyIdentity> =
            (1..=5).map(|id| (id, PartyIdentity::generate())).collect();
        let mut directory = PeerDirectory::new();
        for (id, identity) in &identities {
            directory.insert(party(*id), identity.verifying_key());
        }

        let network = MemoryNetwork::new();
        let (bus, node_inbox) = network.join(party(1));
        // The HTTP inbound edge under test feeds its own lane set; the
        // receiver side is held open but never read in these tests.
        let (http_inbound, http_rx) = Inbound::channel(64);

        let (_signal_tx, signal_rx) = mpsc::channel(16);
        let metrics = Arc::new(NodeMetrics::new());
        let cancel = CancellationToken::new();
        let key_store = Arc::new(MemoryKeyStore::new());

        let node = TssNode::start(
            NodeConfig {
                party_id: party(1),
                params,
                key_id: KeyId::from("bridge-group"),
                round_timeout: Duration::from_secs(2),
                signing_timeout: Duration::from_secs(2),
                heartbeat_window: Duration::from_secs(10),
                heartbeat_period: Duration::from_secs(1),
                active_chains: vec![],
            },
            bus,
            key_store.clone(),
            identities[&1].clone(),
            directory.clone(),
            Arc::clone(&metrics),
            node_inbox,
            signal_rx,
            cancel.clone(),
        )
        .await;

        let (monitor, _events) = ChainEventMonitor::start(MonitorConfig::default())?;

        let state = AppState {
            node,
            monitor: Arc::new(monitor),
            key_store,
            inbound: Arc::new(http_inbound),
            peer_directory: directory,
            metrics,
            started_at: Instant::now(),
        };

        Ok(Self {
            state,
            identities,
            cancel,
            _http_rx: http_rx,
        })
    }

    pub fn app(&self) -> Router {
        create_app(self.state.clone())
    }

    pub fn identity_of(&self, id: u16) -> &PartyIdentity {
        &self.identities[&id]
    }
}
