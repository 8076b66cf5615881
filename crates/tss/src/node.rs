//! Node-side glue: routes inbound bus traffic to the DKG engine and the
//! signing coordinator, owns the single-ceremony DKG guard, broadcasts
//! heartbeats, and pumps monitor events into the signing layer.
//!
//! The bus never holds the node; it only feeds the mpsc channel the node's
//! router consumes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use bridge_types::{PartyId, SignalEvent, ThresholdParams};
use global_utils::common_types::unix_timestamp_ms;
use key_store::{KeyId, KeyMetadata, KeyShareRecord, KeyStore, KeyStoreError, KeyUsage, SecretShare, SignatureAlgorithm};
use transport_bus::{PartyIdentity, PeerDirectory, TransportBus, WireMessage, WirePayload};

use crate::coordinator::{SigningCoordinator, SigningConfig};
use crate::curve::{compress, point_to_hex};
use crate::dkg::{DkgCeremonyConfig, DkgEngine, DkgOutcome};
use crate::errors::DkgError;
use crate::metrics::NodeMetrics;
use crate::types::{DkgSummary, GroupArtifacts};

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub party_id: PartyId,
    pub params: ThresholdParams,
    pub key_id: KeyId,
    pub round_timeout: Duration,
    pub signing_timeout: Duration,
    pub heartbeat_window: Duration,
    pub heartbeat_period: Duration,
    pub active_chains: Vec<u32>,
}

/// One validator's TSS brain: everything between the bus and the key store.
pub struct TssNode {
    cfg: NodeConfig,
    bus: Arc<dyn TransportBus>,
    key_store: Arc<dyn KeyStore>,
    identity: PartyIdentity,
    peer_directory: PeerDirectory,
    coordinator: Arc<SigningCoordinator>,
    metrics: Arc<NodeMetrics>,
    /// Ceremony-wide guard: at most one DKG per process.
    dkg_guard: Arc<Mutex<()>>,
    /// Inbox of the currently running DKG engine, if any.
    dkg_inbox: Mutex<Option<mpsc::Sender<WireMessage>>>,
    /// DKG messages that raced ahead of their ceremony's start.
    pending_dkg: Mutex<Vec<WireMessage>>,
    cancel: CancellationToken,
    started_at: Instant,
}

impl TssNode {
    /// Builds the node and spawns its router, heartbeat and signal-pump
    /// tasks. `inbox` is the bus's ordered inbound stream; `signals` is the
    /// chain monitor's event stream.
    #[allow(clippy::too_many_arguments)]
    pub async fn start(
        cfg: NodeConfig,
        bus: Arc<dyn TransportBus>,
        key_store: Arc<dyn KeyStore>,
        identity: PartyIdentity,
        peer_directory: PeerDirectory,
        metrics: Arc<NodeMetrics>,
        inbox: mpsc::Receiver<WireMessage>,
        signals: mpsc::Receiver<SignalEvent>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let coordinator = SigningCoordinator::new(
            SigningConfig {
                party_id: cfg.party_id,
                key_id: cfg.key_id.clone(),
                signing_timeout: cfg.signing_timeout,
                heartbeat_window: cfg.heartbeat_window,
            },
            Arc::clone(&bus),
            Arc::clone(&key_store),
            Arc::clone(&metrics),
        );

        let node = Arc::new(Self {
            cfg,
            bus,
            key_store,
            identity,
            peer_directory,
            coordinator,
            metrics,
            dkg_guard: Arc::new(Mutex::new(())),
            dkg_inbox: Mutex::new(None),
            pending_dkg: Mutex::new(Vec::new()),
            cancel,
            started_at: Instant::now(),
        });

        node.load_existing_key().await;

        node.bus
            .broadcast(WirePayload::ValidatorRegister {
                validator_id: node.cfg.party_id,
                timestamp: unix_timestamp_ms(),
            })
            .await;

        tokio::spawn(Arc::clone(&node).router_loop(inbox));
        tokio::spawn(Arc::clone(&node).heartbeat_loop());
        tokio::spawn(Arc::clone(&node).signal_pump(signals));

        node
    }

    pub fn coordinator(&self) -> &Arc<SigningCoordinator> {
        &self.coordinator
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn party_id(&self) -> PartyId {
        self.cfg.party_id
    }

    /// Installs artifacts from a share persisted by an earlier run.
    async fn load_existing_key(&self) {
        match self.key_store.public_artifacts(&self.cfg.key_id).await {
            Ok(artifacts) => match GroupArtifacts::from_public(&artifacts) {
                Ok(parsed) => {
                    info!(group_key = %point_to_hex(&parsed.group_key), "loaded existing key share");
                    self.coordinator.install_artifacts(parsed);
                }
                Err(err) => error!(error = %err, "persisted DKG artifacts are inconsistent"),
            },
            Err(KeyStoreError::KeyNotFound(_)) => {
                info!("no key share persisted yet, waiting for key generation");
            }
            Err(err) => error!(error = %err, "key store unavailable at startup"),
        }
    }

    async fn router_loop(self: Arc<Self>, mut inbox: mpsc::Receiver<WireMessage>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("router stopping on shutdown");
                    break;
                }
                message = inbox.recv() => {
                    match message {
                        Some(message) => self.route(message).await,
                        None => {
                            warn!("bus inbound channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn route(self: &Arc<Self>, message: WireMessage) {
        let sender = message.sender;
        match &message.payload {
            WirePayload::ValidatorRegister { validator_id, .. } => {
                info!(party = %validator_id, "validator registered");
                self.coordinator.note_heartbeat(*validator_id);
                return;
            }
            WirePayload::Heartbeat { .. } => {
                self.coordinator.note_heartbeat(sender);
                return;
            }
            WirePayload::DkgStart {
                ceremony_id,
                threshold,
                total_parties,
            } => {
                let ceremony_id = *ceremony_id;
                let threshold = *threshold;
                let total_parties = *total_parties;
                let node = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(err) = node.join_dkg(ceremony_id, threshold, total_parties).await {
                        warn!(%ceremony_id, error = %err, "key generation ceremony failed");
                    }
                });
                return;
            }
            WirePayload::SignalEventSeen { signal_id, .. } => {
                debug!(%signal_id, peer = %sender, "peer observed signal");
                return;
            }
            _ => {}
        }

        let is_dkg = matches!(
            message.payload,
            WirePayload::DkgCommitment { .. }
                | WirePayload::DkgShare { .. }
                | WirePayload::DkgComplaint { .. }
                | WirePayload::DkgPublicKeyShare { .. }
        );
        if is_dkg {
            let inbox = self.dkg_inbox.lock().await;
            match inbox.as_ref() {
                Some(tx) => {
                    if tx.send(message).await.is_err() {
                        debug!("ceremony ended, dropping DKG message");
                    }
                }
                None => {
                    drop(inbox);
                    // The sender's DKG_START may still be in flight from
                    // another peer; park the message for the engine.
                    let mut pending = self.pending_dkg.lock().await;
                    if pending.len() < 4096 {
                        pending.push(message);
                    }
                }
            }
            return;
        }

        self.coordinator.route_message(message).await;
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.cfg.heartbeat_period);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let pending = self.coordinator.pending_count().await;
                    self.bus
                        .broadcast(WirePayload::Heartbeat {
                            uptime_secs: self.uptime().as_secs(),
                            active_chains: self.cfg.active_chains.clone(),
                            pending,
                            has_key_share: self.coordinator.has_key_share(),
                        })
                        .await;
                }
            }
        }
    }

    async fn signal_pump(self: Arc<Self>, mut signals: mpsc::Receiver<SignalEvent>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = signals.recv() => {
                    match event {
                        Some(event) => {
                            self.metrics.signals_observed.fetch_add(1, Ordering::Relaxed);
                            self.coordinator.on_signal_event(event).await;
                        }
                        None => {
                            debug!("monitor event channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Operator-triggered key generation: announces the ceremony to every
    /// peer, then runs it locally.
    #[instrument(level = "info", skip(self))]
    pub async fn start_dkg(self: &Arc<Self>, ceremony_id: Option<Uuid>) -> Result<DkgSummary, DkgError> {
        let ceremony_id = ceremony_id.unwrap_or_else(Uuid::new_v4);
        let params = self.cfg.params;

        let report = self
            .bus
            .broadcast(WirePayload::DkgStart {
                ceremony_id,
                threshold: params.threshold,
                total_parties: params.total_parties,
            })
            .await;
        if !report.fully_delivered() {
            warn!(failed = ?report.failed, "DKG start reached only part of the committee");
        }

        self.join_dkg(ceremony_id, params.threshold, params.total_parties).await
    }

    /// Runs one ceremony under the process-wide guard, persists the outcome
    /// and installs the fresh artifacts.
    async fn join_dkg(self: &Arc<Self>, ceremony_id: Uuid, threshold: u16, total_parties: u16) -> Result<DkgSummary, DkgError> {
        if threshold != self.cfg.params.threshold || total_parties != self.cfg.params.total_parties {
            return Err(DkgError::InvalidParameters(format!(
                "announced ({threshold},{total_parties}) differs from configured ({},{})",
                self.cfg.params.threshold, self.cfg.params.total_parties
            )));
        }

        let guard = Arc::clone(&self.dkg_guard);
        let _permit = guard.try_lock().map_err(|_| DkgError::AlreadyRunning)?;

        let (tx, rx) = mpsc::channel(1024);
        {
            let mut inbox = self.dkg_inbox.lock().await;
            *inbox = Some(tx.clone());
        }
        // Replay messages that arrived before the ceremony was set up.
        for parked in self.pending_dkg.lock().await.drain(..) {
            if parked.payload.ceremony_id() == Some(ceremony_id) {
                let _ = tx.send(parked).await;
            }
        }

        let peer_identities: BTreeMap<_, _> = self
            .cfg
            .params
            .all_parties()
            .filter(|p| *p != self.cfg.party_id)
            .filter_map(|p| self.peer_directory.dh_point(p).map(|point| (p, point)))
            .collect();

        let engine = DkgEngine::new(
            DkgCeremonyConfig {
                ceremony_id,
                party_id: self.cfg.party_id,
                params: self.cfg.params,
                round_timeout: self.cfg.round_timeout,
            },
            Arc::clone(&self.bus),
            self.identity.dh_scalar(),
            peer_identities,
            rx,
        )?;

        let result = engine.run().await;
        *self.dkg_inbox.lock().await = None;

        match result {
            Ok(outcome) => {
                let summary = self.persist_outcome(&outcome).await?;
                self.metrics.dkg_completed.fetch_add(1, Ordering::Relaxed);
                Ok(summary)
            }
            Err(err) => {
                self.metrics.dkg_failed.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    async fn persist_outcome(&self, outcome: &DkgOutcome) -> Result<DkgSummary, DkgError> {
        let record = KeyShareRecord {
            metadata: KeyMetadata {
                algorithm: SignatureAlgorithm::SchnorrSecp256k1,
                created_at_ms: unix_timestamp_ms(),
                usages: vec![KeyUsage::ThresholdSign],
            },
            secret_share: SecretShare::from_scalar(&outcome.key_share),
            public_share: compress(&outcome.public_share),
            group_key: compress(&outcome.group_key),
            commitments: outcome
                .commitments
                .iter()
                .map(|(party, set)| (party.as_u16(), set.iter().map(point_to_hex).collect()))
                .collect(),
            participants: outcome.participants.iter().map(PartyId::as_u16).collect(),
        };
        let artifacts = record.public_artifacts();

        // A key share is written once; replacing it requires an explicit
        // delete (resharing is a separate procedure).
        self.key_store.put(&self.cfg.key_id, record, false).await?;

        let parsed = GroupArtifacts::from_public(&artifacts)?;
        self.coordinator.install_artifacts(parsed);

        Ok(DkgSummary {
            ceremony_id: outcome.ceremony_id,
            group_key: point_to_hex(&outcome.group_key),
            public_key_share: point_to_hex(&outcome.public_share),
            participants: outcome.participants.iter().map(PartyId::as_u16).collect(),
        })
    }
}
