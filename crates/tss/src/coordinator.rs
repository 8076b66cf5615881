//! Turns confirmed chain events into signing ceremonies and drives each one
//! to an aggregated signature.
//!
//! Every request runs in its own spawned task with a private mailbox, so
//! ceremony state transitions are serialised per request while many requests
//! proceed concurrently. The coordinator itself only routes: inbound bus
//! messages to mailboxes, monitor events to new tasks.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use k256::ProjectivePoint;
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

use bridge_types::{ParticipantSet, PartyId, RequestId, SignalEvent, SignalId};
use key_store::{KeyId, KeyStore};
use transport_bus::{TransportBus, WireMessage, WirePayload};

use crate::canonical::{canonical_message, challenge};
use crate::curve::{point_from_hex, point_to_hex, scalar_to_hex};
use crate::errors::SigningError;
use crate::metrics::NodeMetrics;
use crate::poly::lagrange_at_zero;
use crate::signing::{
    AggregatedSignature, PartialSig, aggregate, nonce_commitment_hash, verify_partial, verify_signature,
};
use crate::types::GroupArtifacts;

#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub party_id: PartyId,
    pub key_id: KeyId,
    pub signing_timeout: Duration,
    pub heartbeat_window: Duration,
}

/// Lifecycle of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPhase {
    New,
    AwaitingPartials,
    Aggregating,
    Done,
    Failed(String),
    NotSelected,
}

impl RequestPhase {
    fn is_terminal(&self) -> bool {
        matches!(self, RequestPhase::Done | RequestPhase::Failed(_) | RequestPhase::NotSelected)
    }
}

/// Outbound events for the (out-of-scope) destination-chain submitter and
/// the operator surface. The coordinator never submits anything itself.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    SignatureComplete {
        request_id: RequestId,
        signal_id: SignalId,
        signature: Vec<u8>,
        participants: Vec<u16>,
    },
    RequestFailed {
        request_id: RequestId,
        reason: String,
    },
    NotSelected {
        request_id: RequestId,
    },
}

struct RequestHandle {
    phase: Arc<StdMutex<RequestPhase>>,
    mailbox: mpsc::Sender<WireMessage>,
}

pub struct SigningCoordinator {
    cfg: SigningConfig,
    bus: Arc<dyn TransportBus>,
    key_store: Arc<dyn KeyStore>,
    metrics: Arc<NodeMetrics>,
    artifacts: StdMutex<Option<Arc<GroupArtifacts>>>,
    requests: Mutex<HashMap<RequestId, RequestHandle>>,
    seen_signals: Mutex<HashSet<SignalId>>,
    heartbeats: StdMutex<HashMap<PartyId, Instant>>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl SigningCoordinator {
    pub fn new(
        cfg: SigningConfig,
        bus: Arc<dyn TransportBus>,
        key_store: Arc<dyn KeyStore>,
        metrics: Arc<NodeMetrics>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            cfg,
            bus,
            key_store,
            metrics,
            artifacts: StdMutex::new(None),
            requests: Mutex::new(HashMap::new()),
            seen_signals: Mutex::new(HashSet::new()),
            heartbeats: StdMutex::new(HashMap::new()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Installs the group artifacts after a DKG (or at startup from the key
    /// store). Immutable between ceremonies.
    pub fn install_artifacts(&self, artifacts: GroupArtifacts) {
        *self.artifacts.lock().expect("artifacts lock") = Some(Arc::new(artifacts));
    }

    pub fn has_key_share(&self) -> bool {
        self.artifacts.lock().expect("artifacts lock").is_some()
    }

    fn artifacts(&self) -> Option<Arc<GroupArtifacts>> {
        self.artifacts.lock().expect("artifacts lock").clone()
    }

    pub fn note_heartbeat(&self, party: PartyId) {
        self.metrics.heartbeats_received.fetch_add(1, Ordering::Relaxed);
        self.heartbeats.lock().expect("heartbeat lock").insert(party, Instant::now());
    }

    /// Parties answering the most recent heartbeat within the window; this
    /// party is always available to itself.
    fn available_parties(&self, artifacts: &GroupArtifacts) -> Vec<PartyId> {
        let heartbeats = self.heartbeats.lock().expect("heartbeat lock");
        artifacts
            .params
            .all_parties()
            .filter(|party| {
                *party == self.cfg.party_id
                    || heartbeats
                        .get(party)
                        .is_some_and(|seen| seen.elapsed() <= self.cfg.heartbeat_window)
            })
            .collect()
    }

    /// Deterministic selection: the first `t` available ids in ascending
    /// order.
    fn select_participants(&self, artifacts: &GroupArtifacts) -> Option<ParticipantSet> {
        let available = self.available_parties(artifacts);
        if available.len() < artifacts.params.threshold as usize {
            return None;
        }
        let chosen: Vec<u16> = available
            .into_iter()
            .take(artifacts.params.threshold as usize)
            .map(|p| p.as_u16())
            .collect();
        ParticipantSet::from_list(&chosen).ok()
    }

    /// Request ids currently in flight.
    pub async fn pending(&self) -> Vec<RequestId> {
        let requests = self.requests.lock().await;
        let mut pending: Vec<RequestId> = requests
            .iter()
            .filter(|(_, handle)| !handle.phase.lock().expect("phase lock").is_terminal())
            .map(|(id, _)| *id)
            .collect();
        pending.sort();
        pending
    }

    pub async fn pending_count(&self) -> usize {
        self.pending().await.len()
    }

    /// The monitor's callback. Idempotent in the event's signal id: the
    /// second and every later observation of a signal is a no-op.
    #[instrument(level = "debug", skip(self, event), fields(signal_id = %event.signal_id))]
    pub async fn on_signal_event(self: &Arc<Self>, event: SignalEvent) {
        let request_id = event.request_id();

        {
            let mut seen = self.seen_signals.lock().await;
            if !seen.insert(event.signal_id) {
                debug!("signal already handled, dropping duplicate");
                return;
            }
        }

        self.bus
            .broadcast(WirePayload::SignalEventSeen {
                signal_id: event.signal_id,
                src_chain_id: event.src_chain_id,
                dst_chain_id: event.dst_chain_id,
                tx_hash: hex::encode(event.observed_tx_hash),
                request_id,
            })
            .await;

        let Some(artifacts) = self.artifacts() else {
            warn!("signal observed but no key share is installed, dropping");
            let _ = self.events.send(CoordinatorEvent::RequestFailed {
                request_id,
                reason: SigningError::NoKeyShare.to_string(),
            });
            return;
        };

        let Some(participants) = self.select_participants(&artifacts) else {
            warn!("fewer than t parties available, cannot start ceremony");
            let _ = self.events.send(CoordinatorEvent::RequestFailed {
                request_id,
                reason: "insufficient available parties".to_string(),
            });
            return;
        };

        if !participants.contains(self.cfg.party_id) {
            info!(participants = ?participants.to_list(), "not selected for this request");
            let phase = Arc::new(StdMutex::new(RequestPhase::NotSelected));
            let (mailbox, _parked) = mpsc::channel(1);
            self.requests.lock().await.insert(
                request_id,
                RequestHandle { phase, mailbox },
            );
            let _ = self.events.send(CoordinatorEvent::NotSelected { request_id });
            return;
        }

        let message = canonical_message(&event);
        let leader = participants.leader() == Some(self.cfg.party_id);
        self.spawn_ceremony(request_id, event.signal_id, message, participants, artifacts, leader)
            .await;
    }

    /// Inbound bus traffic for the signing layer, routed by request id.
    pub async fn route_message(self: &Arc<Self>, message: WireMessage) {
        let Some(request_id) = message.payload.request_id() else {
            return;
        };

        if let WirePayload::SigningRequest {
            message: message_hex,
            participants,
            ..
        } = &message.payload
        {
            self.on_signing_request(request_id, message.sender, message_hex, participants)
                .await;
            return;
        }

        let mailbox = {
            let requests = self.requests.lock().await;
            requests.get(&request_id).map(|handle| handle.mailbox.clone())
        };
        match mailbox {
            Some(mailbox) => {
                if mailbox.send(message).await.is_err() {
                    debug!(%request_id, "ceremony finished, discarding late message");
                }
            }
            // This covers completion claims too: a SIGNATURE_COMPLETE for a
            // request this node is not running cannot be checked against the
            // canonical message, and a single peer must not be able to mark
            // a signal as handled. Dedup stays grounded in this node's own
            // observations; verified adoption only happens inside a live
            // ceremony.
            None => debug!(%request_id, kind = message.payload.kind(), "no ceremony for message, dropping"),
        }
    }

    /// A peer (the lowest-id participant) announced a ceremony this party is
    /// part of but has not observed on chain yet: join with the announced
    /// message and participant set.
    async fn on_signing_request(self: &Arc<Self>, request_id: RequestId, sender: PartyId, message_hex: &str, participants: &[u16]) {
        if self.requests.lock().await.contains_key(&request_id) {
            debug!(%request_id, "ceremony already tracked, ignoring signing request");
            return;
        }
        let Some(artifacts) = self.artifacts() else {
            warn!(%request_id, "signing request received but no key share installed");
            return;
        };
        let Ok(participants) = ParticipantSet::from_list(participants) else {
            warn!(%request_id, %sender, "signing request carries an invalid participant set");
            return;
        };
        if participants.len() < artifacts.params.threshold as usize {
            warn!(%request_id, %sender, "signing request names fewer than t participants");
            return;
        }
        if participants.leader() != Some(sender) {
            warn!(%request_id, %sender, "signing request not sent by the lowest selected id, dropping");
            return;
        }
        if !participants.contains(self.cfg.party_id) {
            debug!(%request_id, "not in the announced participant set");
            return;
        }
        let message = match hex::decode(message_hex.trim()) {
            Ok(raw) if raw.len() == 32 => {
                let mut digest = [0u8; 32];
                digest.copy_from_slice(&raw);
                digest
            }
            _ => {
                warn!(%request_id, %sender, "signing request carries a malformed message digest");
                return;
            }
        };

        let signal_id = request_id.signal_id();
        self.seen_signals.lock().await.insert(signal_id);
        self.spawn_ceremony(request_id, signal_id, message, participants, artifacts, false)
            .await;
    }

    async fn spawn_ceremony(
        self: &Arc<Self>,
        request_id: RequestId,
        signal_id: SignalId,
        message: [u8; 32],
        participants: ParticipantSet,
        artifacts: Arc<GroupArtifacts>,
        leader: bool,
    ) {
        let phase = Arc::new(StdMutex::new(RequestPhase::New));
        let (mailbox_tx, mailbox_rx) = mpsc::channel(256);

        self.requests.lock().await.insert(
            request_id,
            RequestHandle {
                phase: Arc::clone(&phase),
                mailbox: mailbox_tx,
            },
        );

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator
                .run_ceremony(request_id, signal_id, message, participants, artifacts, leader, phase, mailbox_rx)
                .await;
        });
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(level = "info", skip_all, fields(request_id = %request_id, party_id = %self.cfg.party_id))]
    async fn run_ceremony(
        self: Arc<Self>,
        request_id: RequestId,
        signal_id: SignalId,
        message: [u8; 32],
        participants: ParticipantSet,
        artifacts: Arc<GroupArtifacts>,
        leader: bool,
        phase: Arc<StdMutex<RequestPhase>>,
        mailbox: mpsc::Receiver<WireMessage>,
    ) {
        self.metrics.signing_requests.fetch_add(1, Ordering::Relaxed);
        let outcome = self
            .ceremony_inner(request_id, message, &participants, &artifacts, leader, &phase, mailbox)
            .await;

        match outcome {
            Ok(signature) => {
                *phase.lock().expect("phase lock") = RequestPhase::Done;
                self.metrics.signing_completed.fetch_add(1, Ordering::Relaxed);
                let raw = signature.to_bytes().to_vec();
                info!(signature = %hex::encode(&raw), "signing ceremony complete");
                self.bus
                    .broadcast(WirePayload::SignatureComplete {
                        request_id,
                        signature: hex::encode(&raw),
                        participants: participants.to_list(),
                    })
                    .await;
                let _ = self.events.send(CoordinatorEvent::SignatureComplete {
                    request_id,
                    signal_id,
                    signature: raw,
                    participants: participants.to_list(),
                });
            }
            Err(err) => {
                warn!(error = %err, "signing ceremony failed");
                *phase.lock().expect("phase lock") = RequestPhase::Failed(err.to_string());
                self.metrics.signing_failed.fetch_add(1, Ordering::Relaxed);
                let _ = self.events.send(CoordinatorEvent::RequestFailed {
                    request_id,
                    reason: err.to_string(),
                });
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn ceremony_inner(
        &self,
        request_id: RequestId,
        message: [u8; 32],
        participants: &ParticipantSet,
        artifacts: &GroupArtifacts,
        leader: bool,
        phase: &Arc<StdMutex<RequestPhase>>,
        mailbox: mpsc::Receiver<WireMessage>,
    ) -> Result<AggregatedSignature, SigningError> {
        *phase.lock().expect("phase lock") = RequestPhase::AwaitingPartials;
        let deadline = tokio::time::Instant::now() + self.cfg.signing_timeout;
        let mut mailbox = PhasedMailbox::new(mailbox);
        let me = self.cfg.party_id;
        let others: Vec<PartyId> = participants.iter().filter(|p| *p != me).collect();

        if leader {
            for peer in self.bus.peers() {
                let _ = self
                    .bus
                    .send(
                        peer,
                        WirePayload::SigningRequest {
                            request_id,
                            message: hex::encode(message),
                            participants: participants.to_list(),
                        },
                    )
                    .await;
            }
        }

        // Inner round one: hash commitments to the signing nonces.
        let own_nonce = self.key_store.nonce_commit(&self.cfg.key_id, &request_id).await?;
        let own_commitment = nonce_commitment_hash(&request_id, me, &own_nonce.0);
        for peer in &others {
            if let Err(err) = self
                .bus
                .send(
                    *peer,
                    WirePayload::NonceCommitment {
                        request_id,
                        party_id: me,
                        commitment: hex::encode(own_commitment),
                    },
                )
                .await
            {
                warn!(peer = %peer, error = %err, "nonce commitment delivery failed");
            }
        }

        let mut commitments: BTreeMap<PartyId, [u8; 32]> = BTreeMap::new();
        commitments.insert(me, own_commitment);
        while commitments.len() < participants.len() {
            let msg = mailbox
                .next_for(CeremonyPhase::NonceCommit, deadline)
                .await
                .map_err(|_| SigningError::NonceExchangeTimeout { request_id })?;
            if let WirePayload::NonceCommitment {
                party_id, commitment, ..
            } = msg.payload
            {
                if !participants.contains(party_id) {
                    warn!(party = %party_id, "nonce commitment from outside the participant set");
                    continue;
                }
                let Ok(raw) = decode_digest32(&commitment) else {
                    warn!(party = %party_id, "malformed nonce commitment");
                    continue;
                };
                commitments.entry(party_id).or_insert(raw);
            }
        }

        // Inner round two: reveal the points, check them against the
        // commitments.
        for peer in &others {
            if let Err(err) = self
                .bus
                .send(
                    *peer,
                    WirePayload::NonceReveal {
                        request_id,
                        party_id: me,
                        nonce_point: hex::encode(own_nonce.0),
                    },
                )
                .await
            {
                warn!(peer = %peer, error = %err, "nonce reveal delivery failed");
            }
        }

        let mut nonce_points: BTreeMap<PartyId, ProjectivePoint> = BTreeMap::new();
        nonce_points.insert(me, crate::curve::point_from_bytes(&own_nonce.0)?);
        while nonce_points.len() < participants.len() {
            let msg = mailbox
                .next_for(CeremonyPhase::NonceReveal, deadline)
                .await
                .map_err(|_| SigningError::NonceExchangeTimeout { request_id })?;
            if let WirePayload::NonceReveal {
                party_id, nonce_point, ..
            } = msg.payload
            {
                if !participants.contains(party_id) || nonce_points.contains_key(&party_id) {
                    continue;
                }
                let Ok(point_raw) = decode_point33(&nonce_point) else {
                    warn!(party = %party_id, "malformed nonce reveal");
                    continue;
                };
                let expected = commitments.get(&party_id).copied();
                if expected != Some(nonce_commitment_hash(&request_id, party_id, &point_raw)) {
                    return Err(SigningError::NonceCommitmentMismatch { party: party_id });
                }
                nonce_points.insert(party_id, point_from_hex(&nonce_point)?);
            }
        }

        // Group nonce, challenge, own partial through the key store.
        let group_nonce = nonce_points
            .values()
            .fold(ProjectivePoint::IDENTITY, |acc, p| acc + p);
        let c = challenge(&group_nonce, &artifacts.group_key, &message);
        let participant_ids: Vec<PartyId> = participants.iter().collect();
        let own_lambda = lagrange_at_zero(&participant_ids, me)?;
        let own_response = self.key_store.sign(&self.cfg.key_id, &request_id, c, own_lambda).await?;

        let own_partial = PartialSig {
            party: me,
            nonce_point: nonce_points[&me],
            response: own_response,
        };
        let own_public_share = artifacts
            .public_share(me)
            .copied()
            .ok_or(SigningError::NoKeyShare)?;
        if !verify_partial(&own_partial, &c, &own_lambda, &own_public_share) {
            return Err(SigningError::InvalidPartial { party: me });
        }

        for peer in &others {
            if let Err(err) = self
                .bus
                .send(
                    *peer,
                    WirePayload::PartialSignature {
                        request_id,
                        party_id: me,
                        nonce_point: point_to_hex(&own_partial.nonce_point),
                        partial: scalar_to_hex(&own_partial.response),
                        public_key_share: point_to_hex(&own_public_share),
                    },
                )
                .await
            {
                warn!(peer = %peer, error = %err, "partial signature delivery failed");
            }
        }

        // Partial collection: at most one per party, verified on arrival,
        // rejections logged and counted. Aggregation runs once the map holds
        // t partials including this party's own.
        let mut partials: BTreeMap<PartyId, PartialSig> = BTreeMap::new();
        partials.insert(me, own_partial);

        while partials.len() < participants.len() {
            let msg = match mailbox.next_for(CeremonyPhase::Partial, deadline).await {
                Ok(msg) => msg,
                Err(MailboxError::Timeout) => {
                    return Err(SigningError::InsufficientPartials {
                        got: partials.len(),
                        need: participants.len(),
                    });
                }
                Err(MailboxError::Closed) => {
                    return Err(SigningError::InsufficientPartials {
                        got: partials.len(),
                        need: participants.len(),
                    });
                }
            };
            match msg.payload {
                WirePayload::PartialSignature {
                    party_id,
                    nonce_point,
                    partial,
                    ..
                } => {
                    if !participants.contains(party_id) {
                        warn!(party = %party_id, "rejecting partial from unexpected participant");
                        self.metrics.partials_rejected.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    if partials.contains_key(&party_id) {
                        debug!(party = %party_id, "duplicate partial, keeping the first");
                        continue;
                    }
                    let parsed = point_from_hex(&nonce_point)
                        .and_then(|nonce_point| {
                            Ok(PartialSig {
                                party: party_id,
                                nonce_point,
                                response: crate::curve::scalar_from_hex(&partial)?,
                            })
                        });
                    let Ok(candidate) = parsed else {
                        warn!(party = %party_id, "undecodable partial signature, rejecting");
                        self.metrics.partials_rejected.fetch_add(1, Ordering::Relaxed);
                        continue;
                    };
                    // The revealed nonce point is the committed one; a
                    // partial carrying any other point is rejected outright.
                    if nonce_points.get(&party_id) != Some(&candidate.nonce_point) {
                        warn!(party = %party_id, "partial nonce point differs from reveal, rejecting");
                        self.metrics.partials_rejected.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    let lambda = lagrange_at_zero(&participant_ids, party_id)?;
                    let Some(public_share) = artifacts.public_share(party_id) else {
                        warn!(party = %party_id, "no recorded public share, rejecting partial");
                        self.metrics.partials_rejected.fetch_add(1, Ordering::Relaxed);
                        continue;
                    };
                    if !verify_partial(&candidate, &c, &lambda, public_share) {
                        warn!(party = %party_id, "partial failed verification against its public share");
                        self.metrics.partials_rejected.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    partials.insert(party_id, candidate);
                }
                WirePayload::SignatureComplete { signature, .. } => {
                    // A faster participant aggregated first; adopt its result
                    // if it verifies against the group key and message.
                    if let Ok(raw) = hex::decode(signature.trim()) {
                        if let Ok(candidate) = AggregatedSignature::from_bytes(&raw) {
                            if verify_signature(&artifacts.group_key, &message, &candidate) {
                                debug!("adopting remotely aggregated signature");
                                return Ok(candidate);
                            }
                        }
                    }
                    warn!("remote completion failed verification, continuing locally");
                }
                _ => {}
            }
        }

        *phase.lock().expect("phase lock") = RequestPhase::Aggregating;
        let ordered: Vec<PartialSig> = partials.into_values().collect();
        let signature = aggregate(&ordered);
        if !verify_signature(&artifacts.group_key, &message, &signature) {
            return Err(SigningError::AggregationInvalid);
        }
        Ok(signature)
    }
}

fn decode_digest32(raw: &str) -> Result<[u8; 32], ()> {
    let bytes = hex::decode(raw.trim()).map_err(|_| ())?;
    bytes.try_into().map_err(|_| ())
}

fn decode_point33(raw: &str) -> Result<[u8; 33], ()> {
    let bytes = hex::decode(raw.trim()).map_err(|_| ())?;
    bytes.try_into().map_err(|_| ())
}

/// Ceremony sub-phases in wire order. Senders emit commitment → reveal →
/// partial, and the bus is FIFO per sender, so a message for a later phase
/// is parked rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CeremonyPhase {
    NonceCommit,
    NonceReveal,
    Partial,
}

fn phase_of(payload: &WirePayload) -> Option<CeremonyPhase> {
    match payload {
        WirePayload::NonceCommitment { .. } => Some(CeremonyPhase::NonceCommit),
        WirePayload::NonceReveal { .. } => Some(CeremonyPhase::NonceReveal),
        // Completions can arrive at any point and are handled inside the
        // partial loop.
        WirePayload::PartialSignature { .. } | WirePayload::SignatureComplete { .. } => Some(CeremonyPhase::Partial),
        _ => None,
    }
}

enum MailboxError {
    Timeout,
    Closed,
}

/// Mailbox that parks messages belonging to a later ceremony phase instead
/// of discarding them.
struct PhasedMailbox {
    rx: mpsc::Receiver<WireMessage>,
    parked: VecDeque<WireMessage>,
}

impl PhasedMailbox {
    fn new(rx: mpsc::Receiver<WireMessage>) -> Self {
        Self {
            rx,
            parked: VecDeque::new(),
        }
    }

    async fn next_for(&mut self, phase: CeremonyPhase, deadline: tokio::time::Instant) -> Result<WireMessage, MailboxError> {
        if let Some(index) = self
            .parked
            .iter()
            .position(|msg| phase_of(&msg.payload) == Some(phase))
        {
            return Ok(self.parked.remove(index).expect("index in bounds"));
        }

        loop {
            let msg = match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(msg)) => msg,
                Ok(None) => return Err(MailboxError::Closed),
                Err(_) => return Err(MailboxError::Timeout),
            };
            match phase_of(&msg.payload) {
                Some(msg_phase) if msg_phase == phase => return Ok(msg),
                Some(msg_phase) if msg_phase > phase => self.parked.push_back(msg),
                Some(_) => debug!(kind = msg.payload.kind(), "dropping message for an earlier ceremony phase"),
                None => {}
            }
        }
    }
}
