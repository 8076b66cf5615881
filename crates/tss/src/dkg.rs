//! Feldman-VSS Pedersen distributed key generation over secp256k1.
//!
//! Seven logical rounds driven over the bus:
//! commit → verify → share → verify → assemble → public share → aggregate.
//! The state machine only moves forward; messages for a later round are
//! buffered, duplicates within a round are dropped after the first accepted
//! one, and every collection phase runs under its own deadline.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use k256::{ProjectivePoint, Scalar};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use bridge_types::{PartyId, ThresholdParams};
use transport_bus::{TransportBus, WireMessage, WirePayload};

use crate::curve::{point_from_hex, point_to_hex};
use crate::errors::DkgError;
use crate::poly::{SecretPolynomial, expected_share_point, verify_share};
use crate::proof::{ProofOfKnowledge, prove_constant_term, verify_constant_term};
use crate::share_crypto::{decrypt_share, encrypt_share, share_context};

/// Protocol rounds, strictly ordered. Collection phases wait for the
/// previous round's messages; the round named in a timeout is the one whose
/// messages never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DkgRound {
    R1Commit,
    R2Verify,
    R3Share,
    R4Verify,
    R5Assemble,
    R6PubShare,
    R7Aggregate,
}

#[derive(Debug, Clone)]
pub struct DkgCeremonyConfig {
    pub ceremony_id: Uuid,
    pub party_id: PartyId,
    pub params: ThresholdParams,
    pub round_timeout: Duration,
}

/// Everything a successful ceremony hands back for persistence.
pub struct DkgOutcome {
    pub ceremony_id: Uuid,
    pub key_share: Scalar,
    pub public_share: ProjectivePoint,
    pub group_key: ProjectivePoint,
    pub commitments: BTreeMap<PartyId, Vec<ProjectivePoint>>,
    pub participants: Vec<PartyId>,
}

impl std::fmt::Debug for DkgOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DkgOutcome")
            .field("ceremony_id", &self.ceremony_id)
            .field("key_share", &"<redacted>")
            .field("group_key", &point_to_hex(&self.group_key))
            .field("participants", &self.participants)
            .finish()
    }
}

struct CommitmentSet {
    commitments: Vec<ProjectivePoint>,
}

pub struct DkgEngine {
    cfg: DkgCeremonyConfig,
    bus: Arc<dyn TransportBus>,
    /// Transport identity secret, used to decrypt incoming shares.
    identity_secret: Scalar,
    /// Peer transport identity points, used to encrypt outgoing shares.
    peer_identities: BTreeMap<PartyId, ProjectivePoint>,
    inbox: mpsc::Receiver<WireMessage>,
    buffered: BTreeMap<DkgRound, VecDeque<WireMessage>>,
}

impl DkgEngine {
    pub fn new(
        cfg: DkgCeremonyConfig,
        bus: Arc<dyn TransportBus>,
        identity_secret: Scalar,
        peer_identities: BTreeMap<PartyId, ProjectivePoint>,
        inbox: mpsc::Receiver<WireMessage>,
    ) -> Result<Self, DkgError> {
        if !cfg.params.contains(cfg.party_id) {
            return Err(DkgError::InvalidParameters(format!(
                "party {} outside committee of {}",
                cfg.party_id, cfg.params.total_parties
            )));
        }
        Ok(Self {
            cfg,
            bus,
            identity_secret,
            peer_identities,
            inbox,
            buffered: BTreeMap::new(),
        })
    }

    fn others(&self) -> Vec<PartyId> {
        self.cfg
            .params
            .all_parties()
            .filter(|p| *p != self.cfg.party_id)
            .collect()
    }

    /// The round an inbound message belongs to; `None` for messages this
    /// engine never consumes.
    fn message_round(payload: &WirePayload) -> Option<DkgRound> {
        match payload {
            WirePayload::DkgCommitment { .. } => Some(DkgRound::R1Commit),
            WirePayload::DkgShare { .. } => Some(DkgRound::R3Share),
            WirePayload::DkgPublicKeyShare { .. } => Some(DkgRound::R6PubShare),
            _ => None,
        }
    }

    /// Collects one message per expected party for `round`, buffering
    /// anything that belongs to a later round and dropping duplicates and
    /// stale traffic. A complaint from any party aborts the ceremony.
    async fn collect_round(
        &mut self,
        round: DkgRound,
        mut expected: BTreeSet<PartyId>,
    ) -> Result<Vec<WireMessage>, DkgError> {
        let deadline = Instant::now() + self.cfg.round_timeout;
        let mut collected: Vec<WireMessage> = Vec::new();
        let mut seen: BTreeSet<PartyId> = BTreeSet::new();

        let mut pending: VecDeque<WireMessage> = self.buffered.remove(&round).unwrap_or_default();

        while !expected.is_empty() {
            let message = if let Some(message) = pending.pop_front() {
                message
            } else {
                match tokio::time::timeout_at(deadline, self.inbox.recv()).await {
                    Ok(Some(message)) => message,
                    Ok(None) => return Err(DkgError::ChannelClosed),
                    Err(_) => {
                        return Err(DkgError::Timeout {
                            round,
                            missing: expected.into_iter().collect(),
                        });
                    }
                }
            };

            if message.payload.ceremony_id() != Some(self.cfg.ceremony_id) {
                debug!(sender = %message.sender, "ignoring message for foreign ceremony");
                continue;
            }

            if let WirePayload::DkgComplaint {
                from_party,
                against_party,
                reason,
                ..
            } = &message.payload
            {
                warn!(%from_party, %against_party, %reason, "ceremony aborted by complaint");
                return Err(DkgError::Aborted {
                    ceremony_id: self.cfg.ceremony_id,
                    by: *from_party,
                    reason: reason.clone(),
                });
            }

            let Some(message_round) = Self::message_round(&message.payload) else {
                continue;
            };

            if message_round > round {
                self.buffered.entry(message_round).or_default().push_back(message);
                continue;
            }
            if message_round < round {
                debug!(sender = %message.sender, ?message_round, "dropping stale round message");
                continue;
            }

            if !seen.insert(message.sender) {
                debug!(sender = %message.sender, ?round, "ignoring duplicate round message");
                continue;
            }
            expected.remove(&message.sender);
            collected.push(message);
        }

        Ok(collected)
    }

    /// Runs the full ceremony to completion.
    #[instrument(
        skip(self),
        fields(ceremony_id = %self.cfg.ceremony_id, party_id = %self.cfg.party_id)
    )]
    pub async fn run(mut self) -> Result<DkgOutcome, DkgError> {
        let params = self.cfg.params;
        info!(
            threshold = params.threshold,
            total_parties = params.total_parties,
            "starting key generation ceremony"
        );

        // Round 1: sample the polynomial, commit, prove knowledge of the
        // constant term, broadcast.
        let poly = SecretPolynomial::random(params.threshold);
        let own_commitments = poly.commitments();
        let proof = prove_constant_term(
            &self.cfg.ceremony_id,
            self.cfg.party_id,
            poly.constant_term(),
            &own_commitments[0],
        );
        let report = self
            .bus
            .broadcast(WirePayload::DkgCommitment {
                ceremony_id: self.cfg.ceremony_id,
                party_id: self.cfg.party_id,
                commitments: own_commitments.iter().map(point_to_hex).collect(),
                proof: proof.to_wire(),
            })
            .await;
        if !report.fully_delivered() {
            warn!(failed = ?report.failed, "commitment broadcast reached only part of the committee");
        }

        // Round 2: verify every received commitment set.
        let mut commitment_sets: BTreeMap<PartyId, CommitmentSet> = BTreeMap::new();
        commitment_sets.insert(
            self.cfg.party_id,
            CommitmentSet {
                commitments: own_commitments,
            },
        );
        let messages = self
            .collect_round(DkgRound::R1Commit, self.others().into_iter().collect())
            .await?;
        for message in messages {
            let WirePayload::DkgCommitment {
                party_id,
                commitments,
                proof,
                ..
            } = message.payload
            else {
                continue;
            };
            if commitments.len() != params.threshold as usize {
                return Err(DkgError::InvalidCommitmentCount {
                    party: party_id,
                    expected: params.threshold as usize,
                    got: commitments.len(),
                });
            }
            let points = commitments
                .iter()
                .map(|raw| point_from_hex(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let proof = ProofOfKnowledge::from_wire(&proof)?;
            if !verify_constant_term(&self.cfg.ceremony_id, party_id, &points[0], &proof) {
                return Err(DkgError::ProofRejected { party: party_id });
            }
            commitment_sets.insert(party_id, CommitmentSet { commitments: points });
        }
        debug!("commitments verified");

        // Round 3: evaluate the polynomial at every other party's id and
        // send each share encrypted to its recipient.
        for recipient in self.others() {
            let share = poly.evaluate(recipient);
            let recipient_point =
                self.peer_identities
                    .get(&recipient)
                    .ok_or_else(|| DkgError::InvalidParameters(format!(
                        "no transport identity registered for party {recipient}"
                    )))?;
            let context = share_context(&self.cfg.ceremony_id, self.cfg.party_id, recipient);
            let encrypted_share = encrypt_share(recipient_point, &share, &context)?;
            // Best effort: an unreachable recipient shows up as a missing
            // party at its own round deadline, not as our failure.
            if let Err(err) = self
                .bus
                .send(
                    recipient,
                    WirePayload::DkgShare {
                        ceremony_id: self.cfg.ceremony_id,
                        from_party: self.cfg.party_id,
                        to_party: recipient,
                        encrypted_share,
                    },
                )
                .await
            {
                warn!(%recipient, error = %err, "share delivery failed");
            }
        }
        let self_share = poly.evaluate(self.cfg.party_id);

        // Round 4: Feldman-verify every received share against the sender's
        // commitments; a bad share is complained about, never accepted.
        let mut received_shares: BTreeMap<PartyId, Scalar> = BTreeMap::new();
        received_shares.insert(self.cfg.party_id, self_share);
        let messages = self
            .collect_round(DkgRound::R3Share, self.others().into_iter().collect())
            .await?;
        for message in messages {
            let WirePayload::DkgShare {
                from_party,
                to_party,
                encrypted_share,
                ..
            } = message.payload
            else {
                continue;
            };
            if to_party != self.cfg.party_id {
                warn!(%from_party, %to_party, "dropping share addressed to another party");
                continue;
            }
            let context = share_context(&self.cfg.ceremony_id, from_party, self.cfg.party_id);
            let share = decrypt_share(&self.identity_secret, &encrypted_share, &context)
                .map_err(|_| DkgError::ShareRejected { party: from_party })?;

            let dealer_commitments = &commitment_sets
                .get(&from_party)
                .ok_or(DkgError::ShareRejected { party: from_party })?
                .commitments;
            if !verify_share(&share, self.cfg.party_id, dealer_commitments) {
                warn!(party = %from_party, "share failed Feldman verification, broadcasting complaint");
                self.bus
                    .broadcast(WirePayload::DkgComplaint {
                        ceremony_id: self.cfg.ceremony_id,
                        from_party: self.cfg.party_id,
                        against_party: from_party,
                        reason: "share does not match commitments".to_string(),
                    })
                    .await;
                return Err(DkgError::ShareRejected { party: from_party });
            }
            received_shares.insert(from_party, share);
        }
        debug!("shares verified");

        // Round 5: assemble the long-lived key share.
        let key_share = received_shares.values().fold(Scalar::ZERO, |acc, s| acc + s);
        let public_share = ProjectivePoint::GENERATOR * key_share;

        // Round 6: announce the public share.
        self.bus
            .broadcast(WirePayload::DkgPublicKeyShare {
                ceremony_id: self.cfg.ceremony_id,
                party_id: self.cfg.party_id,
                public_key_share: point_to_hex(&public_share),
            })
            .await;

        // Round 7: cross-check every announced public share against the
        // Feldman-expected value and aggregate the group key.
        let expected_public = |party: PartyId| {
            commitment_sets
                .values()
                .fold(ProjectivePoint::IDENTITY, |acc, set| {
                    acc + expected_share_point(&set.commitments, party)
                })
        };
        if public_share != expected_public(self.cfg.party_id) {
            return Err(DkgError::InconsistentPublicShare {
                party: self.cfg.party_id,
            });
        }

        let messages = self
            .collect_round(DkgRound::R6PubShare, self.others().into_iter().collect())
            .await?;
        for message in messages {
            let WirePayload::DkgPublicKeyShare {
                party_id,
                public_key_share,
                ..
            } = message.payload
            else {
                continue;
            };
            let announced = point_from_hex(&public_key_share)?;
            if announced != expected_public(party_id) {
                return Err(DkgError::InconsistentPublicShare { party: party_id });
            }
        }

        let group_key = commitment_sets
            .values()
            .fold(ProjectivePoint::IDENTITY, |acc, set| acc + set.commitments[0]);

        info!(group_key = %point_to_hex(&group_key), "key generation ceremony complete");

        Ok(DkgOutcome {
            ceremony_id: self.cfg.ceremony_id,
            key_share,
            public_share,
            group_key,
            commitments: commitment_sets
                .into_iter()
                .map(|(party, set)| (party, set.commitments))
                .collect(),
            participants: params.all_parties().collect(),
        })
    }
}
