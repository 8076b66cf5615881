use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use k256::elliptic_curve::Field;
use k256::{ProjectivePoint, Scalar};
use uuid::Uuid;

use bridge_types::{PartyId, ThresholdParams};
use transport_bus::{MemoryNetwork, PartyIdentity, TransportBus, WirePayload};
use tss::curve::{compress, point_to_hex};
use tss::dkg::{DkgCeremonyConfig, DkgEngine, DkgOutcome, DkgRound};
use tss::errors::DkgError;
use tss::poly::{SecretPolynomial, lagrange_at_zero};
use tss::proof::prove_constant_term;
use tss::share_crypto::{encrypt_share, share_context};

fn party(id: u16) -> PartyId {
    PartyId::new(id).unwrap()
}

fn identities(n: u16) -> BTreeMap<PartyId, PartyIdentity> {
    (1..=n).map(|id| (party(id), PartyIdentity::generate())).collect()
}

fn identity_points(identities: &BTreeMap<PartyId, PartyIdentity>) -> BTreeMap<PartyId, ProjectivePoint> {
    identities
        .iter()
        .map(|(p, identity)| (*p, ProjectivePoint::GENERATOR * identity.dh_scalar()))
        .collect()
}

fn engine_for(
    ceremony_id: Uuid,
    p: PartyId,
    params: ThresholdParams,
    round_timeout: Duration,
    network: &Arc<MemoryNetwork>,
    ids: &BTreeMap<PartyId, PartyIdentity>,
) -> DkgEngine {
    let (bus, rx) = network.join(p);
    let mut peers = identity_points(ids);
    peers.remove(&p);
    DkgEngine::new(
        DkgCeremonyConfig {
            ceremony_id,
            party_id: p,
            params,
            round_timeout,
        },
        bus,
        ids[&p].dh_scalar(),
        peers,
        rx,
    )
    .unwrap()
}

#[tokio::test]
async fn five_party_ceremony_agrees_on_the_group_key() -> anyhow::Result<()> {
    let params = ThresholdParams::new(3, 5)?;
    let ceremony_id = Uuid::new_v4();
    let network = MemoryNetwork::new();
    let ids = identities(5);

    // Join everyone before any engine broadcasts.
    let engines: Vec<DkgEngine> = (1..=5)
        .map(|id| engine_for(ceremony_id, party(id), params, Duration::from_secs(10), &network, &ids))
        .collect();
    let handles: Vec<_> = engines.into_iter().map(|engine| tokio::spawn(engine.run())).collect();

    let mut outcomes: Vec<DkgOutcome> = Vec::new();
    for handle in handles {
        outcomes.push(handle.await?.expect("ceremony must succeed"));
    }

    // Every honest party computes the identical group key, 33 bytes
    // compressed.
    let group_key = outcomes[0].group_key;
    assert_eq!(compress(&group_key).len(), 33);
    for outcome in &outcomes {
        assert_eq!(outcome.group_key, group_key, "group keys diverge");
        assert!(!bool::from(outcome.key_share.is_zero()), "key share must be non-zero");
        assert_eq!(
            ProjectivePoint::GENERATOR * outcome.key_share,
            outcome.public_share,
            "public share must match the secret share"
        );
    }

    // Lagrange-weighted public shares of any quorum recombine to the group
    // key.
    for quorum in [[1u16, 2, 3], [2, 4, 5], [1, 3, 5]] {
        let participants: Vec<PartyId> = quorum.iter().map(|id| party(*id)).collect();
        let mut sum = ProjectivePoint::IDENTITY;
        for p in &participants {
            let lambda = lagrange_at_zero(&participants, *p)?;
            let outcome = &outcomes[(p.as_u16() - 1) as usize];
            sum += outcome.public_share * lambda;
        }
        assert_eq!(sum, group_key, "quorum {quorum:?} does not recombine to the group key");
    }

    Ok(())
}

#[tokio::test]
async fn dropped_party_times_out_with_the_missing_round() -> anyhow::Result<()> {
    let params = ThresholdParams::new(3, 5)?;
    let ceremony_id = Uuid::new_v4();
    let network = MemoryNetwork::new();
    let ids = identities(5);

    let engines: Vec<DkgEngine> = [1u16, 2, 3, 5]
        .into_iter()
        .map(|id| engine_for(ceremony_id, party(id), params, Duration::from_secs(2), &network, &ids))
        .collect();

    // Party 4 commits, then goes dark: it never distributes shares. Its
    // inbox stays open so deliveries to it keep succeeding. It joins (and
    // commits) before the honest engines start.
    let (bus4, _rx4_keepalive) = network.join(party(4));
    let poly = SecretPolynomial::random(params.threshold);
    let commitments = poly.commitments();
    let proof = prove_constant_term(&ceremony_id, party(4), poly.constant_term(), &commitments[0]);
    bus4.broadcast(WirePayload::DkgCommitment {
        ceremony_id,
        party_id: party(4),
        commitments: commitments.iter().map(point_to_hex).collect(),
        proof: proof.to_wire(),
    })
    .await;

    let handles: Vec<_> = engines.into_iter().map(|engine| tokio::spawn(engine.run())).collect();

    for handle in handles {
        match handle.await? {
            Err(DkgError::Timeout { round, missing }) => {
                assert_eq!(round, DkgRound::R3Share);
                assert_eq!(missing, vec![party(4)]);
            }
            other => panic!("expected share-round timeout, got {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn corrupted_share_aborts_the_ceremony() -> anyhow::Result<()> {
    let params = ThresholdParams::new(2, 3)?;
    let ceremony_id = Uuid::new_v4();
    let network = MemoryNetwork::new();
    let ids = identities(3);
    let points = identity_points(&ids);

    let engine1 = engine_for(ceremony_id, party(1), params, Duration::from_secs(5), &network, &ids);
    let engine2 = engine_for(ceremony_id, party(2), params, Duration::from_secs(5), &network, &ids);
    let handle1 = tokio::spawn(engine1.run());
    let handle2 = tokio::spawn(engine2.run());

    // Party 3 deals honestly to party 2 but corrupts the share for party 1.
    let (bus3, _rx3_keepalive) = network.join(party(3));
    let poly = SecretPolynomial::random(params.threshold);
    let commitments = poly.commitments();
    let proof = prove_constant_term(&ceremony_id, party(3), poly.constant_term(), &commitments[0]);
    bus3.broadcast(WirePayload::DkgCommitment {
        ceremony_id,
        party_id: party(3),
        commitments: commitments.iter().map(point_to_hex).collect(),
        proof: proof.to_wire(),
    })
    .await;

    for recipient in [party(1), party(2)] {
        let mut share = poly.evaluate(recipient);
        if recipient == party(1) {
            share += Scalar::ONE;
        }
        let context = share_context(&ceremony_id, party(3), recipient);
        let encrypted_share = encrypt_share(&points[&recipient], &share, &context).unwrap();
        bus3.send(
            recipient,
            WirePayload::DkgShare {
                ceremony_id,
                from_party: party(3),
                to_party: recipient,
                encrypted_share,
            },
        )
        .await
        .unwrap();
    }

    match handle1.await? {
        Err(DkgError::ShareRejected { party: p }) => assert_eq!(p, party(3)),
        other => panic!("party 1 should reject the share, got {other:?}"),
    }
    match handle2.await? {
        Err(DkgError::Aborted { by, .. }) => assert_eq!(by, party(1)),
        Err(DkgError::Timeout { .. }) => {
            // Party 2 may already be past the point where the complaint can
            // reach its collection loop only if the abort raced the final
            // round; either way the ceremony must not succeed.
        }
        other => panic!("party 2 must not complete the ceremony, got {other:?}"),
    }
    Ok(())
}
