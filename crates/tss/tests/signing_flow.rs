use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use k256::ProjectivePoint;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use bridge_types::{PartyId, SignalEvent, SignalId, ThresholdParams};
use key_store::{KeyId, MemoryKeyStore};
use transport_bus::{MemoryBus, MemoryNetwork, PartyIdentity, PeerDirectory, TransportBus, WireMessage, WirePayload};
use tss::canonical::canonical_message;
use tss::curve::{compress, point_from_hex, point_to_hex, scalar_to_hex};
use tss::signing::{AggregatedSignature, nonce_commitment_hash, verify_signature};
use tss::{CoordinatorEvent, NodeConfig, NodeMetrics, TssNode};

fn party(id: u16) -> PartyId {
    PartyId::new(id).unwrap()
}

struct TestNode {
    node: Arc<TssNode>,
    metrics: Arc<NodeMetrics>,
    signal_tx: mpsc::Sender<SignalEvent>,
    events: broadcast::Receiver<CoordinatorEvent>,
    cancel: CancellationToken,
}

async fn start_committee(
    network: &Arc<MemoryNetwork>,
    params: ThresholdParams,
    identities: &BTreeMap<PartyId, PartyIdentity>,
) -> Vec<TestNode> {
    let mut directory = PeerDirectory::new();
    for (p, identity) in identities {
        directory.insert(*p, identity.verifying_key());
    }

    let mut nodes = Vec::new();
    for id in 1..=params.total_parties {
        let p = party(id);
        let (bus, inbox) = network.join(p);
        let (signal_tx, signal_rx) = mpsc::channel(64);
        let metrics = Arc::new(NodeMetrics::new());
        let cancel = CancellationToken::new();
        let node = TssNode::start(
            NodeConfig {
                party_id: p,
                params,
                key_id: KeyId::from("bridge-group"),
                round_timeout: Duration::from_secs(10),
                signing_timeout: Duration::from_secs(5),
                heartbeat_window: Duration::from_secs(10),
                heartbeat_period: Duration::from_millis(100),
                active_chains: vec![1],
            },
            bus,
            Arc::new(MemoryKeyStore::new()),
            identities[&p].clone(),
            directory.clone(),
            Arc::clone(&metrics),
            inbox,
            signal_rx,
            cancel.clone(),
        )
        .await;
        let events = node.coordinator().subscribe();
        nodes.push(TestNode {
            node,
            metrics,
            signal_tx,
            events,
            cancel,
        });
    }
    nodes
}

fn sample_event(tag: u8) -> SignalEvent {
    SignalEvent {
        chain_id: 1,
        signal_id: SignalId([tag; 32]),
        src_chain_id: 1,
        dst_chain_id: 56,
        src_address: [0xaa; 20],
        dst_address: [0xbb; 20],
        nonce: 7,
        payload: vec![0xde, 0xad],
        observed_tx_hash: [tag.wrapping_add(1); 32],
        block_number: 100,
        timestamp: 1_700_000_000,
    }
}

async fn wait_for_key_shares(nodes: &[TestNode]) {
    for _ in 0..100 {
        if nodes.iter().all(|n| n.node.coordinator().has_key_share()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("committee never finished key generation");
}

async fn next_event(rx: &mut broadcast::Receiver<CoordinatorEvent>, within: Duration) -> Option<CoordinatorEvent> {
    tokio::time::timeout(within, rx.recv()).await.ok().and_then(Result::ok)
}

#[tokio::test(flavor = "multi_thread")]
async fn happy_path_signs_and_dedups() -> anyhow::Result<()> {
    let params = ThresholdParams::new(3, 5)?;
    let network = MemoryNetwork::new();
    let identities: BTreeMap<PartyId, PartyIdentity> =
        (1..=5).map(|id| (party(id), PartyIdentity::generate())).collect();
    let mut nodes = start_committee(&network, params, &identities).await;

    // Let a heartbeat round propagate so everyone is "available".
    tokio::time::sleep(Duration::from_millis(300)).await;

    let summary = nodes[0].node.start_dkg(None).await?;
    wait_for_key_shares(&nodes).await;
    let group_key = point_from_hex(&summary.group_key)?;

    // Every monitor observes the same confirmed event.
    let event = sample_event(0x01);
    for node in &nodes {
        node.signal_tx.send(event.clone()).await?;
    }

    // The selected trio completes with participants [1,2,3]; the signature
    // verifies against the group key and canonical message.
    let message = canonical_message(&event);
    for selected in nodes.iter_mut().take(3) {
        let completed = loop {
            match next_event(&mut selected.events, Duration::from_secs(10)).await {
                Some(CoordinatorEvent::SignatureComplete {
                    signature,
                    participants,
                    signal_id,
                    ..
                }) => break (signature, participants, signal_id),
                Some(_) => continue,
                None => panic!("selected party never emitted a completion"),
            }
        };
        let (signature, participants, signal_id) = completed;
        assert_eq!(participants, vec![1, 2, 3]);
        assert_eq!(signal_id, event.signal_id);
        let parsed = AggregatedSignature::from_bytes(&signature)?;
        assert!(verify_signature(&group_key, &message, &parsed));
    }

    // The two spare parties record a NOT_SELECTED outcome.
    for spare in nodes.iter_mut().skip(3) {
        match next_event(&mut spare.events, Duration::from_secs(10)).await {
            Some(CoordinatorEvent::NotSelected { .. }) => {}
            other => panic!("expected NOT_SELECTED, got {other:?}"),
        }
    }

    // Re-observing the same signal is a no-op: no second emission, nothing
    // pending.
    for node in &nodes {
        node.signal_tx.send(event.clone()).await?;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(next_event(&mut nodes[0].events, Duration::from_millis(200)).await.is_none());
    assert!(nodes[0].node.coordinator().pending().await.is_empty());
    assert_eq!(nodes[0].metrics.signing_completed.load(Ordering::Relaxed), 1);

    for node in &nodes {
        node.cancel.cancel();
    }
    Ok(())
}

/// Plays the signing ceremony honestly through the nonce exchange, then
/// contributes a garbage partial.
async fn malicious_signer(
    bus: Arc<MemoryBus>,
    mut inbox: mpsc::Receiver<WireMessage>,
    me: PartyId,
    cancel: CancellationToken,
) {
    let heartbeat_bus = Arc::clone(&bus);
    let heartbeat_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            tokio::select! {
                _ = heartbeat_cancel.cancelled() => break,
                _ = interval.tick() => {
                    heartbeat_bus
                        .broadcast(WirePayload::Heartbeat {
                            uptime_secs: 1,
                            active_chains: vec![1],
                            pending: 0,
                            has_key_share: true,
                        })
                        .await;
                }
            }
        }
    });

    while let Some(message) = inbox.recv().await {
        if cancel.is_cancelled() {
            break;
        }
        let WirePayload::SigningRequest {
            request_id,
            participants,
            ..
        } = message.payload
        else {
            continue;
        };
        if !participants.contains(&me.as_u16()) {
            continue;
        }
        let others: Vec<PartyId> = participants
            .iter()
            .filter(|id| **id != me.as_u16())
            .map(|id| party(*id))
            .collect();

        let nonce = tss::curve::random_nonzero_scalar();
        let nonce_point = ProjectivePoint::GENERATOR * nonce;
        let nonce_bytes = compress(&nonce_point);
        let commitment = nonce_commitment_hash(&request_id, me, &nonce_bytes);

        for peer in &others {
            let _ = bus
                .send(
                    *peer,
                    WirePayload::NonceCommitment {
                        request_id,
                        party_id: me,
                        commitment: hex::encode(commitment),
                    },
                )
                .await;
            let _ = bus
                .send(
                    *peer,
                    WirePayload::NonceReveal {
                        request_id,
                        party_id: me,
                        nonce_point: point_to_hex(&nonce_point),
                    },
                )
                .await;
            // The response scalar is random: it matches the revealed nonce
            // point but not the signing relation.
            let _ = bus
                .send(
                    *peer,
                    WirePayload::PartialSignature {
                        request_id,
                        party_id: me,
                        nonce_point: point_to_hex(&nonce_point),
                        partial: scalar_to_hex(&tss::curve::random_nonzero_scalar()),
                        public_key_share: point_to_hex(&nonce_point),
                    },
                )
                .await;
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_partial_fails_the_request_and_rejections_are_counted() -> anyhow::Result<()> {
    let params = ThresholdParams::new(3, 5)?;
    let network = MemoryNetwork::new();
    let identities: BTreeMap<PartyId, PartyIdentity> =
        (1..=5).map(|id| (party(id), PartyIdentity::generate())).collect();
    let mut nodes = start_committee(&network, params, &identities).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    nodes[0].node.start_dkg(None).await?;
    wait_for_key_shares(&nodes).await;

    // Replace party 2 with a signer that completes the nonce exchange but
    // produces an invalid partial.
    nodes[1].cancel.cancel();
    let (rogue_bus, rogue_inbox) = network.join(party(2));
    let rogue_cancel = CancellationToken::new();
    tokio::spawn(malicious_signer(rogue_bus, rogue_inbox, party(2), rogue_cancel.clone()));

    // Party 4 (never selected) also fires a partial into the ceremony.
    let (outsider_bus, _outsider_inbox_keepalive) = network.join(party(4));

    tokio::time::sleep(Duration::from_millis(300)).await;

    let event = sample_event(0x42);
    nodes[0].signal_tx.send(event.clone()).await?;
    let request_id = event.request_id();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let outsider_nonce = ProjectivePoint::GENERATOR * tss::curve::random_nonzero_scalar();
    let _ = outsider_bus
        .send(
            party(1),
            WirePayload::PartialSignature {
                request_id,
                party_id: party(4),
                nonce_point: point_to_hex(&outsider_nonce),
                partial: scalar_to_hex(&tss::curve::random_nonzero_scalar()),
                public_key_share: point_to_hex(&outsider_nonce),
            },
        )
        .await;

    // The ceremony cannot reach t valid partials and fails at the deadline.
    let failed = loop {
        match next_event(&mut nodes[0].events, Duration::from_secs(15)).await {
            Some(CoordinatorEvent::RequestFailed { reason, .. }) => break reason,
            Some(_) => continue,
            None => panic!("request should have failed"),
        }
    };
    assert!(
        failed.contains("insufficient partial"),
        "unexpected failure reason: {failed}"
    );

    // Both the invalid partial and the outsider's partial were rejected.
    assert!(nodes[0].metrics.partials_rejected.load(Ordering::Relaxed) >= 2);
    assert_eq!(nodes[0].metrics.signing_completed.load(Ordering::Relaxed), 0);

    rogue_cancel.cancel();
    for node in &nodes {
        node.cancel.cancel();
    }
    Ok(())
}
