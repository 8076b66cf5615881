use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use bridge_types::PartyId;
use global_utils::common_resp::Empty;
use global_utils::common_types::unix_timestamp_ms;
use global_utils::http_client::HttpClient;

use crate::bus::{BroadcastReport, Sequencer, TransportBus};
use crate::envelope::SignedEnvelope;
use crate::errors::TransportError;
use crate::identity::PartyIdentity;
use crate::messages::{WireMessage, WirePayload};

/// Route every validator exposes for inbound bus traffic.
pub const TRANSPORT_MESSAGE_ENDPOINT: &str = "/api/transport/message";

/// Static description of one committee peer.
#[derive(Debug, Clone)]
pub struct PeerEndpoint {
    pub party_id: PartyId,
    pub endpoint: Url,
}

struct Peer {
    client: HttpClient,
}

/// HTTP realisation of the bus: each message is sealed in a signed envelope
/// and POSTed to the peer's transport endpoint; the receiving side verifies
/// the envelope and runs it through the shared dedup/FIFO lanes.
pub struct HttpBus {
    party: PartyId,
    identity: PartyIdentity,
    peers: BTreeMap<PartyId, Peer>,
    sequencer: Sequencer,
}

impl HttpBus {
    pub fn new(party: PartyId, identity: PartyIdentity, endpoints: Vec<PeerEndpoint>) -> Self {
        let peers = endpoints
            .into_iter()
            .filter(|peer| peer.party_id != party)
            .map(|peer| {
                (
                    peer.party_id,
                    Peer {
                        client: HttpClient::new(peer.endpoint),
                    },
                )
            })
            .collect();
        Self {
            party,
            identity,
            peers,
            sequencer: Sequencer::default(),
        }
    }

    #[instrument(level = "trace", skip(self, payload), fields(kind = payload.kind()))]
    async fn deliver(&self, to: PartyId, payload: WirePayload) -> Result<(), TransportError> {
        let peer = self.peers.get(&to).ok_or(TransportError::UnknownPeer(to))?;

        let context = payload.context();
        let message = WireMessage {
            sender: self.party,
            context: context.clone(),
            sequence: self.sequencer.next(to, &context).await,
            timestamp_ms: unix_timestamp_ms(),
            payload,
        };
        let envelope = SignedEnvelope::seal(self.identity.signing_key(), message)?;

        let _: Empty = peer
            .client
            .post(TRANSPORT_MESSAGE_ENDPOINT, Some(&envelope), None)
            .await
            .map_err(|e| TransportError::Delivery {
                to,
                reason: e.to_string(),
            })?;
        debug!(%to, "message delivered");
        Ok(())
    }
}

#[async_trait]
impl TransportBus for HttpBus {
    fn local_party(&self) -> PartyId {
        self.party
    }

    fn peers(&self) -> Vec<PartyId> {
        self.peers.keys().copied().collect()
    }

    async fn send(&self, to: PartyId, payload: WirePayload) -> Result<(), TransportError> {
        self.deliver(to, payload).await
    }

    async fn broadcast(&self, payload: WirePayload) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for peer in self.peers() {
            match self.deliver(peer, payload.clone()).await {
                Ok(()) => report.delivered.push(peer),
                Err(err) => report.failed.push((peer, err.to_string())),
            }
        }
        report
    }
}
