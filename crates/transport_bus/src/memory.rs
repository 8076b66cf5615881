use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use bridge_types::PartyId;
use global_utils::common_types::unix_timestamp_ms;

use crate::bus::{BroadcastReport, Sequencer, TransportBus};
use crate::errors::TransportError;
use crate::inbound::Inbound;
use crate::messages::{WireMessage, WirePayload};

/// In-process bus registry for tests and local multi-party simulation.
/// Every joined party gets a [`MemoryBus`] handle plus its ordered inbound
/// stream, and delivery goes through the same dedup/FIFO lanes the HTTP bus
/// uses.
#[derive(Default)]
pub struct MemoryNetwork {
    committee: DashMap<PartyId, ()>,
    inboxes: DashMap<PartyId, Arc<Inbound>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn join(self: &Arc<Self>, party: PartyId) -> (Arc<MemoryBus>, mpsc::Receiver<WireMessage>) {
        let (inbound, rx) = Inbound::channel(1024);
        self.committee.insert(party, ());
        self.inboxes.insert(party, Arc::new(inbound));
        (
            Arc::new(MemoryBus {
                network: Arc::clone(self),
                party,
                sequencer: Sequencer::default(),
            }),
            rx,
        )
    }

    /// Simulates a crashed peer: it stays on the committee roster but
    /// subsequent sends to it fail.
    pub fn drop_party(&self, party: PartyId) {
        self.inboxes.remove(&party);
    }

    fn parties(&self) -> Vec<PartyId> {
        let mut parties: Vec<_> = self.committee.iter().map(|e| *e.key()).collect();
        parties.sort();
        parties
    }
}

pub struct MemoryBus {
    network: Arc<MemoryNetwork>,
    party: PartyId,
    sequencer: Sequencer,
}

impl MemoryBus {
    async fn deliver(&self, to: PartyId, payload: WirePayload) -> Result<(), TransportError> {
        let inbox = self
            .network
            .inboxes
            .get(&to)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(TransportError::UnknownPeer(to))?;

        let context = payload.context();
        let message = WireMessage {
            sender: self.party,
            context: context.clone(),
            sequence: self.sequencer.next(to, &context).await,
            timestamp_ms: unix_timestamp_ms(),
            payload,
        };
        inbox.accept(message).await.map(|_| ())
    }
}

#[async_trait]
impl TransportBus for MemoryBus {
    fn local_party(&self) -> PartyId {
        self.party
    }

    fn peers(&self) -> Vec<PartyId> {
        self.network.parties().into_iter().filter(|p| *p != self.party).collect()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::WirePayload;

    fn heartbeat(uptime: u64) -> WirePayload {
        WirePayload::Heartbeat {
            uptime_secs: uptime,
            active_chains: vec![],
            pending: 0,
            has_key_share: false,
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_all_other_parties() -> anyhow::Result<()> {
        let network = MemoryNetwork::new();
        let p1 = PartyId::new(1).unwrap();
        let p2 = PartyId::new(2).unwrap();
        let p3 = PartyId::new(3).unwrap();
        let (bus1, _rx1) = network.join(p1);
        let (_bus2, mut rx2) = network.join(p2);
        let (_bus3, mut rx3) = network.join(p3);

        let report = bus1.broadcast(heartbeat(1)).await;
        assert!(report.fully_delivered());
        assert_eq!(report.delivered.len(), 2);

        assert_eq!(rx2.recv().await.unwrap().sender, p1);
        assert_eq!(rx3.recv().await.unwrap().sender, p1);
        Ok(())
    }

    #[tokio::test]
    async fn partial_broadcast_is_reported_not_hidden() -> anyhow::Result<()> {
        let network = MemoryNetwork::new();
        let p1 = PartyId::new(1).unwrap();
        let p2 = PartyId::new(2).unwrap();
        let p3 = PartyId::new(3).unwrap();
        let (bus1, _rx1) = network.join(p1);
        let (_bus2, mut rx2) = network.join(p2);
        let (_bus3, _rx3) = network.join(p3);

        network.drop_party(p3);

        let report = bus1.broadcast(heartbeat(2)).await;
        assert_eq!(report.delivered, vec![p2]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, p3);

        assert_eq!(rx2.recv().await.unwrap().sender, p1);
        Ok(())
    }
}
