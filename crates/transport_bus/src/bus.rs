use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use bridge_types::PartyId;

use crate::errors::TransportError;
use crate::messages::WirePayload;

/// Outcome of one broadcast call. All-or-none is deliberately NOT promised;
/// ceremonies above the bus tolerate partially reached peers.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: Vec<PartyId>,
    pub failed: Vec<(PartyId, String)>,
}

impl BroadcastReport {
    pub fn fully_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Message passing between the N parties.
#[async_trait]
pub trait TransportBus: Send + Sync {
    fn local_party(&self) -> PartyId;

    /// Committee members reachable through this bus, excluding self.
    fn peers(&self) -> Vec<PartyId>;

    async fn send(&self, to: PartyId, payload: WirePayload) -> Result<(), TransportError>;

    /// N−1 unicasts; per-peer failures are reported, not hidden.
    async fn broadcast(&self, payload: WirePayload) -> BroadcastReport;
}

/// Outbound sequence numbers, per recipient per context; the sender half of
/// the FIFO guarantee. Keyed by recipient because unicasts and broadcasts
/// share a lane and every recipient must observe a dense sequence.
#[derive(Default)]
pub(crate) struct Sequencer {
    counters: Mutex<HashMap<(PartyId, String), u64>>,
}

impl Sequencer {
    pub(crate) async fn next(&self, to: PartyId, context: &str) -> u64 {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry((to, context.to_string())).or_insert(0);
        let value = *counter;
        *counter += 1;
        value
    }
}
