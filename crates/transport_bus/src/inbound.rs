use std::collections::{BTreeMap, HashMap};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use bridge_types::PartyId;

use crate::errors::TransportError;
use crate::messages::{CONTROL_CONTEXT, WireMessage};

/// How many out-of-order messages one sender may have parked per lane
/// before further ones are dropped (the sender will redeliver).
const MAX_PARKED_PER_LANE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Delivered,
    Duplicate,
    Parked,
}

#[derive(Default)]
struct Lane {
    next_sequence: u64,
    parked: BTreeMap<u64, WireMessage>,
}

/// Receiver-side edge of the bus: deduplicates and re-orders each sender's
/// stream per context, then hands messages to the node in FIFO order.
///
/// Delivery is at-least-once upstream, exactly-once downstream.
pub struct Inbound {
    tx: mpsc::Sender<WireMessage>,
    lanes: Mutex<HashMap<(PartyId, String), Lane>>,
}

impl Inbound {
    /// Returns the inbound edge plus the ordered message stream for the node.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<WireMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                tx,
                lanes: Mutex::new(HashMap::new()),
            },
            rx,
        )
    }

    pub async fn accept(&self, message: WireMessage) -> Result<AcceptOutcome, TransportError> {
        // Control traffic (registrations, heartbeats) is idempotent and
        // unordered; delivering it directly keeps a restarted peer, whose
        // sequence counters start over, from stalling its lane.
        if message.context == CONTROL_CONTEXT {
            self.tx.send(message).await.map_err(|_| TransportError::ChannelClosed)?;
            return Ok(AcceptOutcome::Delivered);
        }

        let mut lanes = self.lanes.lock().await;
        let lane = lanes
            .entry((message.sender, message.context.clone()))
            .or_default();

        if message.sequence < lane.next_sequence || lane.parked.contains_key(&message.sequence) {
            debug!(
                sender = %message.sender,
                context = %message.context,
                sequence = message.sequence,
                "dropping duplicate message"
            );
            return Ok(AcceptOutcome::Duplicate);
        }

        if message.sequence > lane.next_sequence {
            if lane.parked.len() >= MAX_PARKED_PER_LANE {
                warn!(
                    sender = %message.sender,
                    context = %message.context,
                    "parked-message limit reached, dropping ahead-of-order message"
                );
                return Ok(AcceptOutcome::Duplicate);
            }
            lane.parked.insert(message.sequence, message);
            return Ok(AcceptOutcome::Parked);
        }

        // In-order: deliver it and drain any directly following parked ones.
        let mut ready = vec![message];
        lane.next_sequence += 1;
        while let Some(next) = lane.parked.remove(&lane.next_sequence) {
            ready.push(next);
            lane.next_sequence += 1;
        }
        drop(lanes);

        for msg in ready {
            self.tx.send(msg).await.map_err(|_| TransportError::ChannelClosed)?;
        }
        Ok(AcceptOutcome::Delivered)
    }
}
