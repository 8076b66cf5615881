use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bridge_types::SignalEvent;

use crate::config::MonitorConfig;
use crate::dedup::DedupRing;
use crate::error::MonitorError;
use crate::worker::ChainWorker;

const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Health snapshot of one chain worker, served by `/health`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainHealth {
    pub healthy: bool,
    pub latency_ms: u64,
    pub last_block: u64,
    pub consecutive_failures: u32,
    pub signals_received: u64,
}

/// One worker per configured chain, all feeding a single event stream and
/// sharing one dedup ring.
pub struct ChainEventMonitor {
    healths: BTreeMap<u32, (String, Arc<RwLock<ChainHealth>>)>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl ChainEventMonitor {
    /// Spawns the workers and returns the monitor plus the stream of
    /// confirmed, deduplicated events.
    pub fn start(config: MonitorConfig) -> Result<(Self, mpsc::Receiver<SignalEvent>), MonitorError> {
        let (events_tx, events_rx) = mpsc::channel(1024);
        let dedup = Arc::new(Mutex::new(DedupRing::new(config.dedup_capacity)));
        let cancel = CancellationToken::new();

        let mut healths = BTreeMap::new();
        let mut workers = Vec::new();
        for chain in config.chains {
            let health = Arc::new(RwLock::new(ChainHealth::default()));
            healths.insert(chain.chain_id, (chain.name.clone(), Arc::clone(&health)));
            let worker = ChainWorker::new(chain, Arc::clone(&dedup), events_tx.clone(), health)?;
            workers.push(tokio::spawn(worker.run(cancel.clone())));
        }
        info!(chains = healths.len(), "chain event monitor started");

        Ok((
            Self {
                healths,
                workers: Mutex::new(workers),
                cancel,
            },
            events_rx,
        ))
    }

    /// Per-chain `(healthy, latency_ms)` snapshots.
    pub async fn health_check(&self) -> BTreeMap<u32, (String, ChainHealth)> {
        let mut out = BTreeMap::new();
        for (chain_id, (name, health)) in &self.healths {
            out.insert(*chain_id, (name.clone(), health.read().await.clone()));
        }
        out
    }

    pub async fn all_healthy(&self) -> bool {
        for (_, (_, health)) in &self.healths {
            if !health.read().await.healthy {
                return false;
            }
        }
        true
    }

    /// Detaches all subscriptions and waits for in-flight work to drain.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        self.cancel.cancel();
        let workers: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        let join_all = async {
            for worker in workers {
                let _ = worker.await;
            }
        };
        match tokio::time::timeout(DRAIN_GRACE, join_all).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!("chain workers did not drain in time");
                Err(MonitorError::DrainTimeout)
            }
        }
    }
}
