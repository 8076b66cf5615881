use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use bridge_types::SignalEvent;

use crate::config::ChainConfig;
use crate::decode::{SIGNAL_RECEIVED_SIGNATURE, SIGNAL_SENT_SIGNATURE, decode_signal_sent, topic_hash};
use crate::dedup::{DedupRing, Observation};
use crate::error::MonitorError;
use crate::monitor::ChainHealth;
use crate::rpc::JsonRpcClient;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Exponential backoff with ±20% jitter.
fn backoff_delay(consecutive_failures: u32) -> Duration {
    let exp = BACKOFF_BASE.as_millis() as u64 * (1u64 << consecutive_failures.min(5));
    let capped = exp.min(BACKOFF_CAP.as_millis() as u64);
    let jitter = rand::thread_rng().gen_range(-0.2f64..=0.2f64);
    Duration::from_millis(((capped as f64) * (1.0 + jitter)) as u64)
}

pub(crate) struct ChainWorker {
    cfg: ChainConfig,
    rpc: JsonRpcClient,
    sent_topic: String,
    received_topic: String,
    dedup: Arc<Mutex<DedupRing>>,
    events: mpsc::Sender<SignalEvent>,
    health: Arc<RwLock<ChainHealth>>,
    /// Next block to scan from; starts at the confirmed head on first tick.
    checkpoint: Option<u64>,
    consecutive_failures: u32,
}

impl ChainWorker {
    pub(crate) fn new(
        cfg: ChainConfig,
        dedup: Arc<Mutex<DedupRing>>,
        events: mpsc::Sender<SignalEvent>,
        health: Arc<RwLock<ChainHealth>>,
    ) -> Result<Self, MonitorError> {
        let rpc = JsonRpcClient::new(cfg.rpc_url.clone())?;
        Ok(Self {
            cfg,
            rpc,
            sent_topic: topic_hash(SIGNAL_SENT_SIGNATURE),
            received_topic: topic_hash(SIGNAL_RECEIVED_SIGNATURE),
            dedup,
            events,
            health,
            checkpoint: None,
            consecutive_failures: 0,
        })
    }

    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        info!(chain = %self.cfg.name, chain_id = self.cfg.chain_id, "chain worker started");
        let mut interval = tokio::time::interval(Duration::from_millis(self.cfg.poll_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(chain = %self.cfg.name, "chain worker stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.scan_once().await {
                        Ok(()) => {
                            self.consecutive_failures = 0;
                        }
                        Err(err) => {
                            self.consecutive_failures += 1;
                            let delay = backoff_delay(self.consecutive_failures);
                            warn!(
                                chain = %self.cfg.name,
                                error = %err,
                                failures = self.consecutive_failures,
                                backoff_ms = delay.as_millis() as u64,
                                "provider failure, backing off"
                            );
                            {
                                let mut health = self.health.write().await;
                                health.healthy = false;
                                health.consecutive_failures = self.consecutive_failures;
                            }
                            tokio::select! {
                                _ = cancel.cancelled() => break,
                                _ = tokio::time::sleep(delay) => {}
                            }
                        }
                    }
                }
            }
        }
    }

    /// One poll: measure provider latency, compute the confirmed head, scan
    /// any new span for Signal logs.
    async fn scan_once(&mut self) -> Result<(), MonitorError> {
        let started = std::time::Instant::now();
        let head = self.rpc.block_number().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let confirmed_head = head.saturating_sub(self.cfg.confirmation_depth);
        {
            let mut health = self.health.write().await;
            health.healthy = true;
            health.latency_ms = latency_ms;
            health.last_block = head;
            health.consecutive_failures = 0;
        }

        let from = match self.checkpoint {
            Some(checkpoint) => checkpoint,
            None => {
                // First tick: start at the confirmed head, no backfill.
                self.checkpoint = Some(confirmed_head.saturating_add(1));
                return Ok(());
            }
        };
        if from > confirmed_head {
            return Ok(());
        }
        let to = confirmed_head.min(from + self.cfg.batch_blocks.saturating_sub(1));

        let logs = self
            .rpc
            .get_logs(&self.cfg.signal_address, &self.sent_topic, from, to)
            .await?;
        trace!(chain = %self.cfg.name, from, to, logs = logs.len(), "scanned span");

        for log in &logs {
            if log.removed {
                continue;
            }
            match decode_signal_sent(self.cfg.chain_id, log) {
                Ok(event) => self.emit(event).await,
                Err(err) => warn!(chain = %self.cfg.name, error = %err, "skipping undecodable log"),
            }
        }

        // SignalReceived is observational only: counted, never signed.
        let received = self
            .rpc
            .get_logs(&self.cfg.signal_address, &self.received_topic, from, to)
            .await
            .map(|logs| logs.len())
            .unwrap_or(0);
        if received > 0 {
            let mut health = self.health.write().await;
            health.signals_received += received as u64;
        }

        self.checkpoint = Some(to + 1);
        Ok(())
    }

    async fn emit(&self, event: SignalEvent) {
        let observation = {
            let mut ring = self.dedup.lock().await;
            ring.observe(event.signal_id, event.canonical_digest())
        };
        match observation {
            Observation::Fresh => {
                info!(
                    chain = %self.cfg.name,
                    signal_id = %event.signal_id,
                    block = event.block_number,
                    "confirmed signal"
                );
                if self.events.send(event).await.is_err() {
                    debug!("signal consumer is gone, dropping event");
                }
            }
            Observation::Duplicate => {
                debug!(signal_id = %event.signal_id, "redelivered signal dropped");
            }
            Observation::Conflicting => {
                error!(
                    chain = %self.cfg.name,
                    signal_id = %event.signal_id,
                    "signal id replayed with different content, dropping"
                );
            }
        }
    }
}
