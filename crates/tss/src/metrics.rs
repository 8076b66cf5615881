use std::sync::atomic::{AtomicU64, Ordering};

/// Node-wide counters, rendered by the operator surface in Prometheus text
/// format. Plain atomics; incremented from the hot paths without locking.
#[derive(Debug, Default)]
pub struct NodeMetrics {
    pub signals_observed: AtomicU64,
    pub signing_requests: AtomicU64,
    pub signing_completed: AtomicU64,
    pub signing_failed: AtomicU64,
    pub partials_rejected: AtomicU64,
    pub dkg_completed: AtomicU64,
    pub dkg_failed: AtomicU64,
    pub heartbeats_received: AtomicU64,
}

impl NodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        for (name, help, value) in [
            (
                "bridge_signals_observed_total",
                "Confirmed SignalSent events handed to the signer",
                &self.signals_observed,
            ),
            (
                "bridge_signing_requests_total",
                "Signing ceremonies started",
                &self.signing_requests,
            ),
            (
                "bridge_signing_completed_total",
                "Aggregated signatures emitted",
                &self.signing_completed,
            ),
            (
                "bridge_signing_failed_total",
                "Signing ceremonies that failed",
                &self.signing_failed,
            ),
            (
                "bridge_partials_rejected_total",
                "Partial signatures rejected during collection",
                &self.partials_rejected,
            ),
            (
                "bridge_dkg_completed_total",
                "Key generation ceremonies completed",
                &self.dkg_completed,
            ),
            (
                "bridge_dkg_failed_total",
                "Key generation ceremonies that failed",
                &self.dkg_failed,
            ),
            (
                "bridge_heartbeats_received_total",
                "Peer heartbeats received",
                &self.heartbeats_received,
            ),
        ] {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n",
                value.load(Ordering::Relaxed)
            ));
        }
        out
    }
}
