//! Critical alert signal.
//!
//! Alerts are situations the controller will not fix by itself and that need
//! an operator: the acting primary failing after a promotion (single-hop
//! failover only), or both instances down at decision time.

use tokio::sync::broadcast;

use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// The promoted secondary is failing; no further automatic failover.
    ActingPrimaryUnhealthy { consecutive_failures: u32 },
    /// Failover threshold reached but the secondary is unhealthy too.
    DualOutage { primary_failures: u32 },
}

impl Alert {
    pub fn kind(&self) -> &'static str {
        match self {
            Alert::ActingPrimaryUnhealthy { .. } => "acting_primary_unhealthy",
            Alert::DualOutage { .. } => "dual_outage",
        }
    }
}

/// Fan-out of alerts to log, metrics and in-process subscribers.
#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<Alert>,
}

impl AlertBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }

    pub fn raise(&self, alert: Alert) {
        match &alert {
            Alert::ActingPrimaryUnhealthy { consecutive_failures } => tracing::error!(
                alert = alert.kind(),
                consecutive_failures,
                "CRITICAL: acting primary (secondary instance) is unhealthy; manual intervention required"
            ),
            Alert::DualOutage { primary_failures } => tracing::error!(
                alert = alert.kind(),
                primary_failures,
                "CRITICAL: primary and secondary both unhealthy; not promoting an unverified target"
            ),
        }
        metrics::record_alert(alert.kind());
        // No subscribers is fine.
        let _ = self.tx.send(alert);
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_alerts() {
        let bus = AlertBus::default();
        let mut rx = bus.subscribe();
        bus.raise(Alert::DualOutage { primary_failures: 3 });
        assert_eq!(rx.recv().await.unwrap(), Alert::DualOutage { primary_failures: 3 });
    }

    #[test]
    fn test_raise_without_subscribers() {
        AlertBus::default().raise(Alert::ActingPrimaryUnhealthy { consecutive_failures: 1 });
    }
}
