//! Failover decision logic.
//!
//! # State Transitions
//! ```text
//! MonitoringPrimary → MonitoringPrimary:  primary healthy (counters reset)
//! MonitoringPrimary → FailoverArmed:      primary unhealthy (window opens)
//! FailoverArmed → MonitoringSecondaryAsPrimary (via PromotedSecondary):
//!     failures >= max OR window >= failover_timeout, AND secondary healthy
//! FailoverArmed → MonitoringPrimary:      threshold reached, secondary unhealthy
//! MonitoringSecondaryAsPrimary → RestoreGrace: secondary healthy AND primary healthy
//! RestoreGrace → MonitoringSecondaryAsPrimary: primary fails during grace
//! RestoreGrace → MonitoringPrimary:       primary healthy for the full grace period
//! ```
//!
//! # Design Decisions
//! - Never promote an instance that was not just seen healthy
//! - Single-hop failover: a failing acting primary raises an alert only
//! - Directives are best effort; the store write is the decision
//! - A failed store write is kept and retried at the start of later ticks
//! - Nothing is written once the lease deadline has passed mid-tick

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::cluster::status::REASON_PRIMARY_HEALTH_CHECK_FAILED;
use crate::cluster::{ClusterStatusUpdate, InstancePair, InstanceRole, MonitorTelemetry};
use crate::config::MonitorConfig;
use crate::control::ControlPlane;
use crate::failover::alert::{Alert, AlertBus};
use crate::failover::state::{MonitorState, Phase};
use crate::health::{Health, HealthProbe};
use crate::observability::metrics;
use crate::store::{CoordinationStore, LeaseKeeper, LeaseState};

/// Thresholds used by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverPolicy {
    pub max_consecutive_failures: u32,
    pub failover_timeout: Duration,
    pub restore_grace: Duration,
    pub probe_timeout: Duration,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            failover_timeout: Duration::from_secs(30),
            restore_grace: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&MonitorConfig> for FailoverPolicy {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            max_consecutive_failures: config.policy.max_consecutive_failures,
            failover_timeout: config.policy.failover_timeout(),
            restore_grace: config.policy.restore_grace(),
            probe_timeout: Duration::from_secs(config.timeouts.probe_secs),
        }
    }
}

/// What one evaluation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Another monitor holds the lease; nothing was evaluated.
    StandingBy,
    PrimaryHealthy,
    FailureCounted { consecutive_failures: u32 },
    Promoted { at: DateTime<Utc> },
    DualOutage,
    ActingPrimaryHealthy,
    ActingPrimaryUnhealthy { consecutive_failures: u32 },
    GraceStarted,
    GraceHeld { remaining: Duration },
    GraceCancelled,
    Restored { at: DateTime<Utc> },
}

impl Transition {
    pub fn kind(&self) -> &'static str {
        match self {
            Transition::StandingBy => "standing_by",
            Transition::PrimaryHealthy => "primary_healthy",
            Transition::FailureCounted { .. } => "failure_counted",
            Transition::Promoted { .. } => "promoted",
            Transition::DualOutage => "dual_outage",
            Transition::ActingPrimaryHealthy => "acting_primary_healthy",
            Transition::ActingPrimaryUnhealthy { .. } => "acting_primary_unhealthy",
            Transition::GraceStarted => "grace_started",
            Transition::GraceHeld { .. } => "grace_held",
            Transition::GraceCancelled => "grace_cancelled",
            Transition::Restored { .. } => "restored",
        }
    }
}

/// Owns the monitor state and applies one evaluation per tick.
pub struct FailoverController {
    instances: InstancePair,
    policy: FailoverPolicy,
    prober: Arc<dyn HealthProbe>,
    store: Arc<dyn CoordinationStore>,
    control: Arc<dyn ControlPlane>,
    clock: Arc<dyn Clock>,
    alerts: AlertBus,
    lease: Option<LeaseKeeper>,
    state: MonitorState,
    pending: Option<ClusterStatusUpdate>,
    needs_hydration: bool,
}

impl FailoverController {
    pub fn new(
        instances: InstancePair,
        policy: FailoverPolicy,
        prober: Arc<dyn HealthProbe>,
        store: Arc<dyn CoordinationStore>,
        control: Arc<dyn ControlPlane>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instances,
            policy,
            prober,
            store,
            control,
            clock,
            alerts: AlertBus::default(),
            lease: None,
            state: MonitorState::new(),
            pending: None,
            needs_hydration: true,
        }
    }

    /// Require the leadership lease before acting.
    pub fn with_lease(mut self, lease: LeaseKeeper) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn with_alerts(mut self, alerts: AlertBus) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Cluster-status write that has not reached the store yet.
    pub fn pending_update(&self) -> Option<&ClusterStatusUpdate> {
        self.pending.as_ref()
    }

    pub fn alerts(&self) -> &AlertBus {
        &self.alerts
    }

    pub fn is_leader(&self) -> bool {
        self.lease.as_ref().map_or(true, LeaseKeeper::is_leader)
    }

    /// One monitor tick: lease, reconcile, evaluate, telemetry.
    pub async fn tick(&mut self) -> Transition {
        let lease_state = match self.lease.as_mut() {
            Some(lease) => lease.check(self.store.as_ref()).await,
            None => LeaseState::Held,
        };
        if !lease_state.may_act() {
            return Transition::StandingBy;
        }
        if lease_state == LeaseState::Acquired {
            // Whatever we did before losing the lease is stale now.
            self.pending = None;
            self.state = MonitorState {
                last_check: self.state.last_check,
                ..MonitorState::new()
            };
            self.needs_hydration = true;
        }

        if self.needs_hydration {
            self.hydrate().await;
        }
        self.reconcile().await;

        let now = self.clock.now();
        let transition = self.evaluate(now).await;
        if !matches!(transition, Transition::PrimaryHealthy | Transition::ActingPrimaryHealthy) {
            metrics::record_transition(transition.kind());
        }
        if self.lease_in_force() {
            self.publish_telemetry(now).await;
        }
        transition
    }

    /// Load the persisted designation into the in-memory state.
    ///
    /// On failure the current designee is kept and the read is retried on
    /// the next tick. An unwritten local decision wins over the stored one.
    pub async fn hydrate(&mut self) {
        if self.pending.is_some() {
            self.needs_hydration = false;
            return;
        }
        match self.store.get_cluster_status().await {
            Ok(status) => {
                if status.primary_instance != self.state.designee {
                    let last_check = self.state.last_check;
                    self.state = MonitorState::resume(&status);
                    self.state.last_check = last_check;
                }
                self.needs_hydration = false;
                tracing::info!(
                    designee = %status.primary_instance,
                    phase = self.state.phase.as_str(),
                    "Resumed from coordination store"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    designee = %self.state.designee,
                    "Cannot read cluster status, keeping current designee until the store answers"
                );
            }
        }
    }

    /// False if the lease deadline passed since the start of the tick.
    fn lease_in_force(&mut self) -> bool {
        self.lease.as_mut().map_or(true, LeaseKeeper::in_force)
    }

    /// Release the lease, if held.
    pub async fn shutdown(&mut self) {
        if let Some(lease) = self.lease.as_mut() {
            lease.release(self.store.as_ref()).await;
        }
    }

    /// Apply one evaluation at `now`. Exposed for tick-by-tick tests.
    pub async fn evaluate(&mut self, now: DateTime<Utc>) -> Transition {
        match self.state.phase {
            Phase::MonitoringPrimary | Phase::FailoverArmed => self.evaluate_primary(now).await,
            Phase::PromotedSecondary | Phase::MonitoringSecondaryAsPrimary => {
                self.evaluate_acting_secondary(now).await
            }
            Phase::RestoreGrace => self.evaluate_grace(now).await,
        }
    }

    async fn probe(&self, role: InstanceRole) -> Health {
        self.prober
            .probe(self.instances.get(role), self.policy.probe_timeout)
            .await
    }

    async fn evaluate_primary(&mut self, now: DateTime<Utc>) -> Transition {
        let health = self.probe(InstanceRole::Primary).await;
        if health.is_healthy() {
            if self.state.consecutive_failures > 0 {
                tracing::info!(
                    after_failures = self.state.consecutive_failures,
                    "Primary healthy again, disarming failover"
                );
            }
            self.state.reset_counters();
            self.state.phase = Phase::MonitoringPrimary;
            return Transition::PrimaryHealthy;
        }

        let failures = self.state.record_failure(now);
        let elapsed = self.state.window_elapsed(now);
        self.state.phase = Phase::FailoverArmed;
        tracing::warn!(
            consecutive_failures = failures,
            window_secs = elapsed.as_secs(),
            "Primary health check failed"
        );

        let threshold_reached = failures >= self.policy.max_consecutive_failures
            || elapsed >= self.policy.failover_timeout;
        if !threshold_reached {
            return Transition::FailureCounted {
                consecutive_failures: failures,
            };
        }

        let secondary = self.probe(InstanceRole::Secondary).await;
        if !secondary.is_healthy() {
            self.alerts.raise(Alert::DualOutage {
                primary_failures: failures,
            });
            self.state.reset_counters();
            self.state.phase = Phase::MonitoringPrimary;
            return Transition::DualOutage;
        }

        self.promote(now).await
    }

    async fn promote(&mut self, now: DateTime<Utc>) -> Transition {
        self.state.phase = Phase::PromotedSecondary;
        tracing::warn!(
            consecutive_failures = self.state.consecutive_failures,
            "Promoting secondary to primary"
        );

        if let Err(e) = self.control.promote(&self.instances.secondary).await {
            tracing::warn!(error = %e, "Promote directive not delivered; recording decision anyway");
        }
        self.persist(ClusterStatusUpdate::promotion(now, REASON_PRIMARY_HEALTH_CHECK_FAILED))
            .await;

        self.state.designee = InstanceRole::Secondary;
        self.state.last_failover = Some(now);
        self.state.reset_counters();
        self.state.phase = Phase::MonitoringSecondaryAsPrimary;
        tracing::info!(failover_time = %now, "Failover complete, secondary is primary");
        Transition::Promoted { at: now }
    }

    async fn evaluate_acting_secondary(&mut self, now: DateTime<Utc>) -> Transition {
        self.state.phase = Phase::MonitoringSecondaryAsPrimary;

        let acting = self.probe(InstanceRole::Secondary).await;
        if !acting.is_healthy() {
            let failures = self.state.record_failure(now);
            self.alerts.raise(Alert::ActingPrimaryUnhealthy {
                consecutive_failures: failures,
            });
            return Transition::ActingPrimaryUnhealthy {
                consecutive_failures: failures,
            };
        }
        self.state.reset_counters();

        let original = self.probe(InstanceRole::Primary).await;
        if !original.is_healthy() {
            return Transition::ActingPrimaryHealthy;
        }

        tracing::info!(
            grace_secs = self.policy.restore_grace.as_secs(),
            "Original primary healthy, starting restore grace period"
        );
        self.state.grace_start = Some(now);
        self.state.phase = Phase::RestoreGrace;
        Transition::GraceStarted
    }

    async fn evaluate_grace(&mut self, now: DateTime<Utc>) -> Transition {
        let original = self.probe(InstanceRole::Primary).await;
        if !original.is_healthy() {
            tracing::warn!("Original primary failed during grace period, restoration cancelled");
            self.state.grace_start = None;
            self.state.phase = Phase::MonitoringSecondaryAsPrimary;
            return Transition::GraceCancelled;
        }

        let elapsed = self.state.grace_elapsed(now);
        if elapsed < self.policy.restore_grace {
            return Transition::GraceHeld {
                remaining: self.policy.restore_grace - elapsed,
            };
        }

        self.restore(now).await
    }

    async fn restore(&mut self, now: DateTime<Utc>) -> Transition {
        tracing::info!("Restoring original primary");

        if let Err(e) = self.control.activate(&self.instances.primary).await {
            tracing::warn!(error = %e, "Activate directive not delivered; recording decision anyway");
        }
        if let Err(e) = self.control.demote_to_standby(&self.instances.secondary).await {
            tracing::warn!(error = %e, "Standby directive not delivered; recording decision anyway");
        }

        // restore_time must be strictly after the failover it ends.
        let at = match self.state.last_failover {
            Some(failover) if now <= failover => failover + chrono::Duration::milliseconds(1),
            _ => now,
        };
        self.persist(ClusterStatusUpdate::restoration(at)).await;

        self.state.designee = InstanceRole::Primary;
        self.state.last_failover = None;
        self.state.grace_start = None;
        self.state.reset_counters();
        self.state.phase = Phase::MonitoringPrimary;
        tracing::info!(restore_time = %at, "Original primary restored");
        Transition::Restored { at }
    }

    async fn persist(&mut self, update: ClusterStatusUpdate) {
        if !self.lease_in_force() {
            // The next holder re-reads the store; this decision is not ours to write.
            tracing::error!(?update, "Leadership lease expired before the status write, decision dropped");
            self.pending = None;
            return;
        }
        let update = match self.pending.take() {
            Some(mut pending) => {
                pending.merge(update);
                pending
            }
            None => update,
        };

        match self.store.set_cluster_status(&update).await {
            Ok(()) => tracing::debug!(?update, "Cluster status written"),
            Err(e) => {
                tracing::error!(error = %e, ?update, "Cannot write cluster status, will retry next tick");
                self.pending = Some(update);
            }
        }
    }

    async fn reconcile(&mut self) {
        if self.pending.is_none() || !self.lease_in_force() {
            return;
        }
        let Some(update) = self.pending.take() else {
            return;
        };
        match self.store.set_cluster_status(&update).await {
            Ok(()) => tracing::info!(?update, "Pending cluster status written"),
            Err(e) => {
                tracing::warn!(error = %e, "Cluster status still not written");
                self.pending = Some(update);
            }
        }
    }

    async fn publish_telemetry(&mut self, now: DateTime<Utc>) {
        let last_check = match self.state.last_check {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        self.state.last_check = Some(last_check);

        let telemetry = MonitorTelemetry {
            last_check,
            current_primary: self.state.designee,
            consecutive_failures: self.state.consecutive_failures,
        };
        metrics::record_monitor_state(telemetry.current_primary, telemetry.consecutive_failures);

        if let Err(e) = self.store.set_telemetry(&telemetry).await {
            tracing::warn!(error = %e, "Cannot write monitor telemetry");
        }
    }
}
