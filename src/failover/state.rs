//! In-process monitor state.
//!
//! Owned by the `FailoverController` and mutated only from the monitor task,
//! so it carries no synchronization. Durable facts live in `ClusterStatus`.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cluster::{ClusterStatus, InstanceRole};

/// State-machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Original primary is the designee and last looked healthy.
    MonitoringPrimary,
    /// Original primary failed at least once in the current window.
    FailoverArmed,
    /// Promotion side effects in progress.
    PromotedSecondary,
    /// Secondary is the designee.
    MonitoringSecondaryAsPrimary,
    /// Original primary is back; waiting out the grace period.
    RestoreGrace,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::MonitoringPrimary => "monitoring_primary",
            Phase::FailoverArmed => "failover_armed",
            Phase::PromotedSecondary => "promoted_secondary",
            Phase::MonitoringSecondaryAsPrimary => "monitoring_secondary_as_primary",
            Phase::RestoreGrace => "restore_grace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    pub phase: Phase,
    pub designee: InstanceRole,
    pub consecutive_failures: u32,
    pub failure_window_start: Option<DateTime<Utc>>,
    pub grace_start: Option<DateTime<Utc>>,
    /// Failover time of the promotion currently in effect, if known.
    pub last_failover: Option<DateTime<Utc>>,
    /// Last telemetry timestamp written; never decreases.
    pub last_check: Option<DateTime<Utc>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            phase: Phase::MonitoringPrimary,
            designee: InstanceRole::Primary,
            consecutive_failures: 0,
            failure_window_start: None,
            grace_start: None,
            last_failover: None,
            last_check: None,
        }
    }

    /// Rebuild state from the persisted designation.
    pub fn resume(status: &ClusterStatus) -> Self {
        let mut state = Self::new();
        state.designee = status.primary_instance;
        if status.primary_instance == InstanceRole::Secondary {
            state.phase = Phase::MonitoringSecondaryAsPrimary;
            state.last_failover = status.failover_time;
        }
        state
    }

    pub fn reset_counters(&mut self) {
        self.consecutive_failures = 0;
        self.failure_window_start = None;
    }

    /// Count one failure; opens the window on the first one. Returns the new count.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.failure_window_start.is_none() {
            self.failure_window_start = Some(now);
        }
        self.consecutive_failures
    }

    /// Time since the failure window opened (zero if closed or clock went back).
    pub fn window_elapsed(&self, now: DateTime<Utc>) -> Duration {
        elapsed_since(self.failure_window_start, now)
    }

    pub fn grace_elapsed(&self, now: DateTime<Utc>) -> Duration {
        elapsed_since(self.grace_start, now)
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_since(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    start
        .and_then(|start| (now - start).to_std().ok())
        .unwrap_or(Duration::ZERO)
}
