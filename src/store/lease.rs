//! Single-writer leadership lease.
//!
//! # Responsibilities
//! - Acquire or renew a TTL lock key before each evaluation
//! - Tell the controller whether this process may act on transitions
//!
//! # State Transitions
//! ```text
//! Standby → Leader:  SET NX succeeded (controller re-reads cluster status)
//! Leader → Leader:   owner-checked renew succeeded
//! Leader → Standby:  renew refused (lease expired and taken by another monitor)
//! Leader → Leader:   store unreachable but local lease deadline not reached
//! Leader → Standby:  store unreachable past the local lease deadline
//! ```
//!
//! # Design Decisions
//! - The local deadline is measured from the start of the renew request,
//!   so it never outlives the lease as seen by the store
//! - Holder ids are random per process, a restart is a new holder

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::config::LeaseConfig;
use crate::store::CoordinationStore;

/// Result of one lease check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    /// The lease was just taken; local state must be re-read from the store.
    Acquired,
    /// The lease was renewed.
    Held,
    /// The store is unreachable but the lease cannot have expired yet.
    HeldLocally,
    /// Another monitor holds the lease, or it cannot be confirmed.
    Standby,
}

impl LeaseState {
    pub fn may_act(&self) -> bool {
        !matches!(self, LeaseState::Standby)
    }
}

/// Tracks this process's claim on the lease key.
#[derive(Debug)]
pub struct LeaseKeeper {
    key: String,
    holder: String,
    ttl: Duration,
    deadline: Option<Instant>,
}

impl LeaseKeeper {
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            holder: Uuid::new_v4().to_string(),
            ttl,
            deadline: None,
        }
    }

    pub fn from_config(config: &LeaseConfig) -> Self {
        Self::new(config.key.clone(), Duration::from_secs(config.ttl_secs))
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn is_leader(&self) -> bool {
        self.deadline.is_some()
    }

    /// Acquire or renew the lease.
    pub async fn check(&mut self, store: &dyn CoordinationStore) -> LeaseState {
        let started = Instant::now();

        if let Some(deadline) = self.deadline {
            match store.renew_lease(&self.key, &self.holder, self.ttl).await {
                Ok(true) => {
                    self.deadline = Some(started + self.ttl);
                    return LeaseState::Held;
                }
                Ok(false) => {
                    tracing::warn!(key = %self.key, holder = %self.holder, "Leadership lease lost");
                    self.deadline = None;
                }
                Err(e) if Instant::now() < deadline => {
                    tracing::warn!(error = %e, key = %self.key, "Cannot renew lease, acting on local deadline");
                    return LeaseState::HeldLocally;
                }
                Err(e) => {
                    tracing::error!(error = %e, key = %self.key, "Lease expired while store unreachable, standing by");
                    self.deadline = None;
                    return LeaseState::Standby;
                }
            }
        }

        match store.try_acquire_lease(&self.key, &self.holder, self.ttl).await {
            Ok(true) => {
                tracing::info!(key = %self.key, holder = %self.holder, "Leadership lease acquired");
                self.deadline = Some(started + self.ttl);
                LeaseState::Acquired
            }
            Ok(false) => {
                tracing::debug!(key = %self.key, "Lease held by another monitor");
                LeaseState::Standby
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "Cannot acquire lease");
                LeaseState::Standby
            }
        }
    }

    /// Whether the lease is still ours by the local deadline.
    ///
    /// Called before each store write of a tick; once the deadline has
    /// passed, leadership is dropped until the next `check`.
    pub fn in_force(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                tracing::warn!(key = %self.key, holder = %self.holder, "Lease deadline passed during the tick, standing by");
                self.deadline = None;
                false
            }
            None => false,
        }
    }

    /// Give the lease up (on shutdown).
    pub async fn release(&mut self, store: &dyn CoordinationStore) {
        if self.deadline.take().is_none() {
            return;
        }
        match store.release_lease(&self.key, &self.holder).await {
            Ok(()) => tracing::info!(key = %self.key, "Leadership lease released"),
            Err(e) => tracing::warn!(error = %e, key = %self.key, "Failed to release lease; it will expire"),
        }
    }
}
