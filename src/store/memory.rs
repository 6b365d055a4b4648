//! In-process coordination store.
//!
//! Backs local runs (`memory://`) and tests. Supports taking the store
//! "offline" to exercise the non-fatal unavailable path, and counts writes so
//! callers can assert that a decision was (or was not) persisted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cluster::{ClusterStatus, ClusterStatusUpdate, MonitorTelemetry};
use crate::store::{CoordinationStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct LeaseEntry {
    holder: String,
    expires_at: Instant,
}

/// Coordination store held in memory.
#[derive(Debug)]
pub struct MemoryStore {
    hashes: DashMap<String, HashMap<String, String>>,
    leases: DashMap<String, LeaseEntry>,
    status_key: String,
    telemetry_key: String,
    available: AtomicBool,
    status_writes: AtomicUsize,
    telemetry_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_keys("cluster_status", "monitor_status")
    }

    pub fn with_keys(status_key: &str, telemetry_key: &str) -> Self {
        Self {
            hashes: DashMap::new(),
            leases: DashMap::new(),
            status_key: status_key.to_string(),
            telemetry_key: telemetry_key.to_string(),
            available: AtomicBool::new(true),
            status_writes: AtomicUsize::new(0),
            telemetry_writes: AtomicUsize::new(0),
        }
    }

    /// Simulate the store going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful cluster-status writes.
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Number of successful telemetry writes.
    pub fn telemetry_writes(&self) -> usize {
        self.telemetry_writes.load(Ordering::SeqCst)
    }

    /// Raw view of a stored hash.
    pub fn raw(&self, key: &str) -> HashMap<String, String> {
        self.hashes.get(key).map(|h| h.value().clone()).unwrap_or_default()
    }

    fn check(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".into()))
        }
    }

    fn upsert(&self, key: &str, fields: Vec<(&'static str, String)>) {
        let mut entry = self.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            entry.insert(field.to_string(), value);
        }
    }

    fn remove_fields(&self, key: &str, fields: &[&'static str]) {
        if let Some(mut entry) = self.hashes.get_mut(key) {
            for field in fields {
                entry.remove(*field);
            }
        }
    }

    fn live_holder(&self, key: &str) -> Option<String> {
        let entry = self.leases.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.holder.clone())
        } else {
            None
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn get_cluster_status(&self) -> StoreResult<ClusterStatus> {
        self.check()?;
        ClusterStatus::from_fields(&self.raw(&self.status_key))
    }

    async fn set_cluster_status(&self, update: &ClusterStatusUpdate) -> StoreResult<()> {
        self.check()?;
        self.upsert(&self.status_key, update.to_fields());
        self.remove_fields(&self.status_key, &update.cleared_fields());
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_telemetry(&self) -> StoreResult<Option<MonitorTelemetry>> {
        self.check()?;
        MonitorTelemetry::from_fields(&self.raw(&self.telemetry_key))
    }

    async fn set_telemetry(&self, telemetry: &MonitorTelemetry) -> StoreResult<()> {
        self.check()?;
        self.upsert(&self.telemetry_key, telemetry.to_fields());
        self.telemetry_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn try_acquire_lease(&self, key: &str, holder: &str, ttl: Duration) -> StoreResult<bool> {
        self.check()?;
        if self.live_holder(key).is_some() {
            return Ok(false);
        }
        self.leases.insert(
            key.to_string(),
            LeaseEntry {
                holder: holder.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn renew_lease(&self, key: &str, holder: &str, ttl: Duration) -> StoreResult<bool> {
        self.check()?;
        if self.live_holder(key).as_deref() != Some(holder) {
            return Ok(false);
        }
        if let Some(mut entry) = self.leases.get_mut(key) {
            entry.expires_at = Instant::now() + ttl;
        }
        Ok(true)
    }

    async fn release_lease(&self, key: &str, holder: &str) -> StoreResult<()> {
        self.check()?;
        self.leases.remove_if(key, |_, entry| entry.holder == holder);
        Ok(())
    }

    async fn lease_holder(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        Ok(self.live_holder(key))
    }
}
