//! Coordination store client.
//!
//! # Data Flow
//! ```text
//! FailoverController
//!     → CoordinationStore (trait)
//!         → redis_store.rs (shared Redis, production)
//!         → memory.rs      (in-process, tests and local runs)
//!     → lease.rs (single-writer lease on top of the same store)
//! ```
//!
//! # Design Decisions
//! - Field-level upserts, last-write-wins, no compare-and-swap on status
//! - Every command is bounded by a timeout
//! - Unreachable store is a distinct, non-fatal error kind

pub mod lease;
pub mod memory;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::cluster::{ClusterStatus, ClusterStatusUpdate, MonitorTelemetry};
use crate::config::StoreConfig;

pub use lease::{LeaseKeeper, LeaseState};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Errors returned by the coordination store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or command failure.
    #[error("coordination store unavailable: {0}")]
    Unavailable(String),

    /// Command did not complete in time.
    #[error("coordination store timed out after {0:?}")]
    Timeout(Duration),

    /// A stored field could not be decoded.
    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: &'static str, value: String },
}

impl StoreError {
    /// True for the "store unreachable" kind (as opposed to corrupt data).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Typed access to the shared key space.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    async fn get_cluster_status(&self) -> StoreResult<ClusterStatus>;

    /// Partial upsert of the cluster status.
    async fn set_cluster_status(&self, update: &ClusterStatusUpdate) -> StoreResult<()>;

    async fn get_telemetry(&self) -> StoreResult<Option<MonitorTelemetry>>;

    async fn set_telemetry(&self, telemetry: &MonitorTelemetry) -> StoreResult<()>;

    /// Take `key` for `holder` if nobody holds it. Returns whether it was taken.
    async fn try_acquire_lease(&self, key: &str, holder: &str, ttl: Duration) -> StoreResult<bool>;

    /// Extend `key` if `holder` still owns it. Returns whether it was extended.
    async fn renew_lease(&self, key: &str, holder: &str, ttl: Duration) -> StoreResult<bool>;

    /// Drop `key` if `holder` owns it.
    async fn release_lease(&self, key: &str, holder: &str) -> StoreResult<()>;

    async fn lease_holder(&self, key: &str) -> StoreResult<Option<String>>;
}

/// Build a store from configuration. `memory://` selects the in-process store.
pub fn from_config(config: &StoreConfig, timeout: Duration) -> StoreResult<Arc<dyn CoordinationStore>> {
    if config.url.starts_with("memory://") {
        tracing::warn!("Using in-process coordination store; decisions are not shared");
        return Ok(Arc::new(MemoryStore::with_keys(&config.status_key, &config.telemetry_key)));
    }
    let store = RedisStore::new(config, timeout)?;
    Ok(Arc::new(store))
}
