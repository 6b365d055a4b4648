//! Redis-backed coordination store.
//!
//! # Responsibilities
//! - Map cluster status and telemetry onto two Redis hashes
//! - Apply a status update's upserts and deletes atomically
//! - Implement the leadership lease with `SET NX PX` and owner-checked scripts
//! - Bound every command with the configured store timeout
//!
//! # Design Decisions
//! - Connection is established lazily so the monitor starts while Redis is down
//! - `ConnectionManager` reconnects transparently after the first success

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::cluster::{ClusterStatus, ClusterStatusUpdate, MonitorTelemetry};
use crate::config::StoreConfig;
use crate::observability::metrics;
use crate::store::{CoordinationStore, StoreError, StoreResult};

const RENEW_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Coordination store on a shared Redis instance.
pub struct RedisStore {
    client: redis::Client,
    conn: Mutex<Option<ConnectionManager>>,
    status_key: String,
    telemetry_key: String,
    timeout: Duration,
}

impl RedisStore {
    /// Create a store client. Does not connect until the first command.
    pub fn new(config: &StoreConfig, timeout: Duration) -> StoreResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Unavailable(format!("invalid redis url: {}", e)))?;

        Ok(Self {
            client,
            conn: Mutex::new(None),
            status_key: config.status_key.clone(),
            telemetry_key: config.telemetry_key.clone(),
            timeout,
        })
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .bounded("connect", ConnectionManager::new(self.client.clone()))
            .await?;
        tracing::info!("Connected to coordination store");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        let result = match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };
        if result.is_err() {
            metrics::record_store_error(op);
        }
        result
    }

    async fn hgetall(&self, op: &'static str, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.connection().await?;
        self.bounded(op, conn.hgetall(key)).await
    }

    async fn hset(&self, op: &'static str, key: &str, fields: &[(&'static str, String)]) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        self.bounded(op, conn.hset_multiple(key, fields)).await
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn get_cluster_status(&self) -> StoreResult<ClusterStatus> {
        let map = self.hgetall("get_cluster_status", &self.status_key).await?;
        ClusterStatus::from_fields(&map)
    }

    async fn set_cluster_status(&self, update: &ClusterStatusUpdate) -> StoreResult<()> {
        let fields = update.to_fields();
        let cleared = update.cleared_fields();
        if cleared.is_empty() {
            return self.hset("set_cluster_status", &self.status_key, &fields).await;
        }

        // Upsert and delete in one MULTI so readers never see a half-applied promotion.
        let mut pipe = redis::pipe();
        pipe.atomic();
        if !fields.is_empty() {
            pipe.hset_multiple(&self.status_key, fields.as_slice()).ignore();
        }
        pipe.hdel(&self.status_key, cleared.as_slice()).ignore();

        let mut conn = self.connection().await?;
        self.bounded("set_cluster_status", pipe.query_async(&mut conn)).await
    }

    async fn get_telemetry(&self) -> StoreResult<Option<MonitorTelemetry>> {
        let map = self.hgetall("get_telemetry", &self.telemetry_key).await?;
        MonitorTelemetry::from_fields(&map)
    }

    async fn set_telemetry(&self, telemetry: &MonitorTelemetry) -> StoreResult<()> {
        self.hset("set_telemetry", &self.telemetry_key, &telemetry.to_fields()).await
    }

    async fn try_acquire_lease(&self, key: &str, holder: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key)
            .arg(holder)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64);
        let reply: Option<String> = self.bounded("acquire_lease", cmd.query_async(&mut conn)).await?;
        Ok(reply.is_some())
    }

    async fn renew_lease(&self, key: &str, holder: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let script = redis::Script::new(RENEW_SCRIPT);
        let mut invocation = script.key(key);
        invocation.arg(holder).arg(ttl.as_millis() as u64);
        let extended: i64 = self.bounded("renew_lease", invocation.invoke_async(&mut conn)).await?;
        Ok(extended == 1)
    }

    async fn release_lease(&self, key: &str, holder: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let script = redis::Script::new(RELEASE_SCRIPT);
        let mut invocation = script.key(key);
        invocation.arg(holder);
        let _: i64 = self.bounded("release_lease", invocation.invoke_async(&mut conn)).await?;
        Ok(())
    }

    async fn lease_holder(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection().await?;
        self.bounded("lease_holder", conn.get(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_url() {
        let config = StoreConfig {
            url: "not-a-url".into(),
            ..Default::default()
        };
        assert!(RedisStore::new(&config, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        // Nothing listens on port 1.
        let config = StoreConfig {
            url: "redis://127.0.0.1:1".into(),
            ..Default::default()
        };
        let store = RedisStore::new(&config, Duration::from_millis(500)).unwrap();

        let err = store.get_cluster_status().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
