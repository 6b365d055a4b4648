//! Active health probing.
//!
//! # Responsibilities
//! - Issue one bounded `GET {instance}/health` per call
//! - Fold every failure mode into `Health::Unhealthy`
//!
//! # Design Decisions
//! - No retries here; repeated ticks are the retry policy
//! - No pooled connections, each probe opens and releases its own

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time;

use crate::cluster::Instance;
use crate::observability::metrics;

/// Why a probe counted as unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("non-success status {0}")]
    Status(u16),
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy(ProbeFailure),
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Liveness check against one instance.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, instance: &Instance, timeout: Duration) -> Health;
}

/// HTTP prober used in production.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    path: String,
}

impl HttpProber {
    pub fn new(path: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("failover-monitor-health-check")
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            path: path.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpProber {
    async fn probe(&self, instance: &Instance, timeout: Duration) -> Health {
        let url = instance.endpoint(&self.path);
        let response_future = self.client.get(&url).send();

        let health = match time::timeout(timeout, response_future).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    Health::Healthy
                } else {
                    tracing::warn!(instance = %instance.role, url = %url, status = %status, "Health check failed: non-success status");
                    Health::Unhealthy(ProbeFailure::Status(status.as_u16()))
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(instance = %instance.role, url = %url, error = %e, "Health check failed: connection error");
                Health::Unhealthy(ProbeFailure::Connect(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(instance = %instance.role, url = %url, "Health check failed: timeout");
                Health::Unhealthy(ProbeFailure::Timeout(timeout))
            }
        };

        metrics::record_probe(instance.role.as_str(), health.is_healthy());
        health
    }
}
