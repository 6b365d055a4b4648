//! HTTP control-plane client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

use crate::cluster::Instance;
use crate::observability::metrics;
use crate::resilience::retries::{retry_with_backoff, RetryPolicy};

/// A directive sent to one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Promote,
    Activate,
    Standby,
}

impl Directive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::Promote => "promote",
            Directive::Activate => "activate",
            Directive::Standby => "standby",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Directive::Promote => "/cluster/promote",
            Directive::Activate => "/cluster/activate",
            Directive::Standby => "/cluster/standby",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from delivering a directive.
#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("instance answered with status {0}")]
    Status(u16),
}

/// Sends directives to instances.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn send(&self, instance: &Instance, directive: Directive) -> Result<(), DirectiveError>;

    async fn promote(&self, instance: &Instance) -> Result<(), DirectiveError> {
        self.send(instance, Directive::Promote).await
    }

    async fn demote_to_standby(&self, instance: &Instance) -> Result<(), DirectiveError> {
        self.send(instance, Directive::Standby).await
    }

    async fn activate(&self, instance: &Instance) -> Result<(), DirectiveError> {
        self.send(instance, Directive::Activate).await
    }
}

/// Control-plane client speaking HTTP to the instances.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpControlPlane {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("failover-monitor")
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            timeout,
            retry,
        })
    }

    async fn attempt(&self, url: &str) -> Result<(), DirectiveError> {
        match timeout(self.timeout, self.client.post(url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(DirectiveError::Status(response.status().as_u16())),
            Ok(Err(e)) => Err(DirectiveError::Request(e.to_string())),
            Err(_) => Err(DirectiveError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn send(&self, instance: &Instance, directive: Directive) -> Result<(), DirectiveError> {
        let url = instance.endpoint(directive.path());
        let result = retry_with_backoff(self.retry, |_| self.attempt(&url)).await;

        match &result {
            Ok(()) => {
                tracing::info!(instance = %instance.role, directive = %directive, "Directive delivered");
            }
            Err(e) => {
                tracing::warn!(instance = %instance.role, directive = %directive, url = %url, error = %e, "Directive failed");
                metrics::record_directive_failure(directive.as_str());
            }
        }
        result
    }
}
