//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated `MonitorConfig` into a ready `MonitorLoop`
//! - Build store, prober, control plane and lease in dependency order
//!
//! # Design Decisions
//! - Fail fast on invalid endpoints; a down store or instance is not a startup error

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::cluster::InstancePair;
use crate::config::MonitorConfig;
use crate::control::HttpControlPlane;
use crate::failover::{FailoverController, FailoverPolicy, MonitorLoop};
use crate::health::HttpProber;
use crate::resilience::retries::RetryPolicy;
use crate::store::{self, CoordinationStore, LeaseKeeper, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid instance url: {0}")]
    Url(#[from] url::ParseError),

    #[error("cannot build http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cannot create coordination store client: {0}")]
    Store(#[from] StoreError),
}

/// Build the controller and its loop from configuration.
pub fn build(config: &MonitorConfig) -> Result<MonitorLoop, StartupError> {
    let store = store::from_config(&config.store, Duration::from_millis(config.timeouts.store_ms))?;
    build_with(config, store, Arc::new(SystemClock))
}

/// Like [`build`], with an explicit store and clock.
pub fn build_with(
    config: &MonitorConfig,
    store: Arc<dyn CoordinationStore>,
    clock: Arc<dyn Clock>,
) -> Result<MonitorLoop, StartupError> {
    let controller = build_controller(config, store, clock)?;
    Ok(MonitorLoop::new(controller, config.policy.poll_interval()))
}

/// Build the controller alone, for callers that drive ticks themselves.
pub fn build_controller(
    config: &MonitorConfig,
    store: Arc<dyn CoordinationStore>,
    clock: Arc<dyn Clock>,
) -> Result<FailoverController, StartupError> {
    let instances = InstancePair::new(
        Url::parse(&config.instances.primary_url)?,
        Url::parse(&config.instances.secondary_url)?,
    );
    let prober = HttpProber::new(config.health_check.path.clone())?;
    let control = HttpControlPlane::new(
        Duration::from_secs(config.timeouts.directive_secs),
        RetryPolicy::from(&config.directives),
    )?;

    let mut controller = FailoverController::new(
        instances,
        FailoverPolicy::from(config),
        Arc::new(prober),
        store,
        Arc::new(control),
        clock,
    );
    if config.lease.enabled {
        let lease = LeaseKeeper::from_config(&config.lease);
        tracing::info!(key = %config.lease.key, holder = %lease.holder(), "Leadership lease enabled");
        controller = controller.with_lease(lease);
    } else {
        tracing::warn!("Leadership lease disabled; run exactly one monitor per cluster");
    }

    tracing::info!(
        primary = %config.instances.primary_url,
        secondary = %config.instances.secondary_url,
        store = %redact(&config.store.url),
        max_consecutive_failures = config.policy.max_consecutive_failures,
        failover_timeout_secs = config.policy.failover_timeout_secs,
        restore_grace_secs = config.policy.restore_grace_secs,
        "Failover controller configured"
    );

    Ok(controller)
}

/// Hide credentials in a connection string for logging.
fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(redact("redis://:hunter2@coord:6379/0"), "redis://:***@coord:6379/0");
        assert_eq!(redact("redis://coord:6379"), "redis://coord:6379");
    }

    #[tokio::test]
    async fn test_build_from_defaults() {
        let mut config = MonitorConfig::default();
        config.store.url = "memory://".into();
        assert!(build(&config).is_ok());
    }
}
