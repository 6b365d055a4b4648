//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate instance endpoints and the store connection string
//! - Validate value ranges (intervals and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::config::schema::MonitorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let primary = check_instance_url("instances.primary_url", &config.instances.primary_url, &mut errors);
    let secondary = check_instance_url("instances.secondary_url", &config.instances.secondary_url, &mut errors);
    if let (Some(p), Some(s)) = (primary, secondary) {
        if p == s {
            errors.push(ValidationError::new(
                "instances.secondary_url",
                "primary and secondary must be different instances",
            ));
        }
    }

    match Url::parse(&config.store.url) {
        Ok(url) if matches!(url.scheme(), "redis" | "rediss" | "memory") => {}
        Ok(url) => errors.push(ValidationError::new(
            "store.url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("store.url", e.to_string())),
    }
    if config.store.status_key.is_empty() {
        errors.push(ValidationError::new("store.status_key", "must not be empty"));
    }
    if config.store.telemetry_key.is_empty() {
        errors.push(ValidationError::new("store.telemetry_key", "must not be empty"));
    }
    if config.store.status_key == config.store.telemetry_key {
        errors.push(ValidationError::new(
            "store.telemetry_key",
            "must differ from store.status_key",
        ));
    }

    let policy = &config.policy;
    if policy.failover_timeout_secs == 0 {
        errors.push(ValidationError::new("policy.failover_timeout_secs", "must be > 0"));
    }
    if policy.poll_interval_secs == 0 {
        errors.push(ValidationError::new("policy.poll_interval_secs", "must be > 0"));
    }
    if policy.max_consecutive_failures == 0 {
        errors.push(ValidationError::new("policy.max_consecutive_failures", "must be >= 1"));
    }
    if policy.restore_grace_secs == 0 {
        errors.push(ValidationError::new("policy.restore_grace_secs", "must be > 0"));
    }

    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }

    if config.timeouts.probe_secs == 0 {
        errors.push(ValidationError::new("timeouts.probe_secs", "must be > 0"));
    }
    if config.timeouts.directive_secs == 0 {
        errors.push(ValidationError::new("timeouts.directive_secs", "must be > 0"));
    }
    if config.timeouts.store_ms == 0 {
        errors.push(ValidationError::new("timeouts.store_ms", "must be > 0"));
    }

    if config.directives.base_delay_ms > config.directives.max_delay_ms {
        errors.push(ValidationError::new(
            "directives.base_delay_ms",
            "must not exceed directives.max_delay_ms",
        ));
    }

    if config.lease.enabled {
        if config.lease.key.is_empty() {
            errors.push(ValidationError::new("lease.key", "must not be empty"));
        }
        let needed = policy.poll_interval() + config.tick_budget();
        if Duration::from_secs(config.lease.ttl_secs) <= needed {
            errors.push(ValidationError::new(
                "lease.ttl_secs",
                format!(
                    "must be greater than policy.poll_interval_secs plus the worst-case tick ({}s)",
                    needed.as_secs_f64()
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_instance_url(field: &'static str, raw: &str, errors: &mut Vec<ValidationError>) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Some(url),
        Ok(_) => {
            errors.push(ValidationError::new(field, "must be an http(s) URL with a host"));
            None
        }
        Err(e) => {
            errors.push(ValidationError::new(field, e.to_string()));
            None
        }
    }
}
