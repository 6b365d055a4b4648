//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the failover monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// The two service instances under supervision.
    pub instances: InstancesConfig,

    /// Coordination store connection and key layout.
    pub store: StoreConfig,

    /// Failover / restoration thresholds.
    pub policy: FailoverPolicyConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Control-plane directive delivery.
    pub directives: DirectiveConfig,

    /// Single-writer leadership lease.
    pub lease: LeaseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl MonitorConfig {
    /// Longest one tick can take when every call runs into its timeout.
    ///
    /// Counts seven store round trips (connect, lease renew and acquire,
    /// hydrate, pending write, status write, telemetry), two probes and the
    /// two directives of a restoration with all retries and jittered backoff.
    pub fn tick_budget(&self) -> Duration {
        let store = Duration::from_millis(self.timeouts.store_ms) * 7;
        let probes = Duration::from_secs(self.timeouts.probe_secs) * 2;

        let retries = self.directives.max_retries;
        let backoff_ms = self.directives.max_delay_ms + self.directives.max_delay_ms / 10;
        let directive = Duration::from_secs(self.timeouts.directive_secs) * (retries + 1)
            + Duration::from_millis(backoff_ms) * retries;

        store + probes + directive * 2
    }
}

/// Instance endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstancesConfig {
    /// Base URL of the original primary (e.g., "http://10.0.0.1:8080").
    pub primary_url: String,

    /// Base URL of the standby instance.
    pub secondary_url: String,
}

impl Default for InstancesConfig {
    fn default() -> Self {
        Self {
            primary_url: "http://localhost:8080".to_string(),
            secondary_url: "http://localhost:8081".to_string(),
        }
    }
}

/// Coordination store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection string ("redis://host:port/db", or "memory://" for an in-process store).
    pub url: String,

    /// Hash key holding the authoritative cluster status.
    pub status_key: String,

    /// Hash key holding the monitor telemetry.
    pub telemetry_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            status_key: "cluster_status".to_string(),
            telemetry_key: "monitor_status".to_string(),
        }
    }
}

/// Thresholds driving promotion and restoration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailoverPolicyConfig {
    /// Seconds of continuous failure after which the secondary is promoted.
    pub failover_timeout_secs: u64,

    /// Seconds between two evaluations.
    pub poll_interval_secs: u64,

    /// Consecutive failed probes after which the secondary is promoted.
    pub max_consecutive_failures: u32,

    /// Seconds the original primary must stay healthy before it is restored.
    pub restore_grace_secs: u64,
}

impl FailoverPolicyConfig {
    pub fn failover_timeout(&self) -> Duration {
        Duration::from_secs(self.failover_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn restore_grace(&self) -> Duration {
        Duration::from_secs(self.restore_grace_secs)
    }
}

impl Default for FailoverPolicyConfig {
    fn default() -> Self {
        Self {
            failover_timeout_secs: 30,
            poll_interval_secs: 10,
            max_consecutive_failures: 3,
            restore_grace_secs: 30,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path to probe for HTTP health checks.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
        }
    }
}

/// Timeout configuration for the network calls made by one tick.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Health probe timeout in seconds.
    pub probe_secs: u64,

    /// Control-plane directive timeout in seconds.
    pub directive_secs: u64,

    /// Coordination store command timeout in milliseconds.
    pub store_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 5,
            directive_secs: 5,
            store_ms: 2000,
        }
    }
}

/// Directive delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectiveConfig {
    /// Extra attempts after a failed directive (0 = fire once).
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Leadership lease configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LeaseConfig {
    /// Require the lease before acting on transitions.
    pub enabled: bool,

    /// Store key of the lease.
    pub key: String,

    /// Lease time-to-live in seconds. Must exceed the poll interval plus
    /// `MonitorConfig::tick_budget`.
    pub ttl_secs: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key: "failover:leader".to_string(),
            ttl_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.policy.failover_timeout(), Duration::from_secs(30));
        assert_eq!(config.policy.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.policy.max_consecutive_failures, 3);
        assert_eq!(config.policy.restore_grace(), Duration::from_secs(30));
        assert_eq!(config.health_check.path, "/health");
        assert!(config.lease.enabled);
        assert_eq!(config.lease.ttl_secs, 60);
    }

    #[test]
    fn test_tick_budget() {
        let mut config = MonitorConfig::default();
        assert_eq!(config.tick_budget(), Duration::from_secs(34));

        config.directives.max_retries = 3;
        // 14s store + 10s probes + 2 x (4 x 5s + 3 x 2.2s)
        assert_eq!(config.tick_budget(), Duration::from_millis(77_200));
    }

    #[test]
    fn test_partial_toml() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [instances]
            primary_url = "http://10.0.0.1:8080"

            [policy]
            max_consecutive_failures = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.instances.primary_url, "http://10.0.0.1:8080");
        assert_eq!(config.instances.secondary_url, "http://localhost:8081");
        assert_eq!(config.policy.max_consecutive_failures, 5);
        assert_eq!(config.policy.poll_interval_secs, 10);
    }
}
