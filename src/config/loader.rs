//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::MonitorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => {
                write!(f, "Invalid value for {}: '{}'", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment overrides, validate.
pub fn load(path: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Like [`load`], reading overrides through `lookup` instead of the process environment.
pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<MonitorConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => MonitorConfig::default(),
    };
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay environment-style options onto `config`.
///
/// `lookup` returns the raw value of a variable, if set. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut MonitorConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("PRIMARY_URL") {
        config.instances.primary_url = v;
    }
    if let Some(v) = get("SECONDARY_URL") {
        config.instances.secondary_url = v;
    }
    if let Some(v) = get("REDIS_URL") {
        config.store.url = v;
    }
    if let Some(v) = get("LOG_LEVEL") {
        config.observability.log_level = v;
    }

    parse_into("FAILOVER_TIMEOUT", get("FAILOVER_TIMEOUT"), &mut config.policy.failover_timeout_secs)?;
    parse_into("HEALTH_CHECK_INTERVAL", get("HEALTH_CHECK_INTERVAL"), &mut config.policy.poll_interval_secs)?;
    parse_into(
        "MAX_CONSECUTIVE_FAILURES",
        get("MAX_CONSECUTIVE_FAILURES"),
        &mut config.policy.max_consecutive_failures,
    )?;
    parse_into("RESTORE_GRACE_PERIOD", get("RESTORE_GRACE_PERIOD"), &mut config.policy.restore_grace_secs)?;

    Ok(())
}

fn parse_into<T: FromStr>(var: &'static str, raw: Option<String>, slot: &mut T) -> Result<(), ConfigError> {
    if let Some(raw) = raw {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value: raw.clone() })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MonitorConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PRIMARY_URL", "http://db-a:8080"),
                ("SECONDARY_URL", "http://db-b:8080"),
                ("REDIS_URL", "redis://coord:6379/2"),
                ("FAILOVER_TIMEOUT", "45"),
                ("HEALTH_CHECK_INTERVAL", "5"),
                ("MAX_CONSECUTIVE_FAILURES", "4"),
                ("RESTORE_GRACE_PERIOD", "60"),
            ]),
        )
        .unwrap();

        assert_eq!(config.instances.primary_url, "http://db-a:8080");
        assert_eq!(config.instances.secondary_url, "http://db-b:8080");
        assert_eq!(config.store.url, "redis://coord:6379/2");
        assert_eq!(config.policy.failover_timeout_secs, 45);
        assert_eq!(config.policy.poll_interval_secs, 5);
        assert_eq!(config.policy.max_consecutive_failures, 4);
        assert_eq!(config.policy.restore_grace_secs, 60);
    }

    #[test]
    fn test_empty_values_ignored() {
        let mut config = MonitorConfig::default();
        apply_env_overrides(&mut config, env(&[("FAILOVER_TIMEOUT", "  "), ("PRIMARY_URL", "")])).unwrap();
        assert_eq!(config.policy.failover_timeout_secs, 30);
        assert_eq!(config.instances.primary_url, "http://localhost:8080");
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut config = MonitorConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("HEALTH_CHECK_INTERVAL", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "HEALTH_CHECK_INTERVAL", .. }));
        assert!(err.to_string().contains("ten"));
    }

    #[test]
    fn test_load_config_file() {
        let path = std::env::temp_dir().join(format!("failover-monitor-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[instances]\nprimary_url = \"http://a:1\"\nsecondary_url = \"http://b:1\"\n[lease]\nenabled = false\n",
        )
        .unwrap();

        let config = load_with(Some(&path), env(&[("SECONDARY_URL", "http://c:1")])).unwrap();
        assert_eq!(config.instances.primary_url, "http://a:1");
        assert_eq!(config.instances.secondary_url, "http://c:1");
        assert!(!config.lease.enabled);

        let err = load_with(Some(&path), env(&[("SECONDARY_URL", "http://a:1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
