//! Persisted cluster records.
//!
//! Both records are stored as flat string hashes in the coordination store;
//! timestamps are RFC 3339 (ISO-8601) strings.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Field names of the cluster-status hash.
pub mod fields {
    pub const PRIMARY_INSTANCE: &str = "primary_instance";
    pub const FAILOVER_TIME: &str = "failover_time";
    pub const FAILOVER_REASON: &str = "failover_reason";
    pub const RESTORE_TIME: &str = "restore_time";

    pub const LAST_CHECK: &str = "last_check";
    pub const CURRENT_PRIMARY: &str = "current_primary";
    pub const CONSECUTIVE_FAILURES: &str = "consecutive_failures";
}

/// Reason code recorded on promotion.
pub const REASON_PRIMARY_HEALTH_CHECK_FAILED: &str = "primary_health_check_failed";

/// Which physical instance a designation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceRole {
    Primary,
    Secondary,
}

impl InstanceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceRole::Primary => "primary",
            InstanceRole::Secondary => "secondary",
        }
    }
}

impl fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(InstanceRole::Primary),
            "secondary" => Ok(InstanceRole::Secondary),
            other => Err(format!("unknown instance role '{}'", other)),
        }
    }
}

/// Authoritative designation of the primary instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub primary_instance: InstanceRole,
    pub failover_time: Option<DateTime<Utc>>,
    pub failover_reason: Option<String>,
    pub restore_time: Option<DateTime<Utc>>,
}

impl Default for ClusterStatus {
    fn default() -> Self {
        Self {
            primary_instance: InstanceRole::Primary,
            failover_time: None,
            failover_reason: None,
            restore_time: None,
        }
    }
}

impl ClusterStatus {
    /// Decode from a stored hash. A missing hash means nothing was ever decided.
    pub fn from_fields(map: &HashMap<String, String>) -> Result<Self, StoreError> {
        let primary_instance = match map.get(fields::PRIMARY_INSTANCE) {
            Some(raw) => raw.parse().map_err(|_| StoreError::InvalidValue {
                field: fields::PRIMARY_INSTANCE,
                value: raw.clone(),
            })?,
            None => InstanceRole::Primary,
        };

        Ok(Self {
            primary_instance,
            failover_time: parse_time(map, fields::FAILOVER_TIME)?,
            failover_reason: map.get(fields::FAILOVER_REASON).cloned(),
            restore_time: parse_time(map, fields::RESTORE_TIME)?,
        })
    }
}

/// Partial cluster-status write. Only `Some` fields are sent to the store.
///
/// A promotion also deletes `restore_time`, so a stored record never pairs a
/// new failover with the restore that ended the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStatusUpdate {
    pub primary_instance: Option<InstanceRole>,
    pub failover_time: Option<DateTime<Utc>>,
    pub failover_reason: Option<String>,
    pub restore_time: Option<DateTime<Utc>>,
    pub clear_restore_time: bool,
}

impl ClusterStatusUpdate {
    pub fn promotion(at: DateTime<Utc>, reason: &str) -> Self {
        Self {
            primary_instance: Some(InstanceRole::Secondary),
            failover_time: Some(at),
            failover_reason: Some(reason.to_string()),
            restore_time: None,
            clear_restore_time: true,
        }
    }

    pub fn restoration(at: DateTime<Utc>) -> Self {
        Self {
            primary_instance: Some(InstanceRole::Primary),
            restore_time: Some(at),
            ..Default::default()
        }
    }

    /// Fold a newer update on top of this one.
    pub fn merge(&mut self, newer: ClusterStatusUpdate) {
        if newer.primary_instance.is_some() {
            self.primary_instance = newer.primary_instance;
        }
        if newer.failover_time.is_some() {
            self.failover_time = newer.failover_time;
        }
        if newer.failover_reason.is_some() {
            self.failover_reason = newer.failover_reason;
        }
        if newer.restore_time.is_some() {
            self.restore_time = newer.restore_time;
            self.clear_restore_time = false;
        } else if newer.clear_restore_time {
            self.restore_time = None;
            self.clear_restore_time = true;
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(4);
        if let Some(role) = self.primary_instance {
            out.push((fields::PRIMARY_INSTANCE, role.to_string()));
        }
        if let Some(t) = self.failover_time {
            out.push((fields::FAILOVER_TIME, format_time(t)));
        }
        if let Some(reason) = &self.failover_reason {
            out.push((fields::FAILOVER_REASON, reason.clone()));
        }
        if let Some(t) = self.restore_time {
            out.push((fields::RESTORE_TIME, format_time(t)));
        }
        out
    }

    /// Fields to delete from the stored hash.
    pub fn cleared_fields(&self) -> Vec<&'static str> {
        if self.clear_restore_time && self.restore_time.is_none() {
            vec![fields::RESTORE_TIME]
        } else {
            Vec::new()
        }
    }
}

/// Per-tick liveness record of the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorTelemetry {
    pub last_check: DateTime<Utc>,
    pub current_primary: InstanceRole,
    pub consecutive_failures: u32,
}

impl MonitorTelemetry {
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (fields::LAST_CHECK, format_time(self.last_check)),
            (fields::CURRENT_PRIMARY, self.current_primary.to_string()),
            (fields::CONSECUTIVE_FAILURES, self.consecutive_failures.to_string()),
        ]
    }

    /// Decode from a stored hash; `None` if no telemetry was ever written.
    pub fn from_fields(map: &HashMap<String, String>) -> Result<Option<Self>, StoreError> {
        let Some(last_check) = parse_time(map, fields::LAST_CHECK)? else {
            return Ok(None);
        };
        let current_primary = match map.get(fields::CURRENT_PRIMARY) {
            Some(raw) => raw.parse().map_err(|_| StoreError::InvalidValue {
                field: fields::CURRENT_PRIMARY,
                value: raw.clone(),
            })?,
            None => InstanceRole::Primary,
        };
        let consecutive_failures = match map.get(fields::CONSECUTIVE_FAILURES) {
            Some(raw) => raw.parse().map_err(|_| StoreError::InvalidValue {
                field: fields::CONSECUTIVE_FAILURES,
                value: raw.clone(),
            })?,
            None => 0,
        };

        Ok(Some(Self {
            last_check,
            current_primary,
            consecutive_failures,
        }))
    }
}

pub fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(map: &HashMap<String, String>, field: &'static str) -> Result<Option<DateTime<Utc>>, StoreError> {
    match map.get(field) {
        Some(raw) if !raw.is_empty() => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| StoreError::InvalidValue {
                field,
                value: raw.clone(),
            }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(pairs: Vec<(&'static str, String)>) -> HashMap<String, String> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("PRIMARY".parse::<InstanceRole>().unwrap(), InstanceRole::Primary);
        assert_eq!(" secondary ".parse::<InstanceRole>().unwrap(), InstanceRole::Secondary);
        assert!("tertiary".parse::<InstanceRole>().is_err());
    }

    #[test]
    fn test_empty_hash_means_primary() {
        let status = ClusterStatus::from_fields(&HashMap::new()).unwrap();
        assert_eq!(status, ClusterStatus::default());
    }

    #[test]
    fn test_promotion_fields() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.250Z").unwrap().with_timezone(&Utc);
        let update = ClusterStatusUpdate::promotion(at, REASON_PRIMARY_HEALTH_CHECK_FAILED);
        let map = hash(update.to_fields());

        assert_eq!(map[fields::PRIMARY_INSTANCE], "secondary");
        assert_eq!(map[fields::FAILOVER_TIME], "2024-05-01T10:00:00.250Z");
        assert_eq!(map[fields::FAILOVER_REASON], "primary_health_check_failed");
        assert!(!map.contains_key(fields::RESTORE_TIME));

        let status = ClusterStatus::from_fields(&map).unwrap();
        assert_eq!(status.primary_instance, InstanceRole::Secondary);
        assert_eq!(status.failover_time, Some(at));
    }

    #[test]
    fn test_promotion_clears_restore_time() {
        let update = ClusterStatusUpdate::promotion(Utc::now(), "x");
        assert_eq!(update.cleared_fields(), vec![fields::RESTORE_TIME]);
        assert!(ClusterStatusUpdate::restoration(Utc::now()).cleared_fields().is_empty());
    }

    #[test]
    fn test_merge_prefers_newer() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(60);
        let mut pending = ClusterStatusUpdate::promotion(t0, "x");
        pending.merge(ClusterStatusUpdate::restoration(t1));
        assert_eq!(pending.primary_instance, Some(InstanceRole::Primary));
        assert_eq!(pending.failover_time, Some(t0));
        assert_eq!(pending.restore_time, Some(t1));
        assert!(pending.cleared_fields().is_empty());

        // A promotion on top of a pending restoration deletes it again.
        pending.merge(ClusterStatusUpdate::promotion(t1 + chrono::Duration::seconds(60), "x"));
        assert_eq!(pending.restore_time, None);
        assert_eq!(pending.cleared_fields(), vec![fields::RESTORE_TIME]);
    }

    #[test]
    fn test_corrupt_values() {
        let map = hash(vec![(fields::PRIMARY_INSTANCE, "both".into())]);
        assert!(matches!(
            ClusterStatus::from_fields(&map),
            Err(StoreError::InvalidValue { field: "primary_instance", .. })
        ));

        let map = hash(vec![(fields::LAST_CHECK, "yesterday".into())]);
        assert!(MonitorTelemetry::from_fields(&map).is_err());
    }

    #[test]
    fn test_telemetry_fields() {
        let telemetry = MonitorTelemetry {
            last_check: Utc::now(),
            current_primary: InstanceRole::Secondary,
            consecutive_failures: 2,
        };
        let map = hash(telemetry.to_fields());
        assert_eq!(map[fields::CONSECUTIVE_FAILURES], "2");
        assert_eq!(map[fields::CURRENT_PRIMARY], "secondary");

        let decoded = MonitorTelemetry::from_fields(&map).unwrap().unwrap();
        assert_eq!(decoded.current_primary, InstanceRole::Secondary);
        assert_eq!(decoded.consecutive_failures, 2);
        assert!(MonitorTelemetry::from_fields(&HashMap::new()).unwrap().is_none());
    }
}
