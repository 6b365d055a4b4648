//! Cluster membership model.
//!
//! # Data Flow
//! ```text
//! FailoverController decides a transition
//!     → ClusterStatusUpdate (partial, last-write-wins)
//!     → CoordinationStore::set_cluster_status
//!
//! Every tick:
//!     → MonitorTelemetry (overwritten)
//!     → CoordinationStore::set_telemetry
//! ```
//!
//! # Design Decisions
//! - Exactly one designee at any instant (`InstanceRole`)
//! - Telemetry is observability only, never read back for routing

pub mod status;

use url::Url;

pub use status::{ClusterStatus, ClusterStatusUpdate, InstanceRole, MonitorTelemetry};

/// One supervised service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub role: InstanceRole,
    pub base_url: Url,
}

impl Instance {
    pub fn new(role: InstanceRole, base_url: Url) -> Self {
        Self { role, base_url }
    }

    /// Absolute URL of `path` on this instance, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// The supervised pair.
#[derive(Debug, Clone)]
pub struct InstancePair {
    pub primary: Instance,
    pub secondary: Instance,
}

impl InstancePair {
    pub fn new(primary: Url, secondary: Url) -> Self {
        Self {
            primary: Instance::new(InstanceRole::Primary, primary),
            secondary: Instance::new(InstanceRole::Secondary, secondary),
        }
    }

    pub fn get(&self, role: InstanceRole) -> &Instance {
        match role {
            InstanceRole::Primary => &self.primary,
            InstanceRole::Secondary => &self.secondary,
        }
    }
}
