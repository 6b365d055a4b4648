//! Primary/secondary failover monitor library.

pub mod clock;
pub mod cluster;
pub mod config;
pub mod control;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod store;

pub use config::MonitorConfig;
pub use failover::{FailoverController, MonitorLoop};
pub use lifecycle::Shutdown;
