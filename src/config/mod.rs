//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: PRIMARY_URL, REDIS_URL, ...)
//!     → validation.rs (semantic checks)
//!     → MonitorConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::MonitorConfig;
pub use schema::InstancesConfig;
pub use schema::StoreConfig;
pub use schema::FailoverPolicyConfig;
pub use schema::LeaseConfig;
pub use schema::ObservabilityConfig;
