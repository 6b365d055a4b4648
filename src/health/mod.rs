//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor tick (failover::driver)
//!     → FailoverController decides which instance(s) to probe
//!     → prober.rs (one bounded GET /health per instance)
//!     → Health::Healthy | Health::Unhealthy(reason)
//!     → FailoverController counts failures and decides transitions
//! ```
//!
//! # Design Decisions
//! - The prober is stateless; counters and windows live in the state machine
//! - Network errors, non-2xx and timeouts are all just "unhealthy"

pub mod prober;

pub use prober::{Health, HealthProbe, HttpProber, ProbeFailure};
