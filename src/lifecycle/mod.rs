//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → store, prober, control plane, lease → FailoverController
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → monitor loop finishes its tick → lease released → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast on configuration errors, never on dependency outages
//! - No mid-tick cancellation

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
