//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Control-plane directive:
//!     → retries.rs (bounded attempts)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Every external call already carries its own timeout
//! - Retries are opt-in; the default is a single best-effort attempt
//! - The authoritative record is the store, so giving up is always safe

pub mod backoff;
pub mod retries;
