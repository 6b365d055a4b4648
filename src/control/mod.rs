//! Control-plane directives.
//!
//! # Data Flow
//! ```text
//! FailoverController transition
//!     → ControlPlane::promote / activate / demote_to_standby
//!     → POST {instance}/cluster/{promote|activate|standby}
//!     → failure logged, transition proceeds regardless
//! ```
//!
//! # Design Decisions
//! - Directives are a nudge to the instances, not the record of the decision
//! - Bounded timeout per attempt, optional bounded retry

pub mod client;

pub use client::{ControlPlane, Directive, DirectiveError, HttpControlPlane};
