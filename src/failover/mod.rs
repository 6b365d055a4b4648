//! Failover controller.
//!
//! # Data Flow
//! ```text
//! driver.rs (interval tick)
//!     → machine.rs: lease check → reconcile pending write
//!     → health probes → state.rs counters/windows → decision
//!     → on transition: control plane directives + cluster status write
//!     → telemetry write
//!     → alert.rs on conditions needing an operator
//! ```
//!
//! # Design Decisions
//! - One task, one in-flight evaluation; the state needs no locking
//! - No error kind stops the loop

pub mod alert;
pub mod driver;
pub mod machine;
pub mod state;

pub use alert::{Alert, AlertBus};
pub use driver::MonitorLoop;
pub use machine::{FailoverController, FailoverPolicy, Transition};
pub use state::{MonitorState, Phase};
