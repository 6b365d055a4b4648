//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, plain or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (instance, transition, alert)
//! - Metrics are cheap and no-ops until an exporter is installed
//! - Telemetry in the coordination store is separate from both

pub mod logging;
pub mod metrics;
