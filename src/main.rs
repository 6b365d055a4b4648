//! Primary/secondary failover monitor.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                  FAILOVER MONITOR                     │
//!                 │                                                       │
//!                 │  ┌──────────┐   ┌────────────────┐   ┌────────────┐  │
//!                 │  │  driver  │──▶│   failover     │──▶│   health   │──┼──▶ GET /health
//!                 │  │ (ticker) │   │ state machine  │   │   prober   │  │    (primary, secondary)
//!                 │  └──────────┘   └───────┬────────┘   └────────────┘  │
//!                 │                         │                             │
//!                 │            on transition│                             │
//!                 │              ┌──────────┴──────────┐                  │
//!                 │              ▼                     ▼                  │
//!                 │      ┌──────────────┐     ┌────────────────┐          │
//!                 │      │   control    │     │     store      │──────────┼──▶ Redis
//!                 │      │ (directives) │     │ status, lease, │          │    (cluster_status,
//!                 │      └──────┬───────┘     │   telemetry    │          │     monitor_status)
//!                 │             │             └────────────────┘          │
//!                 └─────────────┼─────────────────────────────────────────┘
//!                               ▼
//!                 POST /cluster/{promote,activate,standby}
//! ```

use std::path::PathBuf;

use clap::Parser;

use failover_monitor::config::loader;
use failover_monitor::lifecycle::{signals, startup, Shutdown};
use failover_monitor::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "failover-monitor")]
#[command(about = "Promotes the standby when the primary fails, restores it when it recovers", long_about = None)]
struct Args {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "FAILOVER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = loader::load(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("failover-monitor v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let monitor = startup::build(&config)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(monitor.run(receiver));

    signals::forward_to(&shutdown).await;
    handle.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
