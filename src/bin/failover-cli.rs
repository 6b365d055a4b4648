use clap::{Parser, Subcommand};
use serde_json::json;

use failover_monitor::config::StoreConfig;
use failover_monitor::store::{self, CoordinationStore};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "failover-cli")]
#[command(about = "Inspect the failover monitor's records in the coordination store", long_about = None)]
struct Cli {
    #[arg(short, long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    store_url: String,

    #[arg(long, default_value = "cluster_status")]
    status_key: String,

    #[arg(long, default_value = "monitor_status")]
    telemetry_key: String,

    #[arg(long, default_value = "failover:leader")]
    lease_key: String,

    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which instance is the authoritative primary
    Status,
    /// Show the monitor's last telemetry record
    Telemetry,
    /// Show which monitor process holds the leadership lease
    Leader,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = StoreConfig {
        url: cli.store_url.clone(),
        status_key: cli.status_key.clone(),
        telemetry_key: cli.telemetry_key.clone(),
    };
    let store = store::from_config(&config, Duration::from_millis(cli.timeout_ms))?;

    let output = match cli.command {
        Commands::Status => {
            let status = store.get_cluster_status().await?;
            serde_json::to_value(status)?
        }
        Commands::Telemetry => match store.get_telemetry().await? {
            Some(telemetry) => serde_json::to_value(telemetry)?,
            None => json!({ "error": "no telemetry recorded yet" }),
        },
        Commands::Leader => {
            let holder = store.lease_holder(&cli.lease_key).await?;
            json!({ "lease_key": cli.lease_key, "holder": holder })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
