//! Monitor loop driver.
//!
//! # Responsibilities
//! - Run one controller tick per poll interval
//! - Never overlap two ticks
//! - Stop between ticks when shutdown is signalled, releasing the lease

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::failover::machine::{FailoverController, Transition};

pub struct MonitorLoop {
    controller: FailoverController,
    interval: Duration,
}

impl MonitorLoop {
    pub fn new(controller: FailoverController, interval: Duration) -> Self {
        Self {
            controller,
            interval,
        }
    }

    /// Run until `shutdown` fires. Returns the controller for inspection.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> FailoverController {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "Failover monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let transition = self.controller.tick().await;
                    match &transition {
                        Transition::PrimaryHealthy | Transition::ActingPrimaryHealthy => {
                            tracing::trace!(transition = transition.kind(), "Tick complete");
                        }
                        _ => {
                            tracing::debug!(
                                transition = transition.kind(),
                                phase = self.controller.phase().as_str(),
                                "Tick complete"
                            );
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Failover monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        self.controller.shutdown().await;
        self.controller
    }
}
