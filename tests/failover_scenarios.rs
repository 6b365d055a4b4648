//! End-to-end failover scenarios against mock HTTP instances.

use std::sync::Arc;
use std::time::Duration;

use failover_monitor::clock::ManualClock;
use failover_monitor::cluster::InstanceRole;
use failover_monitor::config::MonitorConfig;
use failover_monitor::failover::{Alert, FailoverController, MonitorLoop, Phase, Transition};
use failover_monitor::lifecycle::{startup, Shutdown};
use failover_monitor::store::{CoordinationStore, MemoryStore};

mod common;

use common::MockInstance;

struct Cluster {
    primary: MockInstance,
    secondary: MockInstance,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    config: MonitorConfig,
}

impl Cluster {
    async fn start() -> Self {
        let primary = common::start_mock_instance(true).await;
        let secondary = common::start_mock_instance(true).await;

        let mut config = MonitorConfig::default();
        config.instances.primary_url = primary.url();
        config.instances.secondary_url = secondary.url();
        config.store.url = "memory://".into();
        config.timeouts.probe_secs = 1;
        config.timeouts.directive_secs = 1;
        config.lease.enabled = false;

        Self {
            primary,
            secondary,
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(ManualClock::default()),
            config,
        }
    }

    fn controller(&self) -> FailoverController {
        startup::build_controller(&self.config, self.store.clone(), self.clock.clone()).unwrap()
    }

    /// Tick, then move the clock one poll interval forward.
    async fn tick(&self, controller: &mut FailoverController) -> Transition {
        let transition = controller.tick().await;
        self.clock.advance(self.config.policy.poll_interval());
        transition
    }
}

#[tokio::test]
async fn test_promotion_after_consecutive_failures() {
    let cluster = Cluster::start().await;
    let mut controller = cluster.controller();

    assert_eq!(cluster.tick(&mut controller).await, Transition::PrimaryHealthy);

    cluster.primary.set_healthy(false);
    cluster.tick(&mut controller).await;
    cluster.tick(&mut controller).await;
    assert!(matches!(cluster.tick(&mut controller).await, Transition::Promoted { .. }));

    assert_eq!(controller.phase(), Phase::MonitoringSecondaryAsPrimary);
    let status = cluster.store.get_cluster_status().await.unwrap();
    assert_eq!(status.primary_instance, InstanceRole::Secondary);
    assert!(status.failover_time.is_some());
    assert_eq!(cluster.secondary.directives(), vec!["POST /cluster/promote"]);

    let telemetry = cluster.store.get_telemetry().await.unwrap().unwrap();
    assert_eq!(telemetry.current_primary, InstanceRole::Secondary);
    assert_eq!(telemetry.consecutive_failures, 0);
}

#[tokio::test]
async fn test_promotion_on_failure_window_timeout() {
    let cluster = Cluster::start().await;
    let mut controller = cluster.controller();
    cluster.primary.set_healthy(false);

    assert_eq!(
        controller.tick().await,
        Transition::FailureCounted { consecutive_failures: 1 }
    );
    cluster.clock.advance(Duration::from_secs(31));

    assert!(matches!(controller.tick().await, Transition::Promoted { .. }));
    let status = cluster.store.get_cluster_status().await.unwrap();
    assert_eq!(status.primary_instance, InstanceRole::Secondary);
}

#[tokio::test]
async fn test_no_promotion_on_dual_outage() {
    let cluster = Cluster::start().await;
    let mut controller = cluster.controller();
    let mut alerts = controller.alerts().subscribe();
    cluster.primary.set_healthy(false);
    cluster.secondary.set_healthy(false);

    cluster.tick(&mut controller).await;
    cluster.tick(&mut controller).await;
    assert_eq!(cluster.tick(&mut controller).await, Transition::DualOutage);

    assert_eq!(controller.phase(), Phase::MonitoringPrimary);
    assert_eq!(cluster.store.status_writes(), 0);
    assert!(cluster.secondary.directives().is_empty());
    assert!(matches!(alerts.try_recv(), Ok(Alert::DualOutage { .. })));

    // Monitoring of the still-unhealthy primary resumes from zero.
    assert_eq!(
        cluster.tick(&mut controller).await,
        Transition::FailureCounted { consecutive_failures: 1 }
    );
}

#[tokio::test]
async fn test_flaky_recovery_does_not_restore() {
    let cluster = Cluster::start().await;
    let mut controller = cluster.controller();
    cluster.primary.set_healthy(false);
    for _ in 0..3 {
        cluster.tick(&mut controller).await;
    }
    let writes = cluster.store.status_writes();

    cluster.primary.set_healthy(true);
    assert_eq!(cluster.tick(&mut controller).await, Transition::GraceStarted);
    cluster.primary.set_healthy(false);
    assert_eq!(cluster.tick(&mut controller).await, Transition::GraceCancelled);

    assert_eq!(controller.phase(), Phase::MonitoringSecondaryAsPrimary);
    assert_eq!(cluster.store.status_writes(), writes);
    assert!(cluster.primary.directives().is_empty());
}

#[tokio::test]
async fn test_restoration_after_grace_period() {
    let cluster = Cluster::start().await;
    let mut controller = cluster.controller();
    cluster.primary.set_healthy(false);
    for _ in 0..3 {
        cluster.tick(&mut controller).await;
    }

    cluster.primary.set_healthy(true);
    let mut restored = None;
    for _ in 0..5 {
        if let Transition::Restored { at } = cluster.tick(&mut controller).await {
            restored = Some(at);
            break;
        }
    }
    assert!(restored.is_some(), "primary should be restored within the grace period");

    let status = cluster.store.get_cluster_status().await.unwrap();
    assert_eq!(status.primary_instance, InstanceRole::Primary);
    assert!(status.restore_time.unwrap() > status.failover_time.unwrap());
    assert_eq!(cluster.primary.directives(), vec!["POST /cluster/activate"]);
    assert_eq!(
        cluster.secondary.directives(),
        vec!["POST /cluster/promote", "POST /cluster/standby"]
    );
    assert_eq!(controller.phase(), Phase::MonitoringPrimary);
}

#[tokio::test]
async fn test_rejected_directive_still_promotes() {
    let cluster = Cluster::start().await;
    cluster.secondary.set_accept_directives(false);
    let mut controller = cluster.controller();
    cluster.primary.set_healthy(false);
    for _ in 0..3 {
        cluster.tick(&mut controller).await;
    }

    let status = cluster.store.get_cluster_status().await.unwrap();
    assert_eq!(status.primary_instance, InstanceRole::Secondary);
}

#[tokio::test]
async fn test_telemetry_last_check_non_decreasing() {
    let cluster = Cluster::start().await;
    let mut controller = cluster.controller();

    let mut previous = None;
    for i in 0..8 {
        cluster.primary.set_healthy(i % 3 != 0);
        cluster.tick(&mut controller).await;
        let last_check = cluster.store.get_telemetry().await.unwrap().unwrap().last_check;
        if let Some(previous) = previous {
            assert!(last_check >= previous);
        }
        previous = Some(last_check);
    }
}

#[tokio::test]
async fn test_restart_resumes_from_store() {
    let cluster = Cluster::start().await;
    let mut first = cluster.controller();
    cluster.primary.set_healthy(false);
    for _ in 0..3 {
        cluster.tick(&mut first).await;
    }
    drop(first);

    // A fresh process probes the secondary as primary rather than re-promoting.
    let mut second = cluster.controller();
    assert_eq!(
        cluster.tick(&mut second).await,
        Transition::ActingPrimaryHealthy
    );
    assert_eq!(second.state().designee, InstanceRole::Secondary);
    assert_eq!(cluster.secondary.directives(), vec!["POST /cluster/promote"]);
}

#[tokio::test]
async fn test_only_lease_holder_acts() {
    let mut cluster = Cluster::start().await;
    cluster.config.lease.enabled = true;
    let mut a = cluster.controller();
    let mut b = cluster.controller();

    assert_eq!(a.tick().await, Transition::PrimaryHealthy);
    assert_eq!(b.tick().await, Transition::StandingBy);

    cluster.primary.set_healthy(false);
    for _ in 0..3 {
        assert_eq!(b.tick().await, Transition::StandingBy);
    }
    assert_eq!(cluster.store.status_writes(), 0);

    // Holder shuts down; the standby takes over on its next tick.
    a.shutdown().await;
    assert_eq!(
        b.tick().await,
        Transition::FailureCounted { consecutive_failures: 1 }
    );
    assert!(b.is_leader());
}

#[tokio::test]
async fn test_monitor_loop_stops_on_shutdown() {
    let cluster = Cluster::start().await;
    let controller = cluster.controller();
    let monitor = MonitorLoop::new(controller, Duration::from_millis(50));

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(monitor.run(shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.trigger();

    let controller = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop should exit after shutdown")
        .unwrap();
    assert_eq!(controller.phase(), Phase::MonitoringPrimary);
    assert!(cluster.store.telemetry_writes() >= 2);
    assert!(cluster
        .primary
        .requests()
        .iter()
        .all(|r| r == "GET /health"));
}
