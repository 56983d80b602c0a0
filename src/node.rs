use tokio_util::sync::CancellationToken;

use crate::config::CoordinatorConfig;
use crate::coordinator::Coordinator;
use crate::dashboard::{run_dashboard, DashboardState};
use crate::error::Result;
use crate::grpc::GrpcServer;
use crate::monitor::LivenessMonitor;

/// A coordinator process: the shared ring plus every task that touches it.
pub struct CoordinatorNode {
    pub config: CoordinatorConfig,
    pub coordinator: Coordinator,
}

impl CoordinatorNode {
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        let coordinator = Coordinator::new(config.ring.clone())?;
        Ok(Self {
            config,
            coordinator,
        })
    }

    /// Run every subsystem until `shutdown` is cancelled.
    ///
    /// 1. Spawns the liveness monitor on its own tick interval
    /// 2. Optionally spawns the HTTP dashboard
    /// 3. Runs the gRPC server (blocking)
    ///
    /// # Errors
    ///
    /// Returns an error if the gRPC server fails to bind or serve. The other
    /// tasks log their own errors.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let monitor = LivenessMonitor::new(self.coordinator.clone());
        let monitor_handle = tokio::spawn(monitor.run(shutdown.clone()));

        if let Some(dashboard_addr) = self.config.dashboard_addr {
            let state = DashboardState {
                coordinator: self.coordinator.clone(),
            };
            tokio::spawn(run_dashboard(dashboard_addr, state, shutdown.clone()));
        }

        let server = GrpcServer::new(self.config.listen_addr, self.coordinator.clone());
        let served = server.run(shutdown.clone()).await;

        // Stop the monitor too if the server exited on its own.
        shutdown.cancel();
        if let Err(e) = monitor_handle.await {
            tracing::warn!(error = %e, "Liveness monitor task ended abnormally");
        }

        served?;
        Ok(())
    }
}
