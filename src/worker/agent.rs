use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

use crate::config::WorkerConfig;
use crate::error::{CoordinatorError, Result};
use crate::proto::coordinator_service_client::CoordinatorServiceClient;
use crate::proto::{HeartbeatRequest, PullJobsRequest, RegisterRequest};
use crate::ring::Job;
use crate::worker::handler::JobHandler;

pub struct WorkerAgent {
    config: WorkerConfig,
    client: CoordinatorServiceClient<Channel>,
    handler: Arc<dyn JobHandler>,
    slot: Option<u32>,
}

impl WorkerAgent {
    /// Connect to the coordinator. Registration happens on the first
    /// heartbeat or via [`register`](Self::register).
    pub async fn connect(config: WorkerConfig, handler: Arc<dyn JobHandler>) -> Result<Self> {
        config.validate()?;
        let endpoint = Endpoint::from_shared(config.coordinator_addr.clone()).map_err(|e| {
            CoordinatorError::InvalidConfig(format!(
                "invalid coordinator address {}: {}",
                config.coordinator_addr, e
            ))
        })?;
        let channel = endpoint.connect().await?;

        Ok(Self {
            config,
            client: CoordinatorServiceClient::new(channel),
            handler,
            slot: None,
        })
    }

    pub fn slot(&self) -> Option<u32> {
        self.slot
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub async fn register(&mut self) -> Result<u32> {
        let slot = self
            .client
            .register(RegisterRequest {
                worker_address: self.config.address.clone(),
            })
            .await?
            .into_inner()
            .slot;

        tracing::info!(address = %self.config.address, slot, "Registered with coordinator");
        self.slot = Some(slot);
        Ok(slot)
    }

    /// Heartbeat the owned slot, registering first if there is none. A slot
    /// that was evicted, or rebound to another worker, is answered with
    /// `NOT_FOUND`; the agent then re-registers rather than retrying the
    /// stale index.
    pub async fn heartbeat(&mut self) -> Result<u32> {
        let slot = match self.slot {
            Some(slot) => slot,
            None => return self.register().await,
        };

        let request = HeartbeatRequest {
            slot,
            worker_address: self.config.address.clone(),
        };
        match self.client.heartbeat(request).await {
            Ok(_) => Ok(slot),
            Err(status) if status.code() == Code::NotFound => {
                tracing::warn!(
                    address = %self.config.address,
                    slot,
                    "Slot no longer owned, registering again"
                );
                self.slot = None;
                self.register().await
            }
            Err(status) => Err(status.into()),
        }
    }

    /// Drain this worker's queue and hand every job to the handler, in order.
    pub async fn pull_and_handle(&mut self) -> Result<Vec<Job>> {
        let jobs: Vec<Job> = self
            .client
            .pull_jobs(PullJobsRequest {
                worker_address: self.config.address.clone(),
            })
            .await?
            .into_inner()
            .jobs
            .into_iter()
            .map(|j| Job::new(j.filename))
            .collect();

        for job in &jobs {
            if let Err(e) = self.handler.handle(job.clone()).await {
                tracing::error!(filename = %job.filename, error = %e, "Job handler failed");
            }
        }
        Ok(jobs)
    }

    /// Heartbeat and pull on their intervals until `shutdown` is cancelled.
    /// Coordinator errors are logged and retried on the next tick.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pull = tokio::time::interval(self.config.pull_interval());
        pull.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(address = %self.config.address, "Worker stopping");
                    break;
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = self.heartbeat().await {
                        tracing::warn!(address = %self.config.address, error = %e, "Heartbeat failed");
                    }
                }
                _ = pull.tick() => {
                    if self.slot.is_none() {
                        continue;
                    }
                    if let Err(e) = self.pull_and_handle().await {
                        tracing::warn!(address = %self.config.address, error = %e, "Job pull failed");
                    }
                }
            }
        }
    }
}
