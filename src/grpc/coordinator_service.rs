use tonic::{Request, Response, Status};

use crate::coordinator::Coordinator;
use crate::proto::coordinator_service_server::CoordinatorService;
use crate::proto::{
    GetRingStatusRequest, GetRingStatusResponse, HeartbeatRequest, HeartbeatResponse,
    Job as ProtoJob, PullJobsRequest, PullJobsResponse, RegisterRequest, RegisterResponse,
    SlotInfo, SubmitJobRequest, SubmitJobResponse,
};

/// Remote surface of the coordinator. Each call maps onto exactly one
/// operation of the shared [`Coordinator`] and returns immediately; capacity
/// failures surface as status codes for the caller to back off on.
pub struct CoordinatorServiceImpl {
    coordinator: Coordinator,
}

impl CoordinatorServiceImpl {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

#[tonic::async_trait]
impl CoordinatorService for CoordinatorServiceImpl {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        let address = req.worker_address.trim();

        let slot = self.coordinator.register(address).await.map_err(|e| {
            tracing::warn!(address, error = %e, "Registration rejected");
            Status::from(e)
        })?;

        Ok(Response::new(RegisterResponse { slot }))
    }

    async fn heartbeat(
        &self,
        request: Request<HeartbeatRequest>,
    ) -> Result<Response<HeartbeatResponse>, Status> {
        let req = request.into_inner();
        let slot = req.slot;
        let address = req.worker_address.trim();
        if address.is_empty() {
            self.coordinator.heartbeat(slot).await?;
        } else {
            self.coordinator.heartbeat_as(slot, address).await?;
        }
        tracing::debug!(slot, address, "Heartbeat received");
        Ok(Response::new(HeartbeatResponse {}))
    }

    async fn submit_job(
        &self,
        request: Request<SubmitJobRequest>,
    ) -> Result<Response<SubmitJobResponse>, Status> {
        let req = request.into_inner();
        if req.filename.trim().is_empty() {
            return Err(Status::invalid_argument("Filename cannot be empty"));
        }

        let slot = self.coordinator.submit_job(&req.filename).await?;
        tracing::info!(filename = %req.filename, slot, "Job submitted");
        Ok(Response::new(SubmitJobResponse { slot }))
    }

    async fn pull_jobs(
        &self,
        request: Request<PullJobsRequest>,
    ) -> Result<Response<PullJobsResponse>, Status> {
        let req = request.into_inner();
        let jobs: Vec<ProtoJob> = self
            .coordinator
            .pull_jobs(req.worker_address.trim())
            .await
            .into_iter()
            .map(|job| ProtoJob {
                filename: job.filename,
            })
            .collect();

        if !jobs.is_empty() {
            tracing::debug!(address = %req.worker_address, count = jobs.len(), "Jobs handed out");
        }
        Ok(Response::new(PullJobsResponse { jobs }))
    }

    async fn get_ring_status(
        &self,
        _request: Request<GetRingStatusRequest>,
    ) -> Result<Response<GetRingStatusResponse>, Status> {
        let snapshot = self.coordinator.snapshot().await;
        let slots = snapshot
            .slots
            .into_iter()
            .map(|s| SlotInfo {
                index: s.index as u32,
                address: s.address.unwrap_or_default(),
                eligible: s.eligible,
                queued_jobs: s.queued_jobs as u32,
                heartbeat_age_ms: s.heartbeat_age_ms.map(|ms| ms as i64).unwrap_or(0),
            })
            .collect();

        Ok(Response::new(GetRingStatusResponse {
            slots,
            lost_jobs: snapshot.lost_jobs,
        }))
    }
}
