
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tonic::Code;

use jobring::config::WorkerConfig;
use jobring::monitor::LivenessMonitor;
use jobring::proto::{
    GetRingStatusRequest, HeartbeatRequest, PullJobsRequest, RegisterRequest, SubmitJobRequest,
};
use jobring::ring::Job;
use jobring::worker::{JobHandler, WorkerAgent};
use test_harness::{
    address_for_slot, addresses_for_slot, filenames_for_slot, test_ring_config, TestCoordinator,
};

/// Collects every job handed to it.
#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<Job>>,
}

#[tonic::async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, job: Job) -> Result<(), String> {
        self.seen.lock().await.push(job);
        Ok(())
    }
}

#[tokio::test]
async fn test_register_submit_pull_over_grpc() {
    let server = TestCoordinator::start(test_ring_config(3)).await;
    let mut client = server.client().await;

    let worker = address_for_slot(0, 3);
    let slot = client
        .register(RegisterRequest {
            worker_address: worker.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .slot;
    assert_eq!(slot, 0);

    let file = &filenames_for_slot(0, 3, 1)[0];
    let landed = client
        .submit_job(SubmitJobRequest {
            filename: file.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .slot;
    assert_eq!(landed, 0);

    let jobs = client
        .pull_jobs(PullJobsRequest {
            worker_address: worker.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .jobs;
    assert_eq!(jobs.len(), 1);
    assert_eq!(&jobs[0].filename, file);

    let again = client
        .pull_jobs(PullJobsRequest {
            worker_address: worker,
        })
        .await
        .unwrap()
        .into_inner()
        .jobs;
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_error_status_codes() {
    let server = TestCoordinator::start(test_ring_config(1)).await;
    let mut client = server.client().await;

    let err = client
        .submit_job(SubmitJobRequest {
            filename: "a.txt".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);

    let err = client
        .heartbeat(HeartbeatRequest {
            slot: 0,
            worker_address: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = client
        .register(RegisterRequest {
            worker_address: "  ".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    client
        .register(RegisterRequest {
            worker_address: "w0".to_string(),
        })
        .await
        .unwrap();
    let err = client
        .register(RegisterRequest {
            worker_address: "w1".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::ResourceExhausted);

    let err = client
        .submit_job(SubmitJobRequest {
            filename: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_ring_status_reports_slots() {
    let server = TestCoordinator::start(test_ring_config(4)).await;
    let mut client = server.client().await;

    let worker = address_for_slot(2, 4);
    client
        .register(RegisterRequest {
            worker_address: worker.clone(),
        })
        .await
        .unwrap();
    client
        .submit_job(SubmitJobRequest {
            filename: "x.txt".to_string(),
        })
        .await
        .unwrap();

    let status = client
        .get_ring_status(GetRingStatusRequest {})
        .await
        .unwrap()
        .into_inner();
    assert_eq!(status.slots.len(), 4);
    assert_eq!(status.lost_jobs, 0);
    assert_eq!(status.slots[2].address, worker);
    assert!(status.slots[2].eligible);
    assert_eq!(status.slots[2].queued_jobs, 1);
    assert!(status.slots[0].address.is_empty());
    assert!(!status.slots[0].eligible);
}

#[tokio::test]
async fn test_worker_agent_pulls_routed_jobs() {
    let server = TestCoordinator::start(test_ring_config(3)).await;
    let handler = Arc::new(RecordingHandler::default());

    let address = address_for_slot(1, 3);
    let config = WorkerConfig::new(server.endpoint(), address).with_intervals(20, 20);
    let mut agent = WorkerAgent::connect(config, handler.clone()).await.unwrap();
    assert_eq!(agent.heartbeat().await.unwrap(), 1);

    let files = filenames_for_slot(1, 3, 3);
    for f in &files {
        server.coordinator.submit_job(f).await.unwrap();
    }

    let pulled = agent.pull_and_handle().await.unwrap();
    let expected: Vec<Job> = files.iter().map(Job::new).collect();
    assert_eq!(pulled, expected);
    assert_eq!(*handler.seen.lock().await, expected);
}

#[tokio::test]
async fn test_evicted_worker_registers_again() {
    let server = TestCoordinator::start(test_ring_config(2)).await;
    let handler = Arc::new(RecordingHandler::default());

    let config = WorkerConfig::new(server.endpoint(), address_for_slot(0, 2));
    let mut agent = WorkerAgent::connect(config, handler).await.unwrap();
    assert_eq!(agent.register().await.unwrap(), 0);

    server.clock.advance(Duration::from_secs(11));
    let report = LivenessMonitor::new(server.coordinator.clone()).tick().await;
    assert_eq!(report.evictions.len(), 1);

    // Heartbeat hits NOT_FOUND and the agent takes a fresh slot.
    assert_eq!(agent.heartbeat().await.unwrap(), 0);
    assert_eq!(agent.slot(), Some(0));
    assert!(server
        .coordinator
        .inspect(|r| r.slot(0).unwrap().is_eligible())
        .await);
}

#[tokio::test]
async fn test_former_owner_of_rebound_slot_registers_again() {
    let server = TestCoordinator::start(test_ring_config(2)).await;
    let mut client = server.client().await;
    let handler = Arc::new(RecordingHandler::default());

    let workers = addresses_for_slot(0, 2, 2);
    let config = WorkerConfig::new(server.endpoint(), workers[0].clone());
    let mut agent = WorkerAgent::connect(config, handler).await.unwrap();
    assert_eq!(agent.register().await.unwrap(), 0);

    server.clock.advance(Duration::from_secs(11));
    let report = LivenessMonitor::new(server.coordinator.clone()).tick().await;
    assert_eq!(report.evictions.len(), 1);

    // Another worker takes slot 0 before the evicted one heartbeats.
    let slot = client
        .register(RegisterRequest {
            worker_address: workers[1].clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .slot;
    assert_eq!(slot, 0);

    let err = client
        .heartbeat(HeartbeatRequest {
            slot: 0,
            worker_address: workers[0].clone(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    // The agent notices and moves to the free slot.
    assert_eq!(agent.heartbeat().await.unwrap(), 1);
    let owners = server
        .coordinator
        .inspect(|r| {
            (0..2)
                .map(|i| r.slot(i).unwrap().address().map(str::to_string))
                .collect::<Vec<_>>()
        })
        .await;
    assert_eq!(owners, vec![Some(workers[1].clone()), Some(workers[0].clone())]);

    // Slot-only heartbeats are still accepted.
    client
        .heartbeat(HeartbeatRequest {
            slot: 0,
            worker_address: String::new(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_worker_agent_rejects_zero_interval() {
    let server = TestCoordinator::start(test_ring_config(2)).await;
    let handler = Arc::new(RecordingHandler::default());

    let config = WorkerConfig::new(server.endpoint(), "w0").with_intervals(1_000, 0);
    let result = WorkerAgent::connect(config, handler).await;
    assert!(matches!(
        result,
        Err(jobring::CoordinatorError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_worker_agent_run_loop_stops_on_cancel() {
    let server = TestCoordinator::start(test_ring_config(2)).await;
    let handler = Arc::new(RecordingHandler::default());

    let address = address_for_slot(1, 2);
    let config = WorkerConfig::new(server.endpoint(), address).with_intervals(10, 10);
    let agent = WorkerAgent::connect(config, handler.clone()).await.unwrap();

    let token = tokio_util::sync::CancellationToken::new();
    let run = tokio::spawn(agent.run(token.clone()));

    // Wait for registration, then route a job to the worker.
    let mut registered = false;
    for _ in 0..50 {
        if server.coordinator.inspect(|r| r.bound_count()).await == 1 {
            registered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(registered, "agent never registered");
    server.coordinator.submit_job("late.txt").await.unwrap();

    let mut delivered = false;
    for _ in 0..50 {
        if handler.seen.lock().await.contains(&Job::new("late.txt")) {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(delivered, "job never reached the handler");

    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), run)
        .await
        .expect("agent did not stop")
        .unwrap();
}
